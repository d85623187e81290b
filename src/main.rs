//! threatwire — binary entrypoint.
//! Wires the stores, the poll cycle, the notification dispatcher, and the
//! thin HTTP API; stops the poller gracefully on ctrl-c.

use std::sync::Arc;

use anyhow::Context;
use tokio::sync::watch;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use threatwire::api::{self, AppState};
use threatwire::auth::Auth;
use threatwire::classify;
use threatwire::config::AppConfig;
use threatwire::judge::OpenAiJudge;
use threatwire::metrics::Metrics;
use threatwire::notify::email::SmtpMailer;
use threatwire::notify::{DynMailer, LogMailer};
use threatwire::poller::FeedPoller;
use threatwire::reinforce::PreferenceReinforcer;
use threatwire::sources::http::HttpExtractor;
use threatwire::sources::rss::RssFeedSource;
use threatwire::store::{ArticleStore, SubscriberStore};
use threatwire::Dispatcher;

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("threatwire=info,warn"));
    tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .init();
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    // Load .env in local/dev; no-op when absent.
    let _ = dotenvy::dotenv();
    init_tracing();

    let cfg = AppConfig::load_default().context("loading config")?;
    tracing::info!(
        feed = %cfg.feed_url,
        interval_secs = cfg.poll_interval_secs,
        "starting threatwire"
    );

    let metrics = Metrics::init().context("metrics init")?;

    let articles = Arc::new(ArticleStore::new(cfg.articles_path.clone()));
    let subscribers = Arc::new(SubscriberStore::new(cfg.subscribers_path.clone()));

    let mailer: DynMailer = match SmtpMailer::from_env() {
        Ok(m) => Arc::new(m),
        Err(e) => {
            tracing::warn!(error = %e, "SMTP not configured, mail goes to the log");
            Arc::new(LogMailer)
        }
    };

    let dispatcher = Arc::new(Dispatcher::new(
        Arc::clone(&subscribers),
        Arc::new(OpenAiJudge::new(None)),
        Arc::clone(&mailer),
        cfg.fanout_concurrency,
    ));

    let source = Arc::new(
        RssFeedSource::from_url(cfg.feed_url.clone(), cfg.http_timeout())
            .context("building feed source")?,
    );
    let extractor = Arc::new(HttpExtractor::new(cfg.http_timeout()).context("building extractor")?);
    let classifiers = classify::build_backends(&cfg.classifier_backends);

    let poller = FeedPoller::new(
        source,
        extractor,
        classifiers,
        Arc::clone(&articles),
        dispatcher,
        cfg.poll_interval(),
        cfg.politeness_delay(),
        cfg.shutdown_grace(),
    );

    let (stop_tx, stop_rx) = watch::channel(false);
    let poller_task = tokio::spawn(poller.run(stop_rx));

    let state = AppState {
        articles,
        auth: Arc::new(Auth::new(Arc::clone(&subscribers), Arc::clone(&mailer))),
        reinforcer: Arc::new(PreferenceReinforcer::new(subscribers)),
    };
    let router = api::create_router(state).merge(metrics.router());

    let listener = tokio::net::TcpListener::bind(&cfg.bind_addr)
        .await
        .with_context(|| format!("binding {}", cfg.bind_addr))?;
    tracing::info!(addr = %cfg.bind_addr, "http server listening");

    axum::serve(listener, router)
        .with_graceful_shutdown(async {
            let _ = tokio::signal::ctrl_c().await;
            tracing::info!("shutdown signal received");
        })
        .await
        .context("http server")?;

    // Server is down; stop the poller and let in-flight fan-outs drain.
    let _ = stop_tx.send(true);
    let _ = poller_task.await;
    Ok(())
}
