// src/poller.rs
//! The poll cycle: fetch the feed snapshot, diff against known URLs,
//! extract + classify each new item, persist it immediately, then hand it
//! to the dispatcher off the critical path. Crash after any single persist
//! loses at most the in-flight item.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use metrics::{counter, gauge};
use tokio::sync::watch;
use tokio::task::JoinSet;
use tokio::time::MissedTickBehavior;

use crate::classify::{classify_with_fallback, DynClassifier};
use crate::error::Result;
use crate::model::Article;
use crate::notify::dispatcher::{DispatchOutcome, Dispatcher};
use crate::sources::{ContentExtractor, FeedSource};
use crate::store::ArticleStore;

#[derive(Debug, Default, Clone, Copy)]
pub struct CycleStats {
    pub snapshot_len: usize,
    pub new_articles: usize,
}

pub struct FeedPoller {
    source: Arc<dyn FeedSource>,
    extractor: Arc<dyn ContentExtractor>,
    classifiers: Vec<DynClassifier>,
    articles: Arc<ArticleStore>,
    dispatcher: Arc<Dispatcher>,
    poll_interval: Duration,
    politeness_delay: Duration,
    shutdown_grace: Duration,
}

impl FeedPoller {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: Arc<dyn FeedSource>,
        extractor: Arc<dyn ContentExtractor>,
        classifiers: Vec<DynClassifier>,
        articles: Arc<ArticleStore>,
        dispatcher: Arc<Dispatcher>,
        poll_interval: Duration,
        politeness_delay: Duration,
        shutdown_grace: Duration,
    ) -> Self {
        Self {
            source,
            extractor,
            classifiers,
            articles,
            dispatcher,
            poll_interval,
            politeness_delay,
            shutdown_grace,
        }
    }

    /// One cycle. Returns Err only for the cycle-ending failures (snapshot
    /// fetch, persistence); per-item extraction/classification failures
    /// degrade the item and keep going. A URL is never reprocessed once
    /// known, even if its extraction or classification failed.
    pub async fn run_cycle(&self, fanouts: &mut JoinSet<DispatchOutcome>) -> Result<CycleStats> {
        let mut known: HashSet<String> = self.articles.known_urls().await;
        let snapshot = self.source.fetch_snapshot().await?;

        let mut stats = CycleStats {
            snapshot_len: snapshot.len(),
            ..Default::default()
        };

        for item in snapshot {
            if known.contains(&item.url) {
                continue;
            }
            if stats.new_articles > 0 && !self.politeness_delay.is_zero() {
                // Space out successive page fetches within one cycle.
                tokio::time::sleep(self.politeness_delay).await;
            }

            tracing::info!(url = %item.url, "new article found");
            let content = match self.extractor.extract(&item.url).await {
                Ok(text) => text,
                Err(e) => {
                    tracing::warn!(url = %item.url, error = %e, "extraction failed, persisting with empty content");
                    counter!("extract_errors_total").increment(1);
                    String::new()
                }
            };

            let tags = classify_with_fallback(&self.classifiers, &item.title, &content).await;

            let article = Article {
                url: item.url.clone(),
                title: item.title,
                thumbnail: item.thumbnail,
                description: item.description,
                content,
                tags,
                scraped_at: Utc::now(),
            };

            // Durable before anything downstream sees it.
            self.articles.prepend(article.clone()).await?;
            known.insert(item.url);
            stats.new_articles += 1;
            counter!("articles_ingested_total").increment(1);

            let dispatcher = Arc::clone(&self.dispatcher);
            fanouts.spawn(async move { dispatcher.dispatch(article).await });
        }

        gauge!("poller_last_cycle_ts").set(Utc::now().timestamp().max(0) as f64);
        counter!("poller_cycles_total").increment(1);
        Ok(stats)
    }

    /// Unbounded loop with a graceful-stop signal observed between cycles.
    /// In-flight fan-outs get a bounded grace window on shutdown instead of
    /// being killed mid-batch.
    pub async fn run(self, mut stop: watch::Receiver<bool>) {
        let mut fanouts: JoinSet<DispatchOutcome> = JoinSet::new();
        let mut ticker = tokio::time::interval(self.poll_interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    match self.run_cycle(&mut fanouts).await {
                        Ok(stats) if stats.new_articles == 0 => {
                            tracing::info!(snapshot = stats.snapshot_len, "no new articles");
                        }
                        Ok(stats) => {
                            tracing::info!(
                                snapshot = stats.snapshot_len,
                                new = stats.new_articles,
                                "cycle complete"
                            );
                        }
                        Err(e) => {
                            tracing::warn!(error = %e, "cycle ended early, retrying next tick");
                            counter!("poller_cycle_errors_total").increment(1);
                        }
                    }
                    // Reap finished fan-outs so the set does not grow unbounded.
                    while fanouts.try_join_next().is_some() {}
                }
                changed = stop.changed() => {
                    if changed.is_err() || *stop.borrow() {
                        break;
                    }
                }
            }
        }

        if !fanouts.is_empty() {
            tracing::info!(in_flight = fanouts.len(), "draining notification fan-outs");
            let drained = tokio::time::timeout(self.shutdown_grace, async {
                while fanouts.join_next().await.is_some() {}
            })
            .await;
            if drained.is_err() {
                tracing::warn!("shutdown grace elapsed, aborting remaining fan-outs");
                fanouts.abort_all();
            }
        }
        tracing::info!("poller stopped");
    }
}
