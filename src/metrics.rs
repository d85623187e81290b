// src/metrics.rs
use axum::{routing::get, Router};
use metrics::{describe_counter, describe_gauge, describe_histogram};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};

pub struct Metrics {
    pub handle: PrometheusHandle,
}

impl Metrics {
    /// Install the Prometheus recorder and describe every series the
    /// pipeline emits, so they all show up on /metrics from the start.
    pub fn init() -> anyhow::Result<Self> {
        let handle = PrometheusBuilder::new()
            .install_recorder()
            .map_err(|e| anyhow::anyhow!("prometheus: install recorder: {e}"))?;

        describe_counter!("poller_cycles_total", "Completed poll cycles.");
        describe_counter!("poller_cycle_errors_total", "Cycles ended early by fetch/persist errors.");
        describe_counter!("feed_items_total", "Items parsed from feed snapshots.");
        describe_histogram!("feed_parse_ms", "Feed snapshot parse time in milliseconds.");
        describe_counter!("articles_ingested_total", "New articles persisted.");
        describe_counter!("extract_errors_total", "Per-item content extraction failures.");
        describe_counter!("classify_errors_total", "Classifier backend failures.");
        describe_counter!("notify_sent_total", "Notification mails delivered.");
        describe_counter!("notify_errors_total", "Per-subscriber judge/mail failures.");
        describe_counter!("notify_skipped_no_prefs_total", "Subscribers skipped for an empty preference model.");
        describe_gauge!("poller_last_cycle_ts", "Unix ts when the poll cycle last ran.");

        Ok(Self { handle })
    }

    /// Router exposing `/metrics` in the Prometheus exposition format.
    pub fn router(&self) -> Router {
        let handle = self.handle.clone();
        Router::new().route(
            "/metrics",
            get(move || {
                let h = handle.clone();
                async move { h.render() }
            }),
        )
    }
}
