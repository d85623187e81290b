// src/config.rs
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use serde::Deserialize;

pub const ENV_CONFIG_PATH: &str = "THREATWIRE_CONFIG_PATH";
const DEFAULT_CONFIG_PATH: &str = "config/threatwire.toml";

/// Runtime configuration. Every field has a default so the service boots
/// with no config file at all; a TOML file (env-pointed or at the default
/// path) overrides field by field.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Poll cycle period in seconds.
    pub poll_interval_secs: u64,
    /// Delay between successive new-item extractions within one cycle.
    pub politeness_delay_ms: u64,
    /// RSS snapshot of the watched feed.
    pub feed_url: String,
    pub articles_path: PathBuf,
    pub subscribers_path: PathBuf,
    /// Applies to every outbound HTTP call (feed, extractor, classifier, judge).
    pub http_timeout_secs: u64,
    /// Bounded worker count for per-subscriber fan-out.
    pub fanout_concurrency: usize,
    /// How long in-flight fan-outs may finish after a stop signal.
    pub shutdown_grace_secs: u64,
    /// Classifier backends tried in order; first success wins.
    pub classifier_backends: Vec<String>,
    pub bind_addr: String,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            poll_interval_secs: 300,
            politeness_delay_ms: 2_000,
            feed_url: "https://feeds.feedburner.com/TheHackersNews".to_string(),
            articles_path: PathBuf::from("data/articles.json"),
            subscribers_path: PathBuf::from("data/users.json"),
            http_timeout_secs: 10,
            fanout_concurrency: 8,
            shutdown_grace_secs: 20,
            classifier_backends: vec!["openai".to_string()],
            bind_addr: "0.0.0.0:8080".to_string(),
        }
    }
}

impl AppConfig {
    pub fn load_from(path: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading config from {}", path.display()))?;
        toml::from_str(&content).with_context(|| format!("parsing {}", path.display()))
    }

    /// Load using env var + fallbacks:
    /// 1) $THREATWIRE_CONFIG_PATH (must exist if set)
    /// 2) config/threatwire.toml
    /// 3) built-in defaults
    pub fn load_default() -> Result<Self> {
        if let Ok(p) = std::env::var(ENV_CONFIG_PATH) {
            let pb = PathBuf::from(p);
            return Self::load_from(&pb);
        }
        let default = PathBuf::from(DEFAULT_CONFIG_PATH);
        if default.exists() {
            return Self::load_from(&default);
        }
        Ok(Self::default())
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_secs(self.poll_interval_secs.max(1))
    }

    pub fn politeness_delay(&self) -> Duration {
        Duration::from_millis(self.politeness_delay_ms)
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs.max(1))
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_secs)
    }
}
