// src/sources/http.rs
use anyhow::Context;
use async_trait::async_trait;

use crate::error::{PipelineError, Result};
use crate::sources::{strip_html, ContentExtractor};

/// Fetches the article page and reduces it to plain text. The pipeline
/// treats extraction as best-effort; callers degrade to empty content on
/// error rather than dropping the item.
pub struct HttpExtractor {
    client: reqwest::Client,
}

impl HttpExtractor {
    pub fn new(timeout: std::time::Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("threatwire/0.1 (feed watcher)")
            .connect_timeout(std::time::Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building extractor http client")?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ContentExtractor for HttpExtractor {
    async fn extract(&self, url: &str) -> Result<String> {
        let err = |reason: String| PipelineError::Extraction {
            url: url.to_string(),
            reason,
        };

        let resp = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| err(e.to_string()))?;
        if !resp.status().is_success() {
            return Err(err(format!("status {}", resp.status())));
        }
        let body = resp.text().await.map_err(|e| err(e.to_string()))?;
        Ok(strip_html(&body))
    }
}
