// src/sources/rss.rs
//! RSS-backed [`FeedSource`]. The watched site publishes its front page as an
//! RSS channel, which gives us title/link/description/thumbnail without any
//! DOM scraping. Fixture mode feeds tests the same parse path as production.

use anyhow::Context;
use async_trait::async_trait;
use metrics::{counter, histogram};
use quick_xml::de::from_str;
use serde::Deserialize;

use crate::error::{PipelineError, Result};
use crate::sources::{strip_html, FeedItem, FeedSource};

#[derive(Debug, Deserialize)]
struct Rss {
    channel: Channel,
}
#[derive(Debug, Deserialize)]
struct Channel {
    #[serde(rename = "item", default)]
    item: Vec<Item>,
}
#[derive(Debug, Deserialize)]
struct Item {
    title: Option<String>,
    link: Option<String>,
    description: Option<String>,
    enclosure: Option<Enclosure>,
}
#[derive(Debug, Deserialize)]
struct Enclosure {
    #[serde(rename = "@url")]
    url: Option<String>,
}

pub struct RssFeedSource {
    mode: Mode,
}

enum Mode {
    Fixture(String),
    Http { url: String, client: reqwest::Client },
}

impl RssFeedSource {
    pub fn from_fixture(xml: &str) -> Self {
        Self {
            mode: Mode::Fixture(xml.to_string()),
        }
    }

    pub fn from_url(url: impl Into<String>, timeout: std::time::Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("threatwire/0.1 (feed watcher)")
            .connect_timeout(std::time::Duration::from_secs(4))
            .timeout(timeout)
            .build()
            .context("building feed http client")?;
        Ok(Self {
            mode: Mode::Http {
                url: url.into(),
                client,
            },
        })
    }

    fn parse_items_from_str(s: &str) -> Result<Vec<FeedItem>> {
        let t0 = std::time::Instant::now();
        let rss: Rss = from_str(s).map_err(|e| PipelineError::Fetch(format!("rss parse: {e}")))?;

        let mut out = Vec::with_capacity(rss.channel.item.len());
        for it in rss.channel.item {
            let url = match it.link {
                Some(l) if !l.trim().is_empty() => l.trim().to_string(),
                _ => continue,
            };
            out.push(FeedItem {
                title: strip_html(it.title.as_deref().unwrap_or_default()),
                url,
                description: strip_html(it.description.as_deref().unwrap_or_default()),
                thumbnail: it
                    .enclosure
                    .and_then(|e| e.url)
                    .unwrap_or_default(),
            });
        }

        let ms = t0.elapsed().as_secs_f64() * 1_000.0;
        histogram!("feed_parse_ms").record(ms);
        counter!("feed_items_total").increment(out.len() as u64);
        Ok(out)
    }
}

#[async_trait]
impl FeedSource for RssFeedSource {
    async fn fetch_snapshot(&self) -> Result<Vec<FeedItem>> {
        match &self.mode {
            Mode::Fixture(s) => Self::parse_items_from_str(s),
            Mode::Http { url, client } => {
                let resp = client
                    .get(url)
                    .send()
                    .await
                    .map_err(|e| PipelineError::Fetch(e.to_string()))?;
                if !resp.status().is_success() {
                    return Err(PipelineError::Fetch(format!(
                        "feed returned {}",
                        resp.status()
                    )));
                }
                let body = resp
                    .text()
                    .await
                    .map_err(|e| PipelineError::Fetch(e.to_string()))?;
                Self::parse_items_from_str(&body)
            }
        }
    }

    fn name(&self) -> &'static str {
        "rss"
    }
}
