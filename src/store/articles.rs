// src/store/articles.rs
use std::collections::HashSet;
use std::path::PathBuf;

use tokio::sync::Mutex;

use crate::error::Result;
use crate::model::Article;

use super::{read_json_vec, write_json_vec_atomic};

/// Ordered collection of ingested articles, newest-first, keyed by URL.
/// The backing file is the dedup source of truth across restarts.
#[derive(Debug)]
pub struct ArticleStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl ArticleStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    /// Full ordered sequence; missing or corrupt backing data is an empty
    /// sequence, never an error to the caller.
    pub async fn load_all(&self) -> Vec<Article> {
        read_json_vec(&self.path)
    }

    pub async fn known_urls(&self) -> HashSet<String> {
        self.load_all().await.into_iter().map(|a| a.url).collect()
    }

    /// Insert at the front and persist the full sequence before returning,
    /// so a crash after this call never loses the article. A URL already
    /// present is left untouched.
    pub async fn prepend(&self, article: Article) -> Result<()> {
        let _guard = self.write_lock.lock().await;
        let mut all: Vec<Article> = read_json_vec(&self.path);
        if all.iter().any(|a| a.url == article.url) {
            tracing::debug!(url = %article.url, "prepend skipped, url already stored");
            return Ok(());
        }
        all.insert(0, article);
        write_json_vec_atomic(&self.path, &all)
    }

    pub async fn find_by_url(&self, url: &str) -> Option<Article> {
        self.load_all().await.into_iter().find(|a| a.url == url)
    }
}
