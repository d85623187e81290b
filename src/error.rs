// src/error.rs
//! Pipeline error taxonomy. Each variant maps to one failure policy:
//! Fetch ends the cycle, Extraction/Classification degrade the item,
//! Judge/Mail skip one subscriber, Persistence is fatal for the cycle.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum PipelineError {
    #[error("feed snapshot fetch: {0}")]
    Fetch(String),

    #[error("content extraction for {url}: {reason}")]
    Extraction { url: String, reason: String },

    #[error("classification ({backend}): {reason}")]
    Classification { backend: String, reason: String },

    #[error("relevance judge: {0}")]
    Judge(String),

    #[error("mail delivery to {to}: {reason}")]
    Mail { to: String, reason: String },

    #[error("store persistence at {path}: {reason}")]
    Persistence { path: String, reason: String },
}

pub type Result<T> = std::result::Result<T, PipelineError>;
