// src/store/mod.rs
//! JSON file backed stores. Reads are tolerant (missing or corrupt backing
//! data yields an empty collection), writes are atomic (temp file + rename)
//! and serialized behind a per-store async mutex so the poller and the
//! HTTP-facing tasks never interleave a read-modify-write.

pub mod articles;
pub mod subscribers;

use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::PipelineError;

pub use articles::ArticleStore;
pub use subscribers::SubscriberStore;

pub(crate) fn read_json_vec<T: DeserializeOwned>(path: &Path) -> Vec<T> {
    let content = match std::fs::read_to_string(path) {
        Ok(s) => s,
        Err(_) => return Vec::new(),
    };
    match serde_json::from_str(&content) {
        Ok(v) => v,
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "corrupt store file, treating as empty");
            Vec::new()
        }
    }
}

pub(crate) fn write_json_vec_atomic<T: Serialize>(
    path: &Path,
    items: &[T],
) -> Result<(), PipelineError> {
    let persist_err = |reason: String| PipelineError::Persistence {
        path: path.display().to_string(),
        reason,
    };

    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent).map_err(|e| persist_err(e.to_string()))?;
        }
    }

    let json = serde_json::to_string_pretty(items).map_err(|e| persist_err(e.to_string()))?;

    // Write the whole payload to a sibling temp file, then rename over the
    // target. Rename is atomic on the same filesystem, so readers only ever
    // see the old or the new complete sequence.
    let mut tmp = path.as_os_str().to_owned();
    tmp.push(".tmp");
    let tmp = std::path::PathBuf::from(tmp);
    std::fs::write(&tmp, json).map_err(|e| persist_err(e.to_string()))?;
    std::fs::rename(&tmp, path).map_err(|e| persist_err(e.to_string()))?;
    Ok(())
}
