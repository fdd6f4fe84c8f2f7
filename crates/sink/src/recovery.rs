//! Startup recovery of the known-topic set.
//!
//! Only file names are inspected; log contents are neither replayed nor
//! re-validated, and the dedup store is left untouched.

use crate::config::TOPIC_FILE_EXTENSION;
use aggregator_core::{validate_topic, Error, Result, StorageErrorCode};
use std::collections::BTreeSet;
use std::path::Path;
use tracing::{info, warn};

/// Topic name for a `<topic>.ndjson` path, if it is one.
pub(crate) fn topic_from_path(path: &Path) -> Option<String> {
    if path.extension().and_then(|ext| ext.to_str()) != Some(TOPIC_FILE_EXTENSION) {
        return None;
    }

    let stem = path.file_stem()?.to_str()?;
    validate_topic(stem).ok()?;
    Some(stem.to_string())
}

/// Scans the processed directory and returns the topics it holds.
///
/// Creates the directory when missing, yielding an empty set.
pub async fn recover_topics(dir: &Path) -> Result<BTreeSet<String>> {
    tokio::fs::create_dir_all(dir).await.map_err(|e| {
        Error::storage(
            StorageErrorCode::Sink,
            format!("failed to create {}: {}", dir.display(), e),
        )
    })?;

    let mut entries = tokio::fs::read_dir(dir).await.map_err(|e| {
        Error::storage(
            StorageErrorCode::Sink,
            format!("failed to read {}: {}", dir.display(), e),
        )
    })?;

    let mut topics = BTreeSet::new();
    while let Some(entry) = entries.next_entry().await? {
        let path = entry.path();
        if !entry.file_type().await?.is_file() {
            continue;
        }
        match topic_from_path(&path) {
            Some(topic) => {
                topics.insert(topic);
            }
            None => {
                if path.extension().and_then(|ext| ext.to_str()) == Some(TOPIC_FILE_EXTENSION) {
                    warn!(path = %path.display(), "Ignoring log with invalid topic name");
                }
            }
        }
    }

    info!(dir = %dir.display(), topics = topics.len(), "Recovered topics from sink");
    Ok(topics)
}
