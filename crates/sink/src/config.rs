//! Sink configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// File extension of per-topic logs.
pub const TOPIC_FILE_EXTENSION: &str = "ndjson";

/// Sink configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SinkConfig {
    /// Directory holding one `<topic>.ndjson` per topic
    #[serde(default = "default_processed_dir")]
    pub processed_dir: PathBuf,
}

fn default_processed_dir() -> PathBuf {
    PathBuf::from("data/processed")
}

impl Default for SinkConfig {
    fn default() -> Self {
        Self {
            processed_dir: default_processed_dir(),
        }
    }
}

impl SinkConfig {
    pub fn with_dir(dir: impl Into<PathBuf>) -> Self {
        Self {
            processed_dir: dir.into(),
        }
    }
}
