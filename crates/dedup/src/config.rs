//! Dedup store configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Dedup store configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DedupConfig {
    /// SQLite database file
    #[serde(default = "default_path")]
    pub path: PathBuf,
    /// Connection pool size
    #[serde(default = "default_max_connections")]
    pub max_connections: u32,
    /// How long a writer waits on a locked database, in seconds
    #[serde(default = "default_busy_timeout_secs")]
    pub busy_timeout_secs: u64,
}

fn default_path() -> PathBuf {
    PathBuf::from("data/dedup.db")
}

fn default_max_connections() -> u32 {
    4
}

fn default_busy_timeout_secs() -> u64 {
    5
}

impl Default for DedupConfig {
    fn default() -> Self {
        Self {
            path: default_path(),
            max_connections: default_max_connections(),
            busy_timeout_secs: default_busy_timeout_secs(),
        }
    }
}

impl DedupConfig {
    pub fn with_path(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}
