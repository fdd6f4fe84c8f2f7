//! Sink health checks.

use std::path::Path;
use tracing::{debug, error};

const PROBE_FILE: &str = ".health-probe";

/// Check that the processed directory exists and accepts writes.
pub async fn check_writable(dir: &Path) -> bool {
    let probe = dir.join(PROBE_FILE);

    let result = async {
        tokio::fs::create_dir_all(dir).await?;
        tokio::fs::write(&probe, b"ok").await?;
        tokio::fs::remove_file(&probe).await
    }
    .await;

    match result {
        Ok(()) => {
            debug!(dir = %dir.display(), "Sink directory writable");
            true
        }
        Err(e) => {
            error!(dir = %dir.display(), error = %e, "Sink health check failed");
            false
        }
    }
}
