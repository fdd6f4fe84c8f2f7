//! Dedup store health checks.

use crate::store::DedupStore;
use tracing::{debug, error};

/// Check dedup store connection health.
pub async fn check_connection(store: &DedupStore) -> bool {
    match store.ping().await {
        Ok(()) => {
            debug!("Dedup store connection healthy");
            true
        }
        Err(e) => {
            error!("Dedup store health check failed: {}", e);
            false
        }
    }
}
