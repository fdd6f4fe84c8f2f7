//! Per-event dedup-and-persist sequence.
//!
//! 1. Advisory lookup (skips the write path for known duplicates)
//! 2. Claim the identity in the dedup store (uncommitted insert-if-absent)
//! 3. Append to the sink
//! 4. Commit the claim
//!
//! A sink failure drops the claim, rolling the insert back, so the event is
//! neither marked nor persisted and a later republish can still succeed.

use aggregator_core::{Error, Event, Result, StorageErrorCode};
use dedup_store::DedupStore;
use sink::EventSink;
use std::sync::Arc;
use std::time::Instant;
use telemetry::{health, Stats};
use tracing::{debug, error};

/// Result of processing one event.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    /// First sighting; the event is now in the sink.
    Persisted,
    /// Identity already recorded; nothing written.
    Duplicate,
}

/// Applies dedup and persistence to dequeued events.
pub struct EventProcessor {
    store: DedupStore,
    sink: Arc<dyn EventSink>,
    stats: Arc<Stats>,
}

impl EventProcessor {
    pub fn new(store: DedupStore, sink: Arc<dyn EventSink>, stats: Arc<Stats>) -> Self {
        Self { store, sink, stats }
    }

    /// Runs the dedup-and-persist sequence without touching stats.
    pub async fn process(&self, event: &Event) -> Result<Outcome> {
        if self.store.exists(&event.topic, &event.event_id).await? {
            return Ok(Outcome::Duplicate);
        }

        // Another worker may have claimed it since the lookup
        let Some(claim) = self.store.claim(&event.topic, &event.event_id).await? else {
            return Ok(Outcome::Duplicate);
        };

        self.sink.append(event).await?;

        if let Err(e) = claim.commit().await {
            // The line is already durable; a republish would write it again
            error!(
                event = %event.key(),
                error = %e,
                "Dedup commit failed after sink append"
            );
            return Err(e);
        }

        Ok(Outcome::Persisted)
    }

    /// Processes an event and records the outcome.
    ///
    /// Failures are logged and counted, never propagated: one bad event must
    /// not stop a consumer.
    pub async fn handle(&self, event: &Event) -> Option<Outcome> {
        let start = Instant::now();
        let result = self.process(event).await;
        self.stats
            .observe_latency_ms(start.elapsed().as_millis() as u64);

        match result {
            Ok(Outcome::Persisted) => {
                self.stats.record_unique(&event.topic);
                health().dedup_store.set_healthy();
                health().sink.set_healthy();
                debug!(event = %event.key(), "Persisted event");
                Some(Outcome::Persisted)
            }
            Ok(Outcome::Duplicate) => {
                self.stats.record_duplicate();
                health().dedup_store.set_healthy();
                debug!(event = %event.key(), "Dropped duplicate event");
                Some(Outcome::Duplicate)
            }
            Err(e) => {
                self.stats.record_failure();
                report_unhealthy(&e);
                error!(
                    event = %event.key(),
                    code = e.error_code().unwrap_or("NONE"),
                    error = %e,
                    "Failed to process event"
                );
                None
            }
        }
    }

    pub fn stats(&self) -> &Arc<Stats> {
        &self.stats
    }
}

fn report_unhealthy(err: &Error) {
    match err.error_code() {
        Some(code) if code == StorageErrorCode::DedupStore.code() => {
            health().dedup_store.set_unhealthy(err.to_string())
        }
        Some(code) if code == StorageErrorCode::Sink.code() => {
            health().sink.set_unhealthy(err.to_string())
        }
        _ => {}
    }
}
