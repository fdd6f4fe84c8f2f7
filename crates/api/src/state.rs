//! Application state shared across handlers.

use queue::WorkQueue;
use sink::EventSink;
use std::sync::Arc;
use telemetry::Stats;

/// Shared application state.
#[derive(Clone)]
pub struct AppState {
    /// Hand-off to the consumer pool
    pub queue: Arc<WorkQueue>,
    /// Pipeline counters
    pub stats: Arc<Stats>,
    /// Read side of the persisted events (file sink in production)
    pub sink: Arc<dyn EventSink>,
}

impl AppState {
    pub fn new(queue: Arc<WorkQueue>, stats: Arc<Stats>, sink: Arc<dyn EventSink>) -> Self {
        Self { queue, stats, sink }
    }
}
