//! Pipeline statistics.
//!
//! One [`Stats`] is created per process and shared as `Arc<Stats>`:
//! the publish boundary records `received`, workers record outcomes.

use chrono::{DateTime, Utc};
use parking_lot::RwLock;
use serde::{Deserialize, Serialize};
use std::collections::BTreeSet;
use std::time::Instant;

use crate::metrics::{Counter, Histogram};

/// Process-wide pipeline counters.
#[derive(Debug)]
pub struct Stats {
    received: Counter,
    unique_processed: Counter,
    duplicate_dropped: Counter,
    failed: Counter,
    process_latency_ms: Histogram,
    topics: RwLock<BTreeSet<String>>,
    started_at: DateTime<Utc>,
    start: Instant,
}

impl Default for Stats {
    fn default() -> Self {
        Self::new()
    }
}

impl Stats {
    pub fn new() -> Self {
        Self {
            received: Counter::new(),
            unique_processed: Counter::new(),
            duplicate_dropped: Counter::new(),
            failed: Counter::new(),
            process_latency_ms: Histogram::new(),
            topics: RwLock::new(BTreeSet::new()),
            started_at: Utc::now(),
            start: Instant::now(),
        }
    }

    /// Creates stats with topics recovered from durable state.
    pub fn with_topics<I>(topics: I) -> Self
    where
        I: IntoIterator<Item = String>,
    {
        let stats = Self::new();
        stats.seed_topics(topics);
        stats
    }

    /// Adds topics without touching any counter.
    pub fn seed_topics<I>(&self, topics: I)
    where
        I: IntoIterator<Item = String>,
    {
        self.topics.write().extend(topics);
    }

    /// An event was accepted at the boundary and is about to be enqueued.
    pub fn record_received(&self, topic: &str) {
        self.received.inc();
        self.add_topic(topic);
    }

    /// An event was persisted for the first time.
    pub fn record_unique(&self, topic: &str) {
        self.unique_processed.inc();
        self.add_topic(topic);
    }

    /// An event was dropped as a duplicate.
    pub fn record_duplicate(&self) {
        self.duplicate_dropped.inc();
    }

    /// An event was dropped because storage failed.
    pub fn record_failure(&self) {
        self.failed.inc();
    }

    /// Records how long one event took to process.
    pub fn observe_latency_ms(&self, ms: u64) {
        self.process_latency_ms.observe(ms);
    }

    fn add_topic(&self, topic: &str) {
        // Read first; topics are usually known already
        if self.topics.read().contains(topic) {
            return;
        }
        self.topics.write().insert(topic.to_string());
    }

    pub fn received(&self) -> u64 {
        self.received.get()
    }

    pub fn unique_processed(&self) -> u64 {
        self.unique_processed.get()
    }

    pub fn duplicate_dropped(&self) -> u64 {
        self.duplicate_dropped.get()
    }

    pub fn failed(&self) -> u64 {
        self.failed.get()
    }

    pub fn topics(&self) -> Vec<String> {
        self.topics.read().iter().cloned().collect()
    }

    pub fn uptime_seconds(&self) -> u64 {
        self.start.elapsed().as_secs()
    }

    /// Takes a snapshot of current stats.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            received: self.received(),
            unique_processed: self.unique_processed(),
            duplicate_dropped: self.duplicate_dropped(),
            failed: self.failed(),
            topics: self.topics(),
            uptime_seconds: self.uptime_seconds(),
            started_at: self.started_at,
            process_latency_mean_ms: self.process_latency_ms.mean(),
        }
    }
}

/// A snapshot of stats at a point in time.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StatsSnapshot {
    pub received: u64,
    pub unique_processed: u64,
    pub duplicate_dropped: u64,
    pub failed: u64,
    pub topics: Vec<String>,
    pub uptime_seconds: u64,
    pub started_at: DateTime<Utc>,
    pub process_latency_mean_ms: f64,
}
