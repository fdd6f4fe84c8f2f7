//! Shared fixtures for worker tests.

use crate::processor::EventProcessor;
use aggregator_core::{Event, Result};
use async_trait::async_trait;
use dedup_store::{DedupConfig, DedupStore};
use serde_json::json;
use sink::{EventSink, FileSink, SinkConfig};
use std::sync::Arc;
use std::time::Duration;
use telemetry::Stats;
use tempfile::TempDir;
use tokio::sync::Notify;

pub fn event(topic: &str, id: &str) -> Event {
    serde_json::from_value(json!({
        "topic": topic,
        "event_id": id,
        "timestamp": "2025-01-01T00:00:00Z",
        "source": "svc",
        "payload": {"id": id}
    }))
    .unwrap()
}

pub struct Harness {
    pub store: DedupStore,
    pub sink: Arc<FileSink>,
    pub stats: Arc<Stats>,
    pub processor: Arc<EventProcessor>,
}

impl Harness {
    pub async fn new(dir: &TempDir) -> Self {
        Self::with_store_config(dir, DedupConfig::with_path(dir.path().join("dedup.db"))).await
    }

    pub async fn with_store_config(dir: &TempDir, config: DedupConfig) -> Self {
        let store = DedupStore::open(config).await.unwrap();
        store.init_schema().await.unwrap();

        let sink = Arc::new(FileSink::new(SinkConfig::with_dir(
            dir.path().join("processed"),
        )));
        let stats = Arc::new(Stats::new());
        let processor = Arc::new(EventProcessor::new(
            store.clone(),
            sink.clone(),
            stats.clone(),
        ));

        Self {
            store,
            sink,
            stats,
            processor,
        }
    }

    /// A processor sharing this store and stats whose sink directory is a file.
    pub fn with_broken_sink(&self, dir: &TempDir) -> EventProcessor {
        let blocked = dir.path().join("blocked");
        std::fs::write(&blocked, b"not a directory").unwrap();
        EventProcessor::new(
            self.store.clone(),
            Arc::new(FileSink::new(SinkConfig::with_dir(blocked))),
            self.stats.clone(),
        )
    }

    /// A processor sharing this store and stats that writes through `sink`.
    pub fn with_sink(&self, sink: impl EventSink + 'static) -> EventProcessor {
        EventProcessor::new(self.store.clone(), Arc::new(sink), self.stats.clone())
    }

    pub fn sink_lines(&self, topic: &str) -> usize {
        std::fs::read_to_string(self.sink.topic_path(topic))
            .map(|contents| contents.lines().count())
            .unwrap_or(0)
    }
}

/// Delays every append, signalling once it has begun.
pub struct SlowSink {
    inner: Arc<FileSink>,
    delay: Duration,
    started: Arc<Notify>,
}

impl SlowSink {
    pub fn new(inner: Arc<FileSink>, delay: Duration) -> Self {
        Self {
            inner,
            delay,
            started: Arc::new(Notify::new()),
        }
    }

    pub fn started(&self) -> Arc<Notify> {
        self.started.clone()
    }
}

#[async_trait]
impl EventSink for SlowSink {
    async fn append(&self, event: &Event) -> Result<()> {
        self.started.notify_one();
        tokio::time::sleep(self.delay).await;
        self.inner.append(event).await
    }

    async fn list_events(&self, topic: Option<&str>) -> Result<Vec<Event>> {
        self.inner.list_events(topic).await
    }
}
