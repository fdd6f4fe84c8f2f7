//! Common test setup functions.

use api::{router, state::AppState};
use axum::Router;
use dedup_store::{DedupConfig, DedupStore};
use queue::WorkQueue;
use sink::{recover_topics, EventSink, FileSink, SinkConfig};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use telemetry::Stats;
use tempfile::TempDir;
use worker::{drain, EventProcessor, WorkerPool, WorkerPoolConfig};

use crate::mocks::MockSink;

/// Test context with a real dedup store and a real router.
///
/// No consumers run unless [`TestContext::start_workers`] is called;
/// [`TestContext::drain`] processes queued events on the test task instead,
/// which keeps per-topic order deterministic.
pub struct TestContext {
    _dir: Option<TempDir>,
    pub root: PathBuf,
    pub store: DedupStore,
    pub sink: Arc<dyn EventSink>,
    pub stats: Arc<Stats>,
    pub queue: Arc<WorkQueue>,
    pub processor: Arc<EventProcessor>,
    pub router: Router,
}

impl TestContext {
    /// Fresh context in its own temporary directory, using the file sink.
    pub async fn new() -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let mut ctx = Self::open(dir.path()).await;
        ctx._dir = Some(dir);
        ctx
    }

    /// Context over an existing data directory, as a restarted process sees it.
    pub async fn open(root: &Path) -> Self {
        let sink = Arc::new(FileSink::new(SinkConfig::with_dir(root.join("processed"))));
        Self::build(root, sink, None).await
    }

    /// Fresh context whose events go to an in-memory mock sink.
    pub async fn with_mock_sink(mock: MockSink) -> Self {
        let dir = TempDir::new().expect("Failed to create temp dir");
        let root = dir.path().to_path_buf();
        Self::build(&root, Arc::new(mock), Some(dir)).await
    }

    async fn build(root: &Path, sink: Arc<dyn EventSink>, dir: Option<TempDir>) -> Self {
        let store = DedupStore::open(DedupConfig::with_path(root.join("dedup.db")))
            .await
            .expect("Failed to open dedup store");
        store
            .init_schema()
            .await
            .expect("Failed to initialize schema");

        let topics = recover_topics(&root.join("processed"))
            .await
            .expect("Failed to recover topics");
        let stats = Arc::new(Stats::with_topics(topics));

        let queue = Arc::new(WorkQueue::with_capacity(10_000));
        let processor = Arc::new(EventProcessor::new(
            store.clone(),
            sink.clone(),
            stats.clone(),
        ));

        let state = AppState::new(queue.clone(), stats.clone(), sink.clone());
        let router = router(state);

        Self {
            _dir: dir,
            root: root.to_path_buf(),
            store,
            sink,
            stats,
            queue,
            processor,
            router,
        }
    }

    /// Process everything currently queued on the calling task.
    pub async fn drain(&self) -> usize {
        drain(&self.queue, &self.processor).await
    }

    /// Start `workers` background consumers on the shared queue.
    pub fn start_workers(&self, workers: usize) -> WorkerPool {
        WorkerPool::start(
            &WorkerPoolConfig { workers },
            self.queue.clone(),
            self.processor.clone(),
        )
    }

    /// Wait until every enqueued event has been acknowledged.
    pub async fn settle(&self) {
        tokio::time::timeout(Duration::from_secs(30), self.queue.join())
            .await
            .expect("Queue did not drain in time");
    }

    /// Path of a topic file under the processed directory.
    pub fn topic_file(&self, topic: &str) -> PathBuf {
        self.root.join("processed").join(format!("{}.ndjson", topic))
    }

    /// Lines currently in a topic file (0 when it does not exist).
    pub fn topic_lines(&self, topic: &str) -> usize {
        std::fs::read_to_string(self.topic_file(topic))
            .map(|contents| contents.lines().count())
            .unwrap_or(0)
    }
}
