//! Fixed-size pool of consumer workers.

use queue::WorkQueue;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use crate::consumer::ConsumerWorker;
use crate::processor::EventProcessor;

/// Worker pool configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerPoolConfig {
    /// Number of consumer tasks
    #[serde(default = "default_workers")]
    pub workers: usize,
}

fn default_workers() -> usize {
    4
}

impl Default for WorkerPoolConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
        }
    }
}

/// Running consumer tasks sharing one queue and one processor.
pub struct WorkerPool {
    handles: Vec<JoinHandle<()>>,
    shutdown: CancellationToken,
}

impl WorkerPool {
    /// Spawns `config.workers` consumers (at least one).
    pub fn start(
        config: &WorkerPoolConfig,
        queue: Arc<WorkQueue>,
        processor: Arc<EventProcessor>,
    ) -> Self {
        let shutdown = CancellationToken::new();
        let workers = config.workers.max(1);

        let handles = (0..workers)
            .map(|id| {
                let worker = ConsumerWorker::new(id, queue.clone(), processor.clone());
                let shutdown = shutdown.clone();
                tokio::spawn(async move { worker.run(shutdown).await })
            })
            .collect();

        info!(workers, "Consumer workers started");
        Self { handles, shutdown }
    }

    pub fn size(&self) -> usize {
        self.handles.len()
    }

    /// Stops every worker and waits for them to exit.
    ///
    /// Events still queued stay queued; call [`WorkQueue::join`] first to
    /// let them drain.
    pub async fn shutdown(self) {
        self.shutdown.cancel();
        for handle in self.handles {
            if let Err(e) = handle.await {
                error!("Consumer worker panicked: {}", e);
            }
        }
        info!("Consumer workers stopped");
    }
}

/// Processes every immediately available event on the calling task.
///
/// Meant for when no workers are running; returns how many events were
/// handled.
pub async fn drain(queue: &WorkQueue, processor: &EventProcessor) -> usize {
    let mut handled = 0;
    while let Some(delivery) = queue.try_get() {
        delivery.wait_turn().await;
        processor.handle(delivery.event()).await;
        delivery.ack();
        handled += 1;
    }
    handled
}
