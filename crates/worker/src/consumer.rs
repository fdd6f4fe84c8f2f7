//! Consumer loop: take one event, dedup and persist it, acknowledge it.

use queue::WorkQueue;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info};

use crate::processor::EventProcessor;

/// One consumer task pulling from the shared work queue.
pub struct ConsumerWorker {
    id: usize,
    queue: Arc<WorkQueue>,
    processor: Arc<EventProcessor>,
}

impl ConsumerWorker {
    pub fn new(id: usize, queue: Arc<WorkQueue>, processor: Arc<EventProcessor>) -> Self {
        Self {
            id,
            queue,
            processor,
        }
    }

    /// Runs until `shutdown` is cancelled.
    ///
    /// Cancellation is only observed between events; an event already
    /// dequeued is always processed and acknowledged first. Events of one
    /// topic are handled in dequeue order even across workers.
    pub async fn run(&self, shutdown: CancellationToken) {
        info!(worker = self.id, "Consumer worker starting");

        loop {
            let delivery = tokio::select! {
                biased;
                _ = shutdown.cancelled() => break,
                delivery = self.queue.get() => match delivery {
                    Some(delivery) => delivery,
                    None => break,
                },
            };

            delivery.wait_turn().await;
            self.processor.handle(delivery.event()).await;
            delivery.ack();
        }

        debug!(worker = self.id, "Consumer worker stopped");
    }
}
