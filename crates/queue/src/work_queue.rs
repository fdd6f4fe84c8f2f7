//! Bounded multi-consumer FIFO with acknowledgement tracking.
//!
//! - `put` suspends while the queue is full (backpressure)
//! - `get` suspends while the queue is empty
//! - every dequeued [`Delivery`] is acknowledged exactly once, explicitly
//!   via [`Delivery::ack`] or implicitly on drop
//! - `join` resolves once every event put so far has been acknowledged
//! - deliveries of one topic take turns in dequeue order
//!   ([`Delivery::wait_turn`]); different topics never wait on each other

use aggregator_core::{Error, Event, Result};
use parking_lot::Mutex as SyncMutex;
use std::collections::{BTreeSet, HashMap};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::{mpsc, Mutex, Notify};
use tracing::debug;

use crate::config::QueueConfig;

/// Count of events put but not yet acknowledged.
#[derive(Debug, Default)]
struct Inflight {
    unfinished: AtomicUsize,
    drained: Notify,
}

impl Inflight {
    fn begin(&self) {
        self.unfinished.fetch_add(1, Ordering::SeqCst);
    }

    fn finish(&self) {
        if self.unfinished.fetch_sub(1, Ordering::SeqCst) == 1 {
            self.drained.notify_waiters();
        }
    }

    fn count(&self) -> usize {
        self.unfinished.load(Ordering::SeqCst)
    }
}

/// Turn bookkeeping for one topic.
#[derive(Debug, Default)]
struct TopicLine {
    issued: u64,
    served: u64,
    /// Released tickets ahead of `served`
    done: BTreeSet<u64>,
}

/// Per-topic tickets handed out at dequeue time.
///
/// A ticket's turn comes once every earlier ticket of the same topic has
/// been released. Topics with nothing outstanding hold no entry.
#[derive(Debug, Default)]
struct TopicTurns {
    lines: SyncMutex<HashMap<String, TopicLine>>,
    advanced: Notify,
}

impl TopicTurns {
    fn issue(&self, topic: &str) -> u64 {
        let mut lines = self.lines.lock();
        let line = lines.entry(topic.to_string()).or_default();
        let ticket = line.issued;
        line.issued += 1;
        ticket
    }

    fn is_current(&self, topic: &str, ticket: u64) -> bool {
        self.lines
            .lock()
            .get(topic)
            .map_or(true, |line| line.served == ticket)
    }

    fn release(&self, topic: &str, ticket: u64) {
        {
            let mut lines = self.lines.lock();
            let Some(line) = lines.get_mut(topic) else {
                return;
            };
            line.done.insert(ticket);
            while line.done.remove(&line.served) {
                line.served += 1;
            }
            if line.served == line.issued {
                lines.remove(topic);
            }
        }
        self.advanced.notify_waiters();
    }
}

/// Bounded FIFO hand-off from the publish boundary to consumers.
pub struct WorkQueue {
    tx: mpsc::Sender<Event>,
    rx: Mutex<mpsc::Receiver<Event>>,
    inflight: Arc<Inflight>,
    turns: Arc<TopicTurns>,
    capacity: usize,
}

impl WorkQueue {
    pub fn new(config: &QueueConfig) -> Self {
        Self::with_capacity(config.capacity)
    }

    /// Creates a queue holding at most `capacity` events (minimum 1).
    pub fn with_capacity(capacity: usize) -> Self {
        let capacity = capacity.max(1);
        let (tx, rx) = mpsc::channel(capacity);
        Self {
            tx,
            rx: Mutex::new(rx),
            inflight: Arc::new(Inflight::default()),
            turns: Arc::new(TopicTurns::default()),
            capacity,
        }
    }

    /// Enqueues an event, waiting for space when the queue is full.
    ///
    /// Cancel-safe: a put abandoned while waiting enqueues nothing.
    pub async fn put(&self, event: Event) -> Result<()> {
        let permit = self
            .tx
            .reserve()
            .await
            .map_err(|_| Error::internal("work queue receiver dropped"))?;

        // Count before sending so a consumer can never ack an uncounted event
        self.inflight.begin();
        permit.send(event);
        Ok(())
    }

    /// Dequeues the next event, waiting while the queue is empty.
    ///
    /// Cancel-safe: dropping the future never loses an event.
    pub async fn get(&self) -> Option<Delivery> {
        let mut rx = self.rx.lock().await;
        let event = rx.recv().await?;
        // Issued under the receiver lock so tickets follow queue order
        Some(self.delivery(event))
    }

    /// Dequeues an event if one is immediately available.
    ///
    /// Returns `None` when the queue is empty or another consumer is
    /// currently waiting in [`WorkQueue::get`].
    pub fn try_get(&self) -> Option<Delivery> {
        let mut rx = self.rx.try_lock().ok()?;
        let event = rx.try_recv().ok()?;
        Some(self.delivery(event))
    }

    fn delivery(&self, event: Event) -> Delivery {
        let ticket = self.turns.issue(&event.topic);
        Delivery {
            event,
            ticket,
            turns: self.turns.clone(),
            inflight: self.inflight.clone(),
        }
    }

    /// Waits until every event put so far has been acknowledged.
    pub async fn join(&self) {
        loop {
            let drained = self.inflight.drained.notified();
            tokio::pin!(drained);
            // Register before checking so a concurrent final ack is not missed
            drained.as_mut().enable();

            if self.inflight.count() == 0 {
                debug!("Work queue drained");
                return;
            }
            drained.await;
        }
    }

    /// Events waiting to be dequeued.
    pub fn len(&self) -> usize {
        self.capacity - self.tx.capacity()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Events put but not yet acknowledged (queued plus in progress).
    pub fn unfinished(&self) -> usize {
        self.inflight.count()
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }
}

/// A dequeued event owned by exactly one consumer.
///
/// Dropping a delivery acknowledges it and passes the turn to the next
/// delivery of the same topic.
#[derive(Debug)]
pub struct Delivery {
    event: Event,
    ticket: u64,
    turns: Arc<TopicTurns>,
    inflight: Arc<Inflight>,
}

impl Delivery {
    pub fn event(&self) -> &Event {
        &self.event
    }

    /// Waits until every earlier delivery of this topic has been
    /// acknowledged.
    ///
    /// Consumers call this before acting on the event so that concurrent
    /// consumers still persist a topic in the order it was published.
    pub async fn wait_turn(&self) {
        loop {
            let advanced = self.turns.advanced.notified();
            tokio::pin!(advanced);
            advanced.as_mut().enable();

            if self.turns.is_current(&self.event.topic, self.ticket) {
                return;
            }
            advanced.await;
        }
    }

    /// Signals that processing of this event is finished.
    pub fn ack(self) {
        drop(self);
    }
}

impl Drop for Delivery {
    fn drop(&mut self) {
        self.turns.release(&self.event.topic, self.ticket);
        self.inflight.finish();
    }
}
