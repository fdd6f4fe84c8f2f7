//! File-backed event sink.

use crate::config::{SinkConfig, TOPIC_FILE_EXTENSION};
use aggregator_core::{validate_topic, Error, Event, Result, StorageErrorCode};
use async_trait::async_trait;
use parking_lot::Mutex;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs::OpenOptions;
use tokio::io::AsyncWriteExt;
use tracing::{debug, warn};

/// Durable destination for unique events.
#[async_trait]
pub trait EventSink: Send + Sync {
    /// Appends one event to its topic log.
    ///
    /// Returns only after the line is flushed to durable storage.
    async fn append(&self, event: &Event) -> Result<()>;

    /// Reads back persisted events, optionally for a single topic.
    async fn list_events(&self, topic: Option<&str>) -> Result<Vec<Event>>;
}

fn sink_error(context: impl std::fmt::Display, err: impl std::fmt::Display) -> Error {
    Error::storage(StorageErrorCode::Sink, format!("{}: {}", context, err))
}

/// Writes each topic to `<processed_dir>/<topic>.ndjson`.
pub struct FileSink {
    config: SinkConfig,
    /// One async lock per topic file
    locks: Mutex<HashMap<String, Arc<tokio::sync::Mutex<()>>>>,
}

impl FileSink {
    pub fn new(config: SinkConfig) -> Self {
        Self {
            config,
            locks: Mutex::new(HashMap::new()),
        }
    }

    /// The processed-events directory.
    pub fn dir(&self) -> &Path {
        &self.config.processed_dir
    }

    /// Path of a topic's log file.
    pub fn topic_path(&self, topic: &str) -> PathBuf {
        self.dir()
            .join(format!("{}.{}", topic, TOPIC_FILE_EXTENSION))
    }

    fn topic_lock(&self, topic: &str) -> Arc<tokio::sync::Mutex<()>> {
        let mut locks = self.locks.lock();
        locks
            .entry(topic.to_string())
            .or_insert_with(|| Arc::new(tokio::sync::Mutex::new(())))
            .clone()
    }

    /// Topics that currently have a log file, in name order.
    async fn existing_topics(&self) -> Result<Vec<String>> {
        let mut entries = match tokio::fs::read_dir(self.dir()).await {
            Ok(entries) => entries,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(sink_error(format!("failed to read {}", self.dir().display()), e)),
        };

        let mut topics = Vec::new();
        while let Some(entry) = entries
            .next_entry()
            .await
            .map_err(|e| sink_error("failed to list processed directory", e))?
        {
            if let Some(topic) = crate::recovery::topic_from_path(&entry.path()) {
                topics.push(topic);
            }
        }

        topics.sort();
        Ok(topics)
    }

    async fn read_topic(&self, topic: &str) -> Result<Vec<Event>> {
        let path = self.topic_path(topic);
        let lock = self.topic_lock(topic);
        let contents = {
            let _guard = lock.lock().await;
            match tokio::fs::read_to_string(&path).await {
                Ok(contents) => contents,
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
                Err(e) => return Err(sink_error(format!("failed to read {}", path.display()), e)),
            }
        };

        let mut events = Vec::new();
        for (line_no, line) in contents.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<Event>(line) {
                Ok(event) => events.push(event),
                Err(e) => warn!(
                    topic = %topic,
                    line = line_no + 1,
                    error = %e,
                    "Skipping unreadable sink line"
                ),
            }
        }

        Ok(events)
    }
}

#[async_trait]
impl EventSink for FileSink {
    async fn append(&self, event: &Event) -> Result<()> {
        validate_topic(&event.topic)?;

        let mut line = serde_json::to_vec(event)?;
        line.push(b'\n');

        let path = self.topic_path(&event.topic);
        let lock = self.topic_lock(&event.topic);
        let _guard = lock.lock().await;

        tokio::fs::create_dir_all(self.dir())
            .await
            .map_err(|e| sink_error(format!("failed to create {}", self.dir().display()), e))?;

        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&path)
            .await
            .map_err(|e| sink_error(format!("failed to open {}", path.display()), e))?;

        // One write per line; the topic lock keeps writers from interleaving
        file.write_all(&line)
            .await
            .map_err(|e| sink_error(format!("failed to write {}", path.display()), e))?;
        file.flush()
            .await
            .map_err(|e| sink_error(format!("failed to flush {}", path.display()), e))?;
        file.sync_data()
            .await
            .map_err(|e| sink_error(format!("failed to sync {}", path.display()), e))?;

        debug!(event = %event.key(), bytes = line.len(), "Appended event");
        Ok(())
    }

    async fn list_events(&self, topic: Option<&str>) -> Result<Vec<Event>> {
        let topics = match topic {
            Some(topic) => {
                validate_topic(topic)?;
                vec![topic.to_string()]
            }
            None => self.existing_topics().await?,
        };

        let mut events = Vec::new();
        for topic in topics {
            events.extend(self.read_topic(&topic).await?);
        }
        Ok(events)
    }
}
