//! SQLite dedup store.

use crate::config::DedupConfig;
use crate::schema::all_tables;
use aggregator_core::{Error, Result, StorageErrorCode};
use chrono::Utc;
use sqlx::sqlite::{
    SqliteConnectOptions, SqliteJournalMode, SqlitePool, SqlitePoolOptions, SqliteSynchronous,
};
use sqlx::{Sqlite, Transaction};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{Mutex, OwnedMutexGuard};
use tracing::{debug, info};

const INSERT_IF_ABSENT: &str =
    "INSERT OR IGNORE INTO dedup (topic, event_id, received_at) VALUES (?, ?, ?)";

fn store_error(context: &str, err: sqlx::Error) -> Error {
    Error::storage(
        StorageErrorCode::DedupStore,
        format!("{}: {}", context, err),
    )
}

/// Persistent record of every `(topic, event_id)` already accepted.
#[derive(Clone)]
pub struct DedupStore {
    pool: SqlitePool,
    config: DedupConfig,
    /// Held by an open [`Claim`]; at most one write transaction per process
    writer: Arc<Mutex<()>>,
}

impl DedupStore {
    /// Opens (creating if needed) the database and its parent directory.
    ///
    /// Does not create tables; call [`DedupStore::init_schema`] once at startup.
    pub async fn open(config: DedupConfig) -> Result<Self> {
        if let Some(parent) = config.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await.map_err(|e| {
                Error::storage(
                    StorageErrorCode::DedupStore,
                    format!("failed to create {}: {}", parent.display(), e),
                )
            })?;
        }

        let options = SqliteConnectOptions::new()
            .filename(&config.path)
            .create_if_missing(true)
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Full)
            .busy_timeout(Duration::from_secs(config.busy_timeout_secs));

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections.max(1))
            .connect_with(options)
            .await
            .map_err(|e| store_error("failed to open dedup store", e))?;

        info!(
            path = %config.path.display(),
            max_connections = config.max_connections,
            "Opened dedup store"
        );

        Ok(Self {
            pool,
            config,
            writer: Arc::new(Mutex::new(())),
        })
    }

    /// Creates the dedup table if it does not exist.
    pub async fn init_schema(&self) -> Result<()> {
        for ddl in all_tables() {
            sqlx::query(ddl)
                .execute(&self.pool)
                .await
                .map_err(|e| store_error("failed to execute DDL", e))?;
        }

        debug!("Dedup schema initialized");
        Ok(())
    }

    /// Whether the identity has been recorded.
    ///
    /// Advisory only: a concurrent [`DedupStore::claim`] may record it
    /// right after this returns `false`.
    pub async fn exists(&self, topic: &str, event_id: &str) -> Result<bool> {
        let row: Option<i64> =
            sqlx::query_scalar("SELECT 1 FROM dedup WHERE topic = ? AND event_id = ? LIMIT 1")
                .bind(topic)
                .bind(event_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| store_error("dedup lookup failed", e))?;

        Ok(row.is_some())
    }

    /// Records the identity if absent.
    ///
    /// Idempotent. Returns `true` only when this call inserted the row.
    pub async fn mark(&self, topic: &str, event_id: &str) -> Result<bool> {
        let result = sqlx::query(INSERT_IF_ABSENT)
            .bind(topic)
            .bind(event_id)
            .bind(Utc::now().to_rfc3339())
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("dedup mark failed", e))?;

        Ok(result.rows_affected() == 1)
    }

    /// Attempts to claim an identity inside a transaction.
    ///
    /// Returns `None` when the identity is already recorded. A returned
    /// [`Claim`] holds the insert uncommitted: commit it once the event is
    /// durably persisted, or drop it to roll the insert back. Concurrent
    /// claims queue on an in-process writer lock without a timeout, so at
    /// most one of them ever observes a fresh insert and a slow holder only
    /// delays the others.
    pub async fn claim(&self, topic: &str, event_id: &str) -> Result<Option<Claim>> {
        let writer = self.writer.clone().lock_owned().await;

        let mut tx = self
            .pool
            .begin()
            .await
            .map_err(|e| store_error("failed to begin dedup transaction", e))?;

        let result = sqlx::query(INSERT_IF_ABSENT)
            .bind(topic)
            .bind(event_id)
            .bind(Utc::now().to_rfc3339())
            .execute(&mut *tx)
            .await
            .map_err(|e| store_error("dedup claim failed", e))?;

        if result.rows_affected() == 0 {
            // Already recorded; the dropped transaction rolls back a no-op
            return Ok(None);
        }

        Ok(Some(Claim {
            tx,
            _writer: writer,
            topic: topic.to_string(),
            event_id: event_id.to_string(),
        }))
    }

    /// Number of recorded identities.
    pub async fn count(&self) -> Result<i64> {
        sqlx::query_scalar("SELECT COUNT(*) FROM dedup")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| store_error("dedup count failed", e))
    }

    /// Round-trips a trivial query.
    pub async fn ping(&self) -> Result<()> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map_err(|e| store_error("dedup ping failed", e))?;
        Ok(())
    }

    /// Closes every pooled connection, waiting for checked-out ones.
    pub async fn close(&self) {
        self.pool.close().await;
        info!("Dedup store closed");
    }

    pub fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }

    /// Returns the configuration.
    pub fn config(&self) -> &DedupConfig {
        &self.config
    }
}

/// An uncommitted dedup record.
///
/// Dropping it without [`Claim::commit`] rolls the insert back.
pub struct Claim {
    tx: Transaction<'static, Sqlite>,
    _writer: OwnedMutexGuard<()>,
    topic: String,
    event_id: String,
}

impl Claim {
    /// Makes the dedup record durable.
    pub async fn commit(self) -> Result<()> {
        self.tx
            .commit()
            .await
            .map_err(|e| store_error("dedup commit failed", e))
    }

    /// Explicitly abandons the claim.
    pub async fn rollback(self) -> Result<()> {
        self.tx
            .rollback()
            .await
            .map_err(|e| store_error("dedup rollback failed", e))
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn event_id(&self) -> &str {
        &self.event_id
    }
}
