//! Event Aggregator
//!
//! Accepts published events over HTTP and persists each `(topic, event_id)`
//! at most once:
//! - bounded work queue between the HTTP boundary and consumers
//! - SQLite dedup store as the authority on first sightings
//! - append-only per-topic NDJSON files for unique events

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use tokio::signal;
use tracing::{error, info, warn};

use api::{router, AppState};
use dedup_store::{DedupConfig, DedupStore};
use queue::{QueueConfig, WorkQueue};
use sink::{recover_topics, FileSink, SinkConfig};
use telemetry::{health, init_tracing_from_env, Stats};
use worker::{EventProcessor, WorkerPool, WorkerPoolConfig};

/// Application configuration.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
struct Config {
    #[serde(default = "default_host")]
    host: String,
    #[serde(default = "default_port")]
    port: u16,

    /// Upper bound on waiting for queued events at shutdown
    #[serde(default = "default_shutdown_drain_secs")]
    shutdown_drain_secs: u64,

    #[serde(default)]
    dedup: DedupConfig,

    #[serde(default)]
    sink: SinkConfig,

    #[serde(default)]
    queue: QueueConfig,

    #[serde(default)]
    worker: WorkerPoolConfig,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    8080
}

fn default_shutdown_drain_secs() -> u64 {
    10
}

impl Default for Config {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            shutdown_drain_secs: default_shutdown_drain_secs(),
            dedup: DedupConfig::default(),
            sink: SinkConfig::default(),
            queue: QueueConfig::default(),
            worker: WorkerPoolConfig::default(),
        }
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    // Load .env file if present
    dotenvy::dotenv().ok();

    init_tracing_from_env();

    info!("Starting Event Aggregator v{}", env!("CARGO_PKG_VERSION"));

    let mut config = load_config()?;
    // Every worker may hold a read connection while one more holds the claim
    let needed = u32::try_from(config.worker.workers.max(1))
        .unwrap_or(u32::MAX)
        .saturating_add(1);
    config.dedup.max_connections = config.dedup.max_connections.max(needed);

    info!(
        dedup_path = %config.dedup.path.display(),
        processed_dir = %config.sink.processed_dir.display(),
        workers = config.worker.workers,
        queue_capacity = config.queue.capacity,
        "Loaded configuration"
    );

    // Dedup store must be usable before any event is accepted
    let store = DedupStore::open(config.dedup.clone())
        .await
        .context("Failed to open dedup store")?;
    store
        .init_schema()
        .await
        .context("Failed to initialize dedup schema")?;

    // Recover topics from the files already on disk
    let topics = recover_topics(&config.sink.processed_dir)
        .await
        .context("Failed to recover topics from processed directory")?;

    let stats = Arc::new(Stats::with_topics(topics));

    check_health(&config, &store).await;

    let sink = Arc::new(FileSink::new(config.sink.clone()));
    let queue = Arc::new(WorkQueue::new(&config.queue));
    let processor = Arc::new(EventProcessor::new(
        store.clone(),
        sink.clone(),
        stats.clone(),
    ));

    let pool = WorkerPool::start(&config.worker, queue.clone(), processor);

    let state = AppState::new(queue.clone(), stats, sink);
    let app = router(state);

    let addr: SocketAddr = format!("{}:{}", config.host, config.port)
        .parse()
        .context("Invalid server address")?;

    info!("Listening on http://{}", addr);

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .context("Failed to bind to address")?;

    // Run server with graceful shutdown
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .context("Server error")?;

    info!("Shutting down...");

    // Let workers finish what was accepted before stopping them
    let drain_timeout = Duration::from_secs(config.shutdown_drain_secs);
    if tokio::time::timeout(drain_timeout, queue.join()).await.is_err() {
        warn!(
            unfinished = queue.unfinished(),
            timeout_secs = config.shutdown_drain_secs,
            "Queue not drained before timeout; remaining events are dropped"
        );
    }

    pool.shutdown().await;
    store.close().await;

    info!("Shutdown complete");
    Ok(())
}

/// Load configuration from files and environment.
fn load_config() -> Result<Config> {
    let config = config::Config::builder()
        // Start with defaults
        .add_source(config::Config::try_from(&Config::default())?)
        // Load from config file if exists
        .add_source(
            config::File::with_name("config/default")
                .required(false)
                .format(config::FileFormat::Toml),
        )
        // Override with environment variables
        .add_source(
            config::Environment::default()
                .separator("__")
                .prefix("AGGREGATOR")
                .try_parsing(true),
        )
        .build()
        .context("Failed to build configuration")?;

    let mut config: Config = config
        .try_deserialize()
        .context("Failed to deserialize configuration")?;

    // Flat variables for the settings operators usually change.
    // The environment source above only reads AGGREGATOR__<FIELD> keys
    if let Ok(host) = std::env::var("AGGREGATOR_HOST") {
        config.host = host;
    }
    if let Ok(port) = std::env::var("AGGREGATOR_PORT") {
        config.port = port.parse().context("AGGREGATOR_PORT must be a port number")?;
    }
    if let Ok(path) = std::env::var("AGGREGATOR_DEDUP_PATH") {
        config.dedup.path = path.into();
    }
    if let Ok(dir) = std::env::var("AGGREGATOR_PROCESSED_DIR") {
        config.sink.processed_dir = dir.into();
    }
    if let Ok(workers) = std::env::var("AGGREGATOR_WORKERS") {
        config.worker.workers = workers
            .parse()
            .context("AGGREGATOR_WORKERS must be a positive integer")?;
    }
    if let Ok(capacity) = std::env::var("AGGREGATOR_QUEUE_CAPACITY") {
        config.queue.capacity = capacity
            .parse()
            .context("AGGREGATOR_QUEUE_CAPACITY must be a positive integer")?;
    }
    if let Ok(secs) = std::env::var("AGGREGATOR_SHUTDOWN_DRAIN_SECS") {
        config.shutdown_drain_secs = secs
            .parse()
            .context("AGGREGATOR_SHUTDOWN_DRAIN_SECS must be a number of seconds")?;
    }

    Ok(config)
}

/// Check component health on startup.
async fn check_health(config: &Config, store: &DedupStore) {
    if dedup_store::health::check_connection(store).await {
        health().dedup_store.set_healthy();
        info!("Dedup store: healthy");
    } else {
        health().dedup_store.set_unhealthy("Connection failed");
        error!("Dedup store: unhealthy");
    }

    if sink::health::check_writable(&config.sink.processed_dir).await {
        health().sink.set_healthy();
        info!("Sink directory: healthy");
    } else {
        health().sink.set_unhealthy("Processed directory not writable");
        error!("Sink directory: unhealthy");
    }
}

/// Graceful shutdown signal handler.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sig) => {
                sig.recv().await;
            }
            Err(e) => {
                error!("Failed to install terminate handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C signal");
        }
        _ = terminate => {
            info!("Received terminate signal");
        }
    }
}
