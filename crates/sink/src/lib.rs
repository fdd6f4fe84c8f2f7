//! Append-only per-topic NDJSON sink for the event aggregator.
//!
//! Each topic owns `<processed_dir>/<topic>.ndjson`, one JSON event per
//! line. Lines are only ever appended.

pub mod config;
pub mod file;
pub mod health;
pub mod recovery;

pub use config::*;
pub use file::*;
pub use recovery::recover_topics;
