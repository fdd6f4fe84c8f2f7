//! SQLite-backed deduplication store for the event aggregator.
//!
//! The `(topic, event_id)` primary key is the authority on whether an event
//! is new. Callers claim an identity with [`DedupStore::claim`] and commit
//! the claim only after the event has been persisted.

pub mod config;
pub mod health;
pub mod schema;
pub mod store;

pub use config::*;
pub use store::*;
