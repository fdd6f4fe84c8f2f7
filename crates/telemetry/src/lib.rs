//! Stats, health, and tracing for the event aggregator.
//!
//! Pipeline counters live in an owned [`Stats`] object handed to the
//! boundary and the workers; nothing here is persisted.

pub mod health;
pub mod metrics;
pub mod stats;
pub mod tracing_setup;

pub use health::*;
pub use metrics::{Counter, Histogram};
pub use stats::*;
pub use tracing_setup::*;
