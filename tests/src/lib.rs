//! Shared harness for the event aggregator integration tests.

pub mod fixtures;
pub mod setup;
