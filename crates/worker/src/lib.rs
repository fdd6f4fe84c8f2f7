//! Consumer side of the event aggregator.
//!
//! Workers take events off the shared [`queue::WorkQueue`], drop duplicates
//! through the dedup store and append first sightings to the sink.

pub mod consumer;
pub mod pool;
pub mod processor;

#[cfg(test)]
mod testing;

pub use consumer::ConsumerWorker;
pub use pool::*;
pub use processor::*;
