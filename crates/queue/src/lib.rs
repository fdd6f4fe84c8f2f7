//! Bounded work queue between the publish boundary and consumers.

pub mod config;
pub mod work_queue;

pub use config::*;
pub use work_queue::*;
