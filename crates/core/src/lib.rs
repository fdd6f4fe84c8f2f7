//! Core types, validation, and errors for the event aggregator.

pub mod error;
pub mod events;
pub mod limits;

pub use error::{Error, Result, StorageErrorCode, ValidationErrorCode};
pub use events::*;
