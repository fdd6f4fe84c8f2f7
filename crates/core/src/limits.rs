//! Size and length limits for published events.
//!
//! The `#[validate]` derive macro requires literal values in attributes,
//! so field limits are duplicated on `Event`. Keep both in sync when modifying.

// === Request Limits ===

/// Maximum publish request body size in bytes (1MB).
pub const MAX_BATCH_SIZE_BYTES: usize = 1024 * 1024;

/// Maximum events per publish request.
pub const MAX_BATCH_EVENTS: usize = 1000;

/// Maximum single event size in bytes once serialized (64KB).
pub const MAX_EVENT_SIZE_BYTES: usize = 64 * 1024;

// === String Field Limits (bytes) ===

/// Topic name max length.
///
/// Topics become file names in the processed directory, so this stays
/// under the common 255-byte file name limit once `.ndjson` is appended.
pub const MAX_TOPIC_LEN: usize = 240;
