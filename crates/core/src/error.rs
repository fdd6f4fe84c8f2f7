//! Unified error types for the event aggregator.
//!
//! Error codes:
//! - VALID_001-003: Validation errors (rejected at the publish boundary)
//! - STORE_001-002: Storage errors (dedup store, sink)

use thiserror::Error;

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Validation error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationErrorCode {
    /// VALID_001: Invalid JSON / Invalid event
    InvalidFormat,
    /// VALID_002: Request exceeds the body size or event count limit
    BatchTooLarge,
    /// VALID_003: Event exceeds 64KB
    EventTooLarge,
}

impl ValidationErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidFormat => "VALID_001",
            Self::BatchTooLarge => "VALID_002",
            Self::EventTooLarge => "VALID_003",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        400
    }
}

/// Storage error codes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageErrorCode {
    /// STORE_001: Dedup store read or write failed
    DedupStore,
    /// STORE_002: Sink append or read failed
    Sink,
}

impl StorageErrorCode {
    /// Get the error code string.
    pub fn code(&self) -> &'static str {
        match self {
            Self::DedupStore => "STORE_001",
            Self::Sink => "STORE_002",
        }
    }

    /// Get the HTTP status code.
    pub fn http_status(&self) -> u16 {
        500
    }
}

/// Unified error type for the event aggregator.
#[derive(Debug, Error)]
pub enum Error {
    /// Validation error with code.
    #[error("[{code}] {message}")]
    ValidationWithCode {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    /// Storage error with code.
    #[error("[{code}] {message}")]
    Storage {
        code: &'static str,
        message: String,
        http_status: u16,
    },

    #[error("validation error: {0}")]
    Validation(String),

    #[error("invalid topic: {0}")]
    InvalidTopic(String),

    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    #[error("internal error: {0}")]
    Internal(String),
}

impl Error {
    /// Create a validation error with code.
    pub fn validation_code(code: ValidationErrorCode, msg: impl Into<String>) -> Self {
        Self::ValidationWithCode {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    /// Create a storage error.
    pub fn storage(code: StorageErrorCode, msg: impl Into<String>) -> Self {
        Self::Storage {
            code: code.code(),
            message: msg.into(),
            http_status: code.http_status(),
        }
    }

    pub fn validation(msg: impl Into<String>) -> Self {
        Self::Validation(msg.into())
    }

    pub fn invalid_topic(msg: impl Into<String>) -> Self {
        Self::InvalidTopic(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        Self::Internal(msg.into())
    }

    /// Whether this error came from the dedup store or the sink.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Storage { .. } | Self::Io(_))
    }

    /// Get the HTTP status code for this error.
    pub fn http_status(&self) -> u16 {
        match self {
            Self::ValidationWithCode { http_status, .. } => *http_status,
            Self::Storage { http_status, .. } => *http_status,
            Self::Validation(_) => 400,
            Self::InvalidTopic(_) => 400,
            Self::Serialization(_) => 400,
            Self::Io(_) => 500,
            Self::Internal(_) => 500,
        }
    }

    /// Get the error code if this is a coded error.
    pub fn error_code(&self) -> Option<&'static str> {
        match self {
            Self::ValidationWithCode { code, .. } => Some(code),
            Self::Storage { code, .. } => Some(code),
            _ => None,
        }
    }
}
