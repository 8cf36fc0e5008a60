//! Error types for the storage backends

use std::path::PathBuf;
use thiserror::Error;

/// Result type for store operations
pub type Result<T> = std::result::Result<T, StoreError>;

/// Errors that can occur in a blob or scalar store
#[derive(Debug, Error)]
pub enum StoreError {
    /// The backend could not be opened or initialized
    #[error("store unavailable at {path}: {source}")]
    Unavailable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A value exceeded the store's per-value size limit
    #[error("value for '{key}' is {size} bytes, limit is {limit}")]
    QuotaExceeded {
        key: String,
        size: usize,
        limit: usize,
    },

    /// A stored value could not be decoded
    #[error("corrupt entry '{key}': {message}")]
    Corrupt { key: String, message: String },

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl StoreError {
    /// Create a corrupt entry error
    pub fn corrupt(key: impl Into<String>, message: impl Into<String>) -> Self {
        Self::Corrupt {
            key: key.into(),
            message: message.into(),
        }
    }

    /// Check if this error means the store rejected the value for its size
    pub fn is_quota_exceeded(&self) -> bool {
        matches!(self, Self::QuotaExceeded { .. })
    }
}
