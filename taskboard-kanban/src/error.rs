//! Error types for the task board engine

use taskboard_store::StoreError;
use thiserror::Error;

/// Result type for board operations
pub type Result<T> = std::result::Result<T, BoardError>;

/// Errors that can occur in board operations
#[derive(Debug, Error)]
pub enum BoardError {
    /// A storage backend could not be opened
    #[error("storage unavailable: {0}")]
    StorageUnavailable(#[source] StoreError),

    /// A write to a storage backend was rejected or failed
    #[error("failed to write '{key}': {source}")]
    StorageWriteFailed {
        key: String,
        #[source]
        source: StoreError,
    },

    /// A stored value could not be read or decoded
    #[error("failed to read '{key}': {message}")]
    StorageReadFailed { key: String, message: String },

    /// Task not found
    #[error("task not found: {id}")]
    TaskNotFound { id: String },

    /// Board not found
    #[error("board not found: {id}")]
    BoardNotFound { id: String },

    /// Column not found
    #[error("column not found: {id}")]
    ColumnNotFound { id: String },

    /// Generic resource not found (templates, recurrence rules, subtasks...)
    #[error("{resource} not found: {id}")]
    NotFound { resource: String, id: String },

    /// The operation would break a structural invariant
    #[error("invariant violation: {message}")]
    InvariantViolation { message: String },

    /// Invalid field value
    #[error("invalid value for {field}: {message}")]
    InvalidValue { field: String, message: String },

    /// Operation not valid in the current state
    #[error("invalid operation: {message}")]
    InvalidOperation { message: String },

    /// Configuration could not be extracted
    #[error("configuration error: {0}")]
    Config(#[from] figment::Error),

    /// JSON serialization error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl BoardError {
    /// Create a write failure for `key`
    pub fn write_failed(key: impl Into<String>, source: StoreError) -> Self {
        Self::StorageWriteFailed {
            key: key.into(),
            source,
        }
    }

    /// Create a read failure for `key`
    pub fn read_failed(key: impl Into<String>, message: impl ToString) -> Self {
        Self::StorageReadFailed {
            key: key.into(),
            message: message.to_string(),
        }
    }

    /// Create a generic not-found error
    pub fn not_found(resource: impl Into<String>, id: impl Into<String>) -> Self {
        Self::NotFound {
            resource: resource.into(),
            id: id.into(),
        }
    }

    /// Create an invariant violation error
    pub fn invariant(message: impl Into<String>) -> Self {
        Self::InvariantViolation {
            message: message.into(),
        }
    }

    /// Create an invalid value error
    pub fn invalid_value(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self::InvalidValue {
            field: field.into(),
            message: message.into(),
        }
    }

    /// Create an invalid operation error
    pub fn invalid_operation(message: impl Into<String>) -> Self {
        Self::InvalidOperation {
            message: message.into(),
        }
    }

    /// Check if this is a retryable error
    ///
    /// Write failures leave the in-memory state intact, so the same save can
    /// be attempted again.
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::StorageWriteFailed { .. })
    }
}
