//! Store error types.

use thiserror::Error;

/// Errors raised by the JSON-file repositories.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Reading or writing a data file failed.
    #[error("data file I/O failed: {0}")]
    Io(#[from] std::io::Error),
    /// A data file holds invalid JSON.
    #[error("data file is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// No record with the requested id.
    #[error("{entity} {id} not found")]
    NotFound {
        /// Record kind ("button", "category").
        entity: &'static str,
        /// Requested id.
        id: u64,
    },
    /// The request was rejected before touching the file.
    #[error("invalid {entity}: {reason}")]
    Invalid {
        /// Record kind.
        entity: &'static str,
        /// What is wrong.
        reason: String,
    },
}

/// Result type for store operations.
pub type Result<T> = std::result::Result<T, StoreError>;
