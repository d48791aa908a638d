//! Dashboard client errors.

use thiserror::Error;

/// Failure talking to the SceneDeck server.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Transport failure or non-success status.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// The body was not the JSON we expected.
    #[error("unexpected response body: {0}")]
    Decode(#[from] serde_json::Error),
}

/// Convenience alias.
pub type Result<T> = std::result::Result<T, DashboardError>;
