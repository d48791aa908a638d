//! Identifiers.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Identifier of one open event-stream subscriber.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ClientId(pub String);

impl Default for ClientId {
    fn default() -> Self {
        Self(format!("client_{}", Uuid::now_v7()))
    }
}

impl ClientId {
    /// Generate a fresh, unique client id.
    pub fn new() -> Self {
        Self::default()
    }

    /// Borrow the id as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for ClientId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Button identifier (creation time in epoch milliseconds for new buttons).
pub type ButtonId = u64;

/// Category identifier.
pub type CategoryId = u64;

/// The category buttons fall back to when none is set.
pub const DEFAULT_CATEGORY_ID: CategoryId = 1;
