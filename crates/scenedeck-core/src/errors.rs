//! Errors raised while talking to the control endpoint.

use thiserror::Error;

/// Failure of a control-endpoint operation.
///
/// None of these are fatal to the process: connect failures are retried by
/// the reconnect loop, the others are surfaced to the caller that issued the
/// command.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
pub enum ControlError {
    /// The endpoint was unreachable, the handshake failed or authentication was rejected.
    #[error("connection to {url} failed: {reason}")]
    ConnectFailed {
        /// Endpoint URL that was dialed.
        url: String,
        /// Why the attempt failed.
        reason: String,
    },

    /// A command was issued while no identified session exists.
    #[error("not connected to OBS")]
    NotConnected,

    /// The endpoint rejected (or never answered) a request.
    #[error("{request} failed: {reason}")]
    CommandFailed {
        /// Request type that failed (e.g. `SetCurrentProgramScene`).
        request: String,
        /// Status comment or transport error.
        reason: String,
    },
}

impl ControlError {
    /// Build a [`ControlError::ConnectFailed`].
    pub fn connect_failed(url: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::ConnectFailed {
            url: url.into(),
            reason: reason.into(),
        }
    }

    /// Build a [`ControlError::CommandFailed`].
    pub fn command_failed(request: impl Into<String>, reason: impl Into<String>) -> Self {
        Self::CommandFailed {
            request: request.into(),
            reason: reason.into(),
        }
    }

    /// Whether a connect failure looks like a rejected or missing password.
    pub fn is_authentication_failure(&self) -> bool {
        matches!(self, Self::ConnectFailed { reason, .. } if reason.contains("authentication"))
    }

    /// Short classification string for logging.
    pub fn error_kind(&self) -> &'static str {
        match self {
            Self::ConnectFailed { .. } => "connect_failed",
            Self::NotConnected => "not_connected",
            Self::CommandFailed { .. } => "command_failed",
        }
    }
}
