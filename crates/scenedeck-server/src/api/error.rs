//! Handler errors rendered as `{error}` bodies.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use scenedeck_core::ControlError;
use scenedeck_core::events::ErrorResponse;
use scenedeck_store::StoreError;
use thiserror::Error;

/// Error returned by an API handler.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed or incomplete request (400).
    #[error("{0}")]
    BadRequest(String),
    /// Unknown record (404).
    #[error("{0} not found")]
    NotFound(&'static str),
    /// Control-endpoint failure (500).
    #[error(transparent)]
    Control(#[from] ControlError),
    /// Anything else (500).
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    /// HTTP status for the error.
    pub fn status(&self) -> StatusCode {
        match self {
            Self::BadRequest(_) => StatusCode::BAD_REQUEST,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Control(_) | Self::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<StoreError> for ApiError {
    fn from(e: StoreError) -> Self {
        match e {
            StoreError::NotFound { entity, .. } => Self::NotFound(entity),
            StoreError::Invalid { reason, .. } => Self::BadRequest(reason),
            other => {
                tracing::error!(error = %other, "data store failure");
                Self::Internal(format!("failed to save data: {other}"))
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        if status.is_server_error() {
            tracing::warn!(status = status.as_u16(), error = %self, "request failed");
        }
        (status, Json(ErrorResponse { error: self.to_string() })).into_response()
    }
}
