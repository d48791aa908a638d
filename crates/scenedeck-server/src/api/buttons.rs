//! Button CRUD.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use scenedeck_core::events::MessageResponse;
use scenedeck_core::ids::ButtonId;
use scenedeck_core::model::{Button, ButtonDraft, ButtonPatch};

use super::ApiError;
use crate::server::AppState;

/// `GET /api/buttons`
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Button>>, ApiError> {
    Ok(Json(state.store.buttons.list()?))
}

/// `POST /api/buttons`
pub async fn create(
    State(state): State<AppState>,
    Json(draft): Json<ButtonDraft>,
) -> Result<(StatusCode, Json<Button>), ApiError> {
    let button = state.store.buttons.create(draft)?;
    tracing::info!(id = button.id, scene = %button.scene, "button created");
    Ok((StatusCode::CREATED, Json(button)))
}

/// `PUT /api/buttons/{id}`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<ButtonId>,
    Json(patch): Json<ButtonPatch>,
) -> Result<Json<Button>, ApiError> {
    Ok(Json(state.store.buttons.update(id, &patch)?))
}

/// `DELETE /api/buttons/{id}`
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<ButtonId>,
) -> Result<Json<MessageResponse>, ApiError> {
    state.store.buttons.delete(id)?;
    tracing::info!(id, "button deleted");
    Ok(Json(MessageResponse::new("Button deleted")))
}
