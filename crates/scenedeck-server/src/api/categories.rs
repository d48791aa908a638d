//! Category CRUD.

use axum::Json;
use axum::extract::{Path, State};
use axum::http::StatusCode;
use scenedeck_core::events::MessageResponse;
use scenedeck_core::ids::CategoryId;
use scenedeck_core::model::{Category, CategoryDraft};

use super::ApiError;
use crate::server::AppState;

/// `GET /api/categories`, sorted by order then name.
pub async fn list(State(state): State<AppState>) -> Result<Json<Vec<Category>>, ApiError> {
    Ok(Json(state.store.categories.list()?))
}

/// `POST /api/categories`
pub async fn create(
    State(state): State<AppState>,
    Json(draft): Json<CategoryDraft>,
) -> Result<(StatusCode, Json<Category>), ApiError> {
    let category = state.store.categories.create(draft)?;
    Ok((StatusCode::CREATED, Json(category)))
}

/// `PUT /api/categories/{id}`
pub async fn update(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
    Json(draft): Json<CategoryDraft>,
) -> Result<Json<Category>, ApiError> {
    Ok(Json(state.store.categories.update(id, &draft)?))
}

/// `DELETE /api/categories/{id}`: its buttons move to the default category.
pub async fn delete(
    State(state): State<AppState>,
    Path(id): Path<CategoryId>,
) -> Result<Json<MessageResponse>, ApiError> {
    let moved = state.store.delete_category(id)?;
    tracing::info!(id, moved, "category deleted");
    Ok(Json(MessageResponse::new(format!(
        "Category deleted, {moved} button(s) moved to the default category"
    ))))
}
