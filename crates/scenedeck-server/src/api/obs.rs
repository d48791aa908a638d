//! Connection status, reconnect, scene switching and the event stream.

use axum::Json;
use axum::body::Body;
use axum::extract::State;
use axum::http::header;
use axum::response::IntoResponse;
use scenedeck_core::ObsStatus;
use scenedeck_core::events::{ChangeSceneRequest, MessageResponse};

use super::ApiError;
use crate::events::SubscriberStream;
use crate::server::AppState;

/// `GET /api/obs-status`
pub async fn status(State(state): State<AppState>) -> Json<ObsStatus> {
    Json(state.supervisor.status().await)
}

/// `POST /api/obs-reconnect`: disconnect, settle, connect.
///
/// A failed connect leaves the reconnect loop running and answers 500.
pub async fn reconnect(State(state): State<AppState>) -> Result<Json<MessageResponse>, ApiError> {
    tracing::info!("reconnect requested");
    state
        .supervisor
        .reconnect(state.config.reconnect_settle)
        .await?;
    Ok(Json(MessageResponse::new("Reconnected to OBS")))
}

/// `POST /api/change-scene`
pub async fn change_scene(
    State(state): State<AppState>,
    Json(body): Json<ChangeSceneRequest>,
) -> Result<Json<MessageResponse>, ApiError> {
    let scene_name = body
        .scene_name
        .filter(|s| !s.is_empty())
        .ok_or_else(|| ApiError::BadRequest("sceneName is required".into()))?;
    state.supervisor.change_scene(&scene_name).await?;
    Ok(Json(MessageResponse::new(format!(
        "Scene changed to: {scene_name}"
    ))))
}

/// `GET /api/events`: `text/event-stream` of `data: <json>\n\n` frames.
pub async fn events(State(state): State<AppState>) -> impl IntoResponse {
    let stream = SubscriberStream::open(state.broadcaster.clone());
    tracing::debug!(client_id = %stream.id(), "event stream opened");
    (
        [
            (header::CONTENT_TYPE, "text/event-stream"),
            (header::CACHE_CONTROL, "no-cache"),
        ],
        Body::from_stream(stream),
    )
}
