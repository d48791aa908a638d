//! App settings.

use axum::Json;
use axum::extract::State;
use scenedeck_core::model::{AppSettings, SettingsPatch};

use super::ApiError;
use crate::server::AppState;

/// `GET /api/settings`
pub async fn get(State(state): State<AppState>) -> Result<Json<AppSettings>, ApiError> {
    Ok(Json(state.store.settings.load()?))
}

/// `PUT /api/settings`
///
/// A changed password schedules a reconnect after the configured delay;
/// the response does not wait for it.
pub async fn update(
    State(state): State<AppState>,
    Json(patch): Json<SettingsPatch>,
) -> Result<Json<AppSettings>, ApiError> {
    let update = state.store.settings.update(&patch)?;
    if update.password_changed {
        tracing::info!("OBS password changed, reconnecting");
        let supervisor = state.supervisor.clone();
        let delay = state.config.password_change_delay;
        drop(tokio::spawn(async move {
            // failures start the reconnect loop and are logged by the supervisor
            let _ = supervisor.reconnect(delay).await;
        }));
    }
    Ok(Json(update.settings))
}
