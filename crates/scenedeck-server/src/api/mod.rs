//! JSON API routes.

pub mod buttons;
pub mod categories;
pub mod error;
pub mod obs;
pub mod settings;

use axum::Router;
use axum::routing::{get, post, put};

use crate::server::AppState;

pub use error::ApiError;

/// Every `/api` route.
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/api/obs-status", get(obs::status))
        .route("/api/obs-reconnect", post(obs::reconnect))
        .route("/api/change-scene", post(obs::change_scene))
        .route("/api/events", get(obs::events))
        .route("/api/buttons", get(buttons::list).post(buttons::create))
        .route(
            "/api/buttons/{id}",
            put(buttons::update).delete(buttons::delete),
        )
        .route(
            "/api/categories",
            get(categories::list).post(categories::create),
        )
        .route(
            "/api/categories/{id}",
            put(categories::update).delete(categories::delete),
        )
        .route("/api/settings", get(settings::get).put(settings::update))
}
