//! `DeckServer`: router assembly and listening.

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::extract::State;
use axum::response::Json;
use axum::routing::get;
use scenedeck_obs::ConnectionSupervisor;
use scenedeck_store::DataStore;
use tokio::task::JoinHandle;
use tower_http::cors::CorsLayer;
use tower_http::services::ServeDir;
use tower_http::trace::TraceLayer;

use crate::config::ServerConfig;
use crate::events::{EventBridge, EventBroadcaster};
use crate::health::{self, HealthResponse};
use crate::shutdown::ShutdownCoordinator;

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// The control-endpoint connection.
    pub supervisor: Arc<ConnectionSupervisor>,
    /// Event-stream subscribers.
    pub broadcaster: Arc<EventBroadcaster>,
    /// JSON data files.
    pub store: DataStore,
    /// Server settings.
    pub config: Arc<ServerConfig>,
    /// When the server started.
    pub start_time: Instant,
}

/// The SceneDeck HTTP server.
pub struct DeckServer {
    config: Arc<ServerConfig>,
    supervisor: Arc<ConnectionSupervisor>,
    broadcaster: Arc<EventBroadcaster>,
    store: DataStore,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
}

impl DeckServer {
    /// Create a server around an existing supervisor and data store.
    pub fn new(config: ServerConfig, supervisor: Arc<ConnectionSupervisor>, store: DataStore) -> Self {
        Self {
            broadcaster: Arc::new(EventBroadcaster::new(config.max_send_queue)),
            config: Arc::new(config),
            supervisor,
            store,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
        }
    }

    /// Build the router: `/health`, the JSON API, and static files as fallback.
    pub fn router(&self) -> Router {
        let state = AppState {
            supervisor: self.supervisor.clone(),
            broadcaster: self.broadcaster.clone(),
            store: self.store.clone(),
            config: self.config.clone(),
            start_time: self.start_time,
        };

        Router::new()
            .route("/health", get(health_handler))
            .merge(crate::api::routes())
            .fallback_service(ServeDir::new(&self.config.public_dir))
            .with_state(state)
            .layer(TraceLayer::new_for_http())
            .layer(CorsLayer::permissive())
    }

    /// Spawn the task forwarding supervisor scene changes to subscribers.
    pub fn spawn_event_bridge(&self) -> JoinHandle<()> {
        let bridge = EventBridge::new(self.supervisor.subscribe(), self.broadcaster.clone());
        tokio::spawn(bridge.run(self.shutdown.token()))
    }

    /// Bind and serve until shutdown. Returns the bound address and the
    /// serving task.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = tokio::net::TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let router = self.router();
        let token = self.shutdown.token();

        tracing::info!(%addr, public_dir = %self.config.public_dir.display(), "SceneDeck server listening");

        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, router)
                .with_graceful_shutdown(async move { token.cancelled().await })
                .await
            {
                tracing::error!(error = %e, "server stopped with error");
            }
        });
        Ok((addr, handle))
    }

    /// Event-stream subscriber registry.
    pub fn broadcaster(&self) -> &Arc<EventBroadcaster> {
        &self.broadcaster
    }

    /// The control-endpoint supervisor.
    pub fn supervisor(&self) -> &Arc<ConnectionSupervisor> {
        &self.supervisor
    }

    /// Shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        state.broadcaster.subscriber_count(),
        state.supervisor.is_connected(),
    ))
}
