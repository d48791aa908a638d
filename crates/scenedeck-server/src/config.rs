//! Server configuration.

use std::path::PathBuf;
use std::time::Duration;

use scenedeck_settings::DeckSettings;

/// Configuration for the HTTP server.
#[derive(Clone, Debug)]
pub struct ServerConfig {
    /// Host to bind.
    pub host: String,
    /// Port to bind (`0` picks a free port).
    pub port: u16,
    /// Directory served as the fallback route.
    pub public_dir: PathBuf,
    /// Frames queued per event-stream subscriber.
    pub max_send_queue: usize,
    /// Pause between disconnect and connect on `POST /api/obs-reconnect`.
    pub reconnect_settle: Duration,
    /// Pause before reconnecting after a password change.
    pub password_change_delay: Duration,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".into(),
            port: 0,
            public_dir: PathBuf::from("public"),
            max_send_queue: 64,
            reconnect_settle: Duration::from_millis(500),
            password_change_delay: Duration::from_secs(1),
        }
    }
}

impl ServerConfig {
    /// Server section of the loaded settings.
    pub fn from_settings(settings: &DeckSettings) -> Self {
        Self {
            host: settings.server.host.clone(),
            port: settings.server.port,
            public_dir: PathBuf::from(&settings.server.public_dir),
            max_send_queue: settings.server.max_send_queue,
            reconnect_settle: settings.obs.reconnect_settle(),
            password_change_delay: settings.obs.password_change_delay(),
        }
    }

    /// `host:port` to bind.
    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }
}
