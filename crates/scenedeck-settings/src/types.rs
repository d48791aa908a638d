//! Settings types with compiled defaults.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Root configuration.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DeckSettings {
    /// HTTP server.
    pub server: ServerSettings,
    /// Control-endpoint connection.
    pub obs: ObsSettings,
    /// Where the JSON data files live.
    pub data: DataSettings,
    /// Logging.
    pub logging: LoggingSettings,
}

/// HTTP server settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ServerSettings {
    /// Bind address.
    pub host: String,
    /// Bind port.
    pub port: u16,
    /// Directory served as static files.
    pub public_dir: String,
    /// Frames queued per event-stream subscriber before writes fail.
    pub max_send_queue: usize,
}

impl Default for ServerSettings {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 3000,
            public_dir: "public".to_string(),
            max_send_queue: 64,
        }
    }
}

/// Control-endpoint (obs-websocket) settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct ObsSettings {
    /// WebSocket URL of the control endpoint.
    pub url: String,
    /// Period of the reconnect loop.
    pub reconnect_interval_ms: u64,
    /// Pause between disconnect and connect on a manual reconnect.
    pub reconnect_settle_ms: u64,
    /// Pause before reconnecting after the password was changed.
    pub password_change_delay_ms: u64,
    /// Upper bound on the Hello/Identify handshake.
    pub handshake_timeout_ms: u64,
    /// Upper bound on a single request/response round trip.
    pub request_timeout_ms: u64,
}

impl Default for ObsSettings {
    fn default() -> Self {
        Self {
            url: "ws://localhost:4455".to_string(),
            reconnect_interval_ms: 5000,
            reconnect_settle_ms: 500,
            password_change_delay_ms: 1000,
            handshake_timeout_ms: 10_000,
            request_timeout_ms: 10_000,
        }
    }
}

impl ObsSettings {
    /// Reconnect loop period.
    pub fn reconnect_interval(&self) -> Duration {
        Duration::from_millis(self.reconnect_interval_ms)
    }

    /// Settle delay for manual reconnects.
    pub fn reconnect_settle(&self) -> Duration {
        Duration::from_millis(self.reconnect_settle_ms)
    }

    /// Delay before reconnecting with a new password.
    pub fn password_change_delay(&self) -> Duration {
        Duration::from_millis(self.password_change_delay_ms)
    }

    /// Handshake timeout.
    pub fn handshake_timeout(&self) -> Duration {
        Duration::from_millis(self.handshake_timeout_ms)
    }

    /// Request timeout.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_millis(self.request_timeout_ms)
    }
}

/// Data directory settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct DataSettings {
    /// Directory holding `buttons.json`, `categories.json` and `settings.json`.
    pub dir: String,
}

impl Default for DataSettings {
    fn default() -> Self {
        Self {
            dir: "data".to_string(),
        }
    }
}

impl DataSettings {
    /// Data directory as a path.
    pub fn path(&self) -> PathBuf {
        PathBuf::from(&self.dir)
    }
}

/// Logging settings.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct LoggingSettings {
    /// Default filter directive; `RUST_LOG` wins when set.
    pub level: String,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}
