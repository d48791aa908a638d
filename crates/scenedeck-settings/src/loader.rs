//! Settings loading with deep merge and environment variable overrides.
//!
//! Loading flow:
//! 1. Start with compiled [`DeckSettings::default()`]
//! 2. If the config file exists, deep-merge its values over defaults
//! 3. Apply `SCENEDECK_*` environment variable overrides (highest priority)
//! 4. Validate
//!
//! Deep merge rules:
//! - Objects are merged recursively (source overrides target per-key)
//! - Arrays and primitives are replaced entirely by source
//! - Null values in source are skipped (preserving target)

use std::path::{Path, PathBuf};

use serde_json::Value;
use tracing::debug;

use crate::errors::{Result, SettingsError};
use crate::types::DeckSettings;

/// Default config file name, resolved against the working directory.
const SETTINGS_FILE_NAME: &str = "scenedeck.json";

/// Resolve the config file path: `SCENEDECK_CONFIG` or `./scenedeck.json`.
pub fn settings_path() -> PathBuf {
    read_env_string("SCENEDECK_CONFIG").map_or_else(|| PathBuf::from(SETTINGS_FILE_NAME), PathBuf::from)
}

/// Load settings from the default path with env var overrides.
pub fn load_settings() -> Result<DeckSettings> {
    load_settings_from_path(&settings_path())
}

/// Load settings from a specific path with env var overrides.
///
/// A missing file yields defaults. Invalid JSON or an out-of-range value is
/// an error.
pub fn load_settings_from_path(path: &Path) -> Result<DeckSettings> {
    let defaults = serde_json::to_value(DeckSettings::default())?;

    let merged = if path.exists() {
        debug!(?path, "loading settings from file");
        let content = std::fs::read_to_string(path)?;
        let user: Value = serde_json::from_str(&content)?;
        deep_merge(defaults, user)
    } else {
        debug!(?path, "settings file not found, using defaults");
        defaults
    };

    let mut settings: DeckSettings = serde_json::from_value(merged)?;
    apply_env_overrides(&mut settings);
    validate(&settings)?;
    Ok(settings)
}

/// Recursive deep merge of two JSON values.
pub fn deep_merge(target: Value, source: Value) -> Value {
    match (target, source) {
        (Value::Object(mut target_map), Value::Object(source_map)) => {
            for (key, source_val) in source_map {
                if source_val.is_null() {
                    continue;
                }
                let merged = if let Some(target_val) = target_map.remove(&key) {
                    deep_merge(target_val, source_val)
                } else {
                    source_val
                };
                let _ = target_map.insert(key, merged);
            }
            Value::Object(target_map)
        }
        (_, source) => source,
    }
}

/// Apply environment variable overrides to loaded settings.
///
/// Invalid values are logged and ignored (the file/default value stays).
pub fn apply_env_overrides(settings: &mut DeckSettings) {
    if let Some(v) = read_env_string("SCENEDECK_HOST") {
        settings.server.host = v;
    }
    if let Some(v) = read_env_u16("SCENEDECK_PORT", 1, 65535) {
        settings.server.port = v;
    }
    if let Some(v) = read_env_string("SCENEDECK_PUBLIC_DIR") {
        settings.server.public_dir = v;
    }
    if let Some(v) = read_env_string("SCENEDECK_OBS_URL") {
        settings.obs.url = v;
    }
    if let Some(v) = read_env_u64("SCENEDECK_RECONNECT_INTERVAL_MS", 100, 3_600_000) {
        settings.obs.reconnect_interval_ms = v;
    }
    if let Some(v) = read_env_string("SCENEDECK_DATA_DIR") {
        settings.data.dir = v;
    }
    if let Some(v) = read_env_string("SCENEDECK_LOG_LEVEL") {
        settings.logging.level = v;
    }
}

/// Reject settings the server cannot run with.
pub fn validate(settings: &DeckSettings) -> Result<()> {
    if settings.obs.reconnect_interval_ms == 0 {
        return Err(SettingsError::InvalidValue(
            "obs.reconnectIntervalMs must be greater than zero".into(),
        ));
    }
    if !settings.obs.url.starts_with("ws://") && !settings.obs.url.starts_with("wss://") {
        return Err(SettingsError::InvalidValue(format!(
            "obs.url must be a ws:// or wss:// URL, got {}",
            settings.obs.url
        )));
    }
    if settings.server.max_send_queue == 0 {
        return Err(SettingsError::InvalidValue(
            "server.maxSendQueue must be greater than zero".into(),
        ));
    }
    Ok(())
}

// ── Pure parsing functions (testable without env vars) ──────────────────────

/// Parse a string as a `u16` within a range.
pub fn parse_u16_range(val: &str, min: u16, max: u16) -> Option<u16> {
    let n: u16 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

/// Parse a string as a `u64` within a range.
pub fn parse_u64_range(val: &str, min: u64, max: u64) -> Option<u64> {
    let n: u64 = val.parse().ok()?;
    (n >= min && n <= max).then_some(n)
}

// ── Env var readers ─────────────────────────────────────────────────────────

fn read_env_string(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.is_empty())
}

fn read_env_u16(name: &str, min: u16, max: u16) -> Option<u16> {
    let val = std::env::var(name).ok()?;
    let result = parse_u16_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u16 env var, ignoring");
    }
    result
}

fn read_env_u64(name: &str, min: u64, max: u64) -> Option<u64> {
    let val = std::env::var(name).ok()?;
    let result = parse_u64_range(&val, min, max);
    if result.is_none() {
        tracing::warn!(key = name, value = %val, "invalid u64 env var, ignoring");
    }
    result
}
