//! # scenedeck-settings
//!
//! Process configuration with layered sources.
//!
//! Settings are loaded from three layers (in priority order):
//! 1. **Compiled defaults**: [`DeckSettings::default()`]
//! 2. **Config file**: `scenedeck.json` (deep-merged over defaults)
//! 3. **Environment variables**: `SCENEDECK_*` overrides (highest priority)
//!
//! User-editable values (dashboard title, OBS password) are not configuration;
//! they live in the data directory and are handled by `scenedeck-store`.

#![deny(unsafe_code)]

pub mod errors;
pub mod loader;
pub mod types;

pub use errors::{Result, SettingsError};
pub use loader::{deep_merge, load_settings, load_settings_from_path, settings_path};
pub use types::*;
