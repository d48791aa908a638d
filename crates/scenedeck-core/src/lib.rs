//! # scenedeck-core
//!
//! Shared vocabulary for the SceneDeck workspace:
//!
//! - **Wire types**: [`events::StreamMessage`] (SSE payloads), [`events::ObsStatus`],
//!   JSON request/response bodies of the HTTP API
//! - **Data model**: buttons, categories and app settings persisted as JSON
//! - **Errors**: [`errors::ControlError`] for the control-endpoint connection
//! - **Credentials**: the [`credentials::CredentialSource`] seam read on every connect
//! - **Logging**: [`logging::init_subscriber`]

#![deny(unsafe_code)]

pub mod credentials;
pub mod errors;
pub mod events;
pub mod ids;
pub mod logging;
pub mod model;

pub use credentials::{CredentialSource, StaticCredentials};
pub use errors::ControlError;
pub use events::{ObsStatus, StreamMessage};
pub use ids::ClientId;
