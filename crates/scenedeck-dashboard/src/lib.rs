//! # scenedeck-dashboard
//!
//! The dashboard side of SceneDeck, in Rust: the same polling and push
//! handling the browser client does, against the server's HTTP API.
//!
//! - [`StatusPoller`] fetches `GET /api/obs-status` every few seconds
//! - [`EventListener`] follows `GET /api/events` and reconnects after errors
//! - [`DashboardState`] is where both land; applying a scene is idempotent
//!   and the last write wins

#![deny(unsafe_code)]

pub mod client;
pub mod errors;
pub mod listener;
pub mod poller;
pub mod reconcile;
pub mod sse;

pub use client::DeckClient;
pub use errors::{DashboardError, Result};
pub use listener::EventListener;
pub use poller::StatusPoller;
pub use reconcile::{ConnectionIndicator, DashboardState, SharedState};
