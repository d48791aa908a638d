//! # scenedeck-server
//!
//! Axum HTTP server for the SceneDeck dashboard.
//!
//! - JSON API: connection status and control, scene switching, buttons,
//!   categories and app settings
//! - `GET /api/events`: Server-Sent Events fan-out of scene changes
//! - Static dashboard files as the fallback route
//! - Graceful shutdown via `CancellationToken`

#![deny(unsafe_code)]

pub mod api;
pub mod config;
pub mod events;
pub mod health;
pub mod server;
pub mod shutdown;
