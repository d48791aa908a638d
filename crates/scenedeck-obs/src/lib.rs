//! # scenedeck-obs
//!
//! The single outbound connection to OBS Studio's obs-websocket (v5) endpoint.
//!
//! - [`protocol`]: opcodes, message shapes and the authentication hash
//! - [`transport`]: the [`Connector`] / [`ControlSession`] seams and the
//!   notification channel sessions report close, error and scene-change on
//! - [`client`]: the real [`WsConnector`] over `tokio-tungstenite`
//! - [`supervisor`]: [`ConnectionSupervisor`], which owns the session and its state
//! - [`scheduler`]: [`ReconnectScheduler`], the periodic retry loop
//!
//! With the `test-util` feature, [`testing`] provides a scripted connector and
//! an in-process fake endpoint.

#![deny(unsafe_code)]

pub mod client;
pub mod protocol;
pub mod scheduler;
pub mod supervisor;
#[cfg(any(test, feature = "test-util"))]
pub mod testing;
pub mod transport;

pub use client::WsConnector;
pub use scheduler::{ReconnectScheduler, ReconnectTarget};
pub use supervisor::{ConnectionState, ConnectionSupervisor, ControlEvent};
pub use transport::{Connector, ControlSession, NoticeKind, SessionEvents, SessionNotice};
