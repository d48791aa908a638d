//! Seams between the supervisor and the wire.
//!
//! A [`Connector`] opens identified sessions; a [`ControlSession`] issues
//! requests on one of them. Sessions report asynchronous close, error and
//! scene-change notices through the [`SessionEvents`] handle they were opened
//! with. Every notice carries the generation of the connect attempt that
//! produced the session, so the supervisor can ignore sessions it already
//! replaced.

use std::sync::Arc;

use async_trait::async_trait;
use scenedeck_core::ControlError;
use tokio::sync::mpsc;

/// What happened on a session.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum NoticeKind {
    /// The connection closed.
    Closed,
    /// The transport failed.
    Error(String),
    /// The program scene changed.
    SceneChanged(String),
}

/// A notice tagged with the session generation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SessionNotice {
    /// Connect attempt that opened the session.
    pub generation: u64,
    /// What happened.
    pub kind: NoticeKind,
}

/// Handle a session reports its notices through.
#[derive(Clone, Debug)]
pub struct SessionEvents {
    generation: u64,
    tx: mpsc::UnboundedSender<SessionNotice>,
}

impl SessionEvents {
    /// Handle for sessions of `generation`, feeding `tx`.
    pub fn new(generation: u64, tx: mpsc::UnboundedSender<SessionNotice>) -> Self {
        Self { generation, tx }
    }

    /// A handle plus the receiving end, for driving a session by hand.
    pub fn channel(generation: u64) -> (Self, mpsc::UnboundedReceiver<SessionNotice>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self::new(generation, tx), rx)
    }

    /// Generation the handle was issued for.
    pub fn generation(&self) -> u64 {
        self.generation
    }

    /// Report that the connection closed.
    pub fn closed(&self) {
        self.send(NoticeKind::Closed);
    }

    /// Report a transport error.
    pub fn error(&self, message: impl Into<String>) {
        self.send(NoticeKind::Error(message.into()));
    }

    /// Report a program scene change.
    pub fn scene_changed(&self, scene_name: impl Into<String>) {
        self.send(NoticeKind::SceneChanged(scene_name.into()));
    }

    fn send(&self, kind: NoticeKind) {
        // receiver gone means the supervisor is gone
        let _ = self.tx.send(SessionNotice {
            generation: self.generation,
            kind,
        });
    }
}

/// Opens identified sessions to the control endpoint.
#[async_trait]
pub trait Connector: Send + Sync {
    /// Connect, run the Hello/Identify handshake and return the live session.
    ///
    /// `password` is `None` when authentication is disabled.
    async fn connect(
        &self,
        url: &str,
        password: Option<&str>,
        events: SessionEvents,
    ) -> Result<Arc<dyn ControlSession>, ControlError>;
}

/// One identified session.
#[async_trait]
pub trait ControlSession: Send + Sync {
    /// Name of the current program scene.
    async fn current_program_scene(&self) -> Result<String, ControlError>;

    /// Switch the program output to `scene_name`.
    async fn set_current_program_scene(&self, scene_name: &str) -> Result<(), ControlError>;

    /// Close the session. Best-effort, never fails.
    async fn disconnect(&self);
}
