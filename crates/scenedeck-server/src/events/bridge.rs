//! Forwards supervisor scene changes to event-stream subscribers.

use std::sync::Arc;

use scenedeck_core::StreamMessage;
use scenedeck_obs::ControlEvent;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use super::broadcast::EventBroadcaster;

/// Subscribes to [`ControlEvent`]s and broadcasts `sceneChanged` frames.
pub struct EventBridge {
    rx: broadcast::Receiver<ControlEvent>,
    broadcaster: Arc<EventBroadcaster>,
}

impl EventBridge {
    /// Bridge from `rx` into `broadcaster`.
    pub fn new(rx: broadcast::Receiver<ControlEvent>, broadcaster: Arc<EventBroadcaster>) -> Self {
        Self { rx, broadcaster }
    }

    /// Run until the sender is dropped or `shutdown` is cancelled.
    #[tracing::instrument(skip_all, name = "event_bridge")]
    pub async fn run(mut self, shutdown: CancellationToken) {
        loop {
            let received = tokio::select! {
                () = shutdown.cancelled() => break,
                received = self.rx.recv() => received,
            };
            match received {
                Ok(ControlEvent::SceneChanged(scene)) => {
                    let _ = self.broadcaster.broadcast(&StreamMessage::scene_changed(scene));
                }
                Ok(other) => tracing::debug!(event = ?other, "not forwarded"),
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "event bridge lagged, dropped events");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("event bridge channel closed");
                    break;
                }
            }
        }
    }
}
