//! Event-stream listener.

use std::time::Duration;

use futures::StreamExt;
use scenedeck_core::StreamMessage;
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::client::DeckClient;
use crate::reconcile::SharedState;
use crate::sse::parse_sse_lines;

/// Delay before reopening the stream after it failed or ended.
pub const DEFAULT_RETRY_DELAY: Duration = Duration::from_secs(5);

/// Follows `GET /api/events` and applies `sceneChanged` pushes to the
/// shared state, reopening the stream after a delay whenever it drops.
pub struct EventListener {
    client: DeckClient,
    state: SharedState,
    retry_delay: Duration,
}

impl EventListener {
    /// Listener over `client` writing into `state`.
    pub fn new(client: DeckClient, state: SharedState, retry_delay: Duration) -> Self {
        Self {
            client,
            state,
            retry_delay,
        }
    }

    /// Apply one `data:` payload. Returns whether the state changed.
    pub fn handle_frame(&self, data: &str) -> bool {
        match serde_json::from_str::<StreamMessage>(data) {
            Ok(StreamMessage::SceneChanged { scene_name }) => {
                debug!(scene = %scene_name, "scene change pushed");
                self.state.apply_scene(&scene_name)
            }
            Ok(StreamMessage::Connected { client_id }) => {
                info!(%client_id, "event stream connected");
                false
            }
            Err(e) => {
                warn!(error = %e, data, "unreadable event frame");
                false
            }
        }
    }

    /// Listen until cancelled.
    pub async fn run(self, cancel: CancellationToken) {
        loop {
            match self.client.events().await {
                Ok(body) => {
                    let frames = parse_sse_lines(body);
                    tokio::pin!(frames);
                    loop {
                        tokio::select! {
                            frame = frames.next() => match frame {
                                Some(data) => {
                                    let _ = self.handle_frame(&data);
                                }
                                None => break,
                            },
                            () = cancel.cancelled() => return,
                        }
                    }
                    warn!("event stream ended");
                }
                Err(e) => warn!(error = %e, "failed to open event stream"),
            }

            debug!(delay_ms = self.retry_delay.as_millis(), "reopening event stream after delay");
            tokio::select! {
                () = tokio::time::sleep(self.retry_delay) => {}
                () = cancel.cancelled() => return,
            }
        }
    }
}
