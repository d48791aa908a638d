//! Periodic status polling.

use std::time::Duration;

use tokio::time::{self, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::client::DeckClient;
use crate::errors::Result;
use crate::reconcile::SharedState;

/// Default polling period.
pub const DEFAULT_POLL_PERIOD: Duration = Duration::from_secs(5);

/// Fetches `GET /api/obs-status` on a fixed period and applies it to the
/// shared state.
pub struct StatusPoller {
    client: DeckClient,
    state: SharedState,
    period: Duration,
}

impl StatusPoller {
    /// Poller over `client` writing into `state`.
    pub fn new(client: DeckClient, state: SharedState, period: Duration) -> Self {
        Self {
            client,
            state,
            period,
        }
    }

    /// One poll. Returns whether the state changed.
    pub async fn poll_once(&self) -> Result<bool> {
        let status = self.client.status().await?;
        let changed = self.state.apply_status(&status);
        if changed {
            debug!(
                connected = status.connected,
                scene = status.current_scene.as_deref().unwrap_or(""),
                "status applied"
            );
        }
        Ok(changed)
    }

    /// Poll immediately, then every period until cancelled.
    ///
    /// A failed poll is logged and leaves the state untouched.
    pub async fn run(self, cancel: CancellationToken) {
        let mut ticker = time::interval(self.period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    if let Err(e) = self.poll_once().await {
                        warn!(error = %e, "status poll failed");
                    }
                }
                () = cancel.cancelled() => return,
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::tests::serve;
    use crate::reconcile::{ConnectionIndicator, DashboardState};
    use axum::Json;
    use axum::Router;
    use axum::routing::get;
    use serde_json::json;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn poller_for(router: Router, period: Duration) -> (StatusPoller, SharedState) {
        let client = DeckClient::new(serve(router).await, Duration::from_secs(2)).unwrap();
        let state = SharedState::new(DashboardState::default());
        (StatusPoller::new(client, state.clone(), period), state)
    }

    #[tokio::test]
    async fn poll_applies_status() {
        let router = Router::new().route(
            "/api/obs-status",
            get(|| async { Json(json!({"connected": true, "currentScene": "Desktop"})) }),
        );
        let (poller, state) = poller_for(router, DEFAULT_POLL_PERIOD).await;

        assert!(poller.poll_once().await.unwrap());
        let snap = state.snapshot();
        assert_eq!(snap.indicator(), ConnectionIndicator::Connected);
        assert_eq!(snap.current_scene(), Some("Desktop"));

        // same status again changes nothing
        assert!(!poller.poll_once().await.unwrap());
    }

    #[tokio::test]
    async fn failed_poll_leaves_state() {
        let router = Router::new();
        let (poller, state) = poller_for(router, DEFAULT_POLL_PERIOD).await;
        let _ = state.apply_scene("Scene");
        let before = state.snapshot();

        assert!(poller.poll_once().await.is_err());
        assert_eq!(state.snapshot(), before);
    }

    #[tokio::test]
    async fn run_polls_repeatedly_until_cancelled() {
        let hits = Arc::new(AtomicUsize::new(0));
        let counter = Arc::clone(&hits);
        let router = Router::new().route(
            "/api/obs-status",
            get(move || {
                let _ = counter.fetch_add(1, Ordering::SeqCst);
                async { Json(json!({"connected": false})) }
            }),
        );
        let (poller, state) = poller_for(router, Duration::from_millis(50)).await;

        let cancel = CancellationToken::new();
        let handle = tokio::spawn(poller.run(cancel.clone()));
        tokio::time::sleep(Duration::from_millis(220)).await;
        cancel.cancel();
        handle.await.unwrap();

        let polled = hits.load(Ordering::SeqCst);
        assert!(polled >= 3, "only {polled} polls");
        assert_eq!(state.snapshot().indicator(), ConnectionIndicator::Disconnected);

        tokio::time::sleep(Duration::from_millis(120)).await;
        assert_eq!(hits.load(Ordering::SeqCst), polled);
    }
}
