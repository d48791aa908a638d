//! Owner of the single control-endpoint connection.
//!
//! [`ConnectionSupervisor`] serializes connects behind an async gate, keeps
//! the identified session, answers status and scene-change calls, and turns
//! session notices into [`ControlEvent`]s on a broadcast channel. Notices are
//! funnelled through one mpsc channel into one pump task so they are handled
//! in order. Losing the current session starts the [`ReconnectScheduler`];
//! identifying stops it.

use std::sync::{Arc, Weak};
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::RwLock;
use scenedeck_core::{ControlError, CredentialSource, ObsStatus};
use tokio::sync::{Mutex, broadcast, mpsc};
use tracing::{debug, info, warn};

use crate::scheduler::{ReconnectScheduler, ReconnectTarget};
use crate::transport::{Connector, ControlSession, NoticeKind, SessionEvents, SessionNotice};

/// Capacity of the [`ControlEvent`] broadcast channel.
const EVENT_CHANNEL_CAPACITY: usize = 256;

/// Connection state.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ConnectionState {
    /// No session.
    Disconnected,
    /// A connect attempt is running.
    Connecting,
    /// An identified session exists.
    Identified,
}

/// Connection lifecycle and scene events, in the order they happened.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ControlEvent {
    /// A session was identified.
    Identified,
    /// The current session closed.
    ConnectionClosed,
    /// The current session failed.
    ConnectionError(String),
    /// The program scene changed.
    SceneChanged(String),
}

struct Inner {
    state: ConnectionState,
    session: Option<Arc<dyn ControlSession>>,
    /// Bumped on every connect and disconnect; sessions report with the
    /// generation they were opened under.
    generation: u64,
}

/// Supervises the one connection to the control endpoint.
pub struct ConnectionSupervisor {
    url: String,
    connector: Arc<dyn Connector>,
    credentials: Arc<dyn CredentialSource>,
    connect_gate: Mutex<()>,
    inner: RwLock<Inner>,
    notices: mpsc::UnboundedSender<SessionNotice>,
    events: broadcast::Sender<ControlEvent>,
    scheduler: ReconnectScheduler,
}

impl std::fmt::Debug for ConnectionSupervisor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ConnectionSupervisor")
            .field("url", &self.url)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl ConnectionSupervisor {
    /// Create a disconnected supervisor and spawn its notice pump.
    ///
    /// Must be called inside a tokio runtime.
    pub fn new(
        url: impl Into<String>,
        connector: Arc<dyn Connector>,
        credentials: Arc<dyn CredentialSource>,
        reconnect_interval: Duration,
    ) -> Arc<Self> {
        let (notices, notice_rx) = mpsc::unbounded_channel();
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        let supervisor = Arc::new(Self {
            url: url.into(),
            connector,
            credentials,
            connect_gate: Mutex::new(()),
            inner: RwLock::new(Inner {
                state: ConnectionState::Disconnected,
                session: None,
                generation: 0,
            }),
            notices,
            events,
            scheduler: ReconnectScheduler::new(reconnect_interval),
        });
        drop(tokio::spawn(pump(Arc::downgrade(&supervisor), notice_rx)));
        supervisor
    }

    /// Endpoint URL.
    pub fn url(&self) -> &str {
        &self.url
    }

    /// Current state.
    pub fn state(&self) -> ConnectionState {
        self.inner.read().state
    }

    /// Whether an identified session exists.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Identified
    }

    /// Whether the reconnect loop is active.
    pub fn is_reconnecting(&self) -> bool {
        self.scheduler.is_running()
    }

    /// Subscribe to [`ControlEvent`]s.
    pub fn subscribe(&self) -> broadcast::Receiver<ControlEvent> {
        self.events.subscribe()
    }

    /// Tear down any session, then open and identify a new one.
    ///
    /// The password is re-read from the credential source on every call.
    /// Concurrent calls run one at a time.
    pub async fn connect(&self) -> Result<(), ControlError> {
        let _gate = self.connect_gate.lock().await;

        let (previous, generation) = {
            let mut inner = self.inner.write();
            inner.generation += 1;
            inner.state = ConnectionState::Connecting;
            (inner.session.take(), inner.generation)
        };
        if let Some(previous) = previous {
            debug!("closing previous session before connecting");
            previous.disconnect().await;
        }

        let password = self.credentials.password().await;
        let events = SessionEvents::new(generation, self.notices.clone());
        info!(url = %self.url, authenticated = password.is_some(), "connecting to OBS");

        match self
            .connector
            .connect(&self.url, password.as_deref(), events)
            .await
        {
            Ok(session) => {
                let installed = {
                    let mut inner = self.inner.write();
                    // the pump marks us Disconnected if the session died mid-connect
                    if inner.state == ConnectionState::Connecting {
                        inner.session = Some(Arc::clone(&session));
                        inner.state = ConnectionState::Identified;
                        true
                    } else {
                        false
                    }
                };
                if !installed {
                    session.disconnect().await;
                    return Err(ControlError::connect_failed(
                        &self.url,
                        "connection closed during identification",
                    ));
                }
                self.scheduler.stop();
                info!(url = %self.url, "identified with OBS");
                self.emit(ControlEvent::Identified);
                Ok(())
            }
            Err(e) => {
                self.inner.write().state = ConnectionState::Disconnected;
                if e.is_authentication_failure() {
                    warn!(error = %e, "OBS rejected the connection, check the password in settings");
                } else {
                    warn!(error = %e, kind = e.error_kind(), "failed to connect to OBS");
                }
                Err(e)
            }
        }
    }

    /// Close the session, if any. Never fails and does not start the
    /// reconnect loop.
    pub async fn disconnect(&self) {
        let _gate = self.connect_gate.lock().await;
        let previous = {
            let mut inner = self.inner.write();
            inner.generation += 1;
            inner.state = ConnectionState::Disconnected;
            inner.session.take()
        };
        if let Some(previous) = previous {
            previous.disconnect().await;
            info!("disconnected from OBS");
        }
    }

    /// Disconnect, wait `delay`, connect. A failed connect starts the
    /// reconnect loop before the error is returned.
    pub async fn reconnect(self: &Arc<Self>, delay: Duration) -> Result<(), ControlError> {
        self.disconnect().await;
        tokio::time::sleep(delay).await;
        match self.connect().await {
            Ok(()) => Ok(()),
            Err(e) => {
                let _ = self.start_reconnecting();
                Err(e)
            }
        }
    }

    /// Start the reconnect loop unless it is running or already identified.
    pub fn start_reconnecting(self: &Arc<Self>) -> bool {
        if self.is_connected() {
            return false;
        }
        let weak: Weak<Self> = Arc::downgrade(self);
        self.scheduler.start(weak)
    }

    /// Connection status. A failed scene query still reports `connected`.
    pub async fn status(&self) -> ObsStatus {
        let Some(session) = self.identified_session() else {
            return ObsStatus::disconnected();
        };
        match session.current_program_scene().await {
            Ok(scene) => ObsStatus {
                connected: true,
                current_scene: Some(scene),
            },
            Err(e) => {
                debug!(error = %e, "scene query failed");
                ObsStatus {
                    connected: true,
                    current_scene: None,
                }
            }
        }
    }

    /// Switch the program scene. Nothing is sent when not identified.
    pub async fn change_scene(&self, scene_name: &str) -> Result<(), ControlError> {
        let session = self.identified_session().ok_or(ControlError::NotConnected)?;
        session.set_current_program_scene(scene_name).await?;
        info!(scene = scene_name, "changed program scene");
        Ok(())
    }

    fn identified_session(&self) -> Option<Arc<dyn ControlSession>> {
        let inner = self.inner.read();
        match inner.state {
            ConnectionState::Identified => inner.session.clone(),
            _ => None,
        }
    }

    fn emit(&self, event: ControlEvent) {
        // no receivers is fine
        let _ = self.events.send(event);
    }

    fn handle_notice(self: &Arc<Self>, notice: SessionNotice) {
        let current = self.inner.read().generation == notice.generation;
        if !current {
            debug!(generation = notice.generation, kind = ?notice.kind, "ignoring notice from a replaced session");
            return;
        }
        match notice.kind {
            NoticeKind::SceneChanged(scene) => {
                info!(scene = %scene, "program scene changed");
                self.emit(ControlEvent::SceneChanged(scene));
            }
            NoticeKind::Error(message) => {
                warn!(error = %message, "OBS connection error");
                self.lose_session(notice.generation, ControlEvent::ConnectionError(message));
            }
            NoticeKind::Closed => {
                warn!("OBS connection closed");
                self.lose_session(notice.generation, ControlEvent::ConnectionClosed);
            }
        }
    }

    fn lose_session(self: &Arc<Self>, generation: u64, event: ControlEvent) {
        {
            let mut inner = self.inner.write();
            if inner.generation != generation {
                return;
            }
            // retire the generation: an error is usually followed by a close
            inner.generation += 1;
            inner.session = None;
            inner.state = ConnectionState::Disconnected;
        }
        self.emit(event);
        let _ = self.start_reconnecting();
    }
}

#[async_trait]
impl ReconnectTarget for ConnectionSupervisor {
    fn is_identified(&self) -> bool {
        self.is_connected()
    }

    async fn attempt(&self) -> Result<(), ControlError> {
        self.connect().await
    }
}

async fn pump(supervisor: Weak<ConnectionSupervisor>, mut rx: mpsc::UnboundedReceiver<SessionNotice>) {
    while let Some(notice) = rx.recv().await {
        let Some(supervisor) = supervisor.upgrade() else {
            break;
        };
        supervisor.handle_notice(notice);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::ScriptedConnector;
    use assert_matches::assert_matches;
    use scenedeck_core::StaticCredentials;
    use tokio::time::Instant;

    const PERIOD: Duration = Duration::from_secs(5);

    fn supervisor(connector: &Arc<ScriptedConnector>) -> Arc<ConnectionSupervisor> {
        ConnectionSupervisor::new(
            "ws://localhost:4455",
            connector.clone(),
            Arc::new(StaticCredentials::default()),
            PERIOD,
        )
    }

    async fn next_event(rx: &mut broadcast::Receiver<ControlEvent>) -> ControlEvent {
        tokio::time::timeout(Duration::from_secs(120), rx.recv())
            .await
            .unwrap()
            .unwrap()
    }

    #[tokio::test]
    async fn connect_identifies() {
        let connector = ScriptedConnector::new();
        let sup = supervisor(&connector);
        let mut events = sup.subscribe();

        sup.connect().await.unwrap();
        assert_eq!(sup.state(), ConnectionState::Identified);
        assert_eq!(next_event(&mut events).await, ControlEvent::Identified);
    }

    #[tokio::test]
    async fn repeated_connect_leaves_one_session() {
        let connector = ScriptedConnector::new();
        let sup = supervisor(&connector);

        sup.connect().await.unwrap();
        sup.connect().await.unwrap();
        let (a, b, c) = tokio::join!(sup.connect(), sup.connect(), sup.connect());
        assert!(a.is_ok() && b.is_ok() && c.is_ok());

        assert_eq!(connector.attempts(), 5);
        assert_eq!(connector.open_sessions(), 1);
        assert!(sup.is_connected());
    }

    #[tokio::test]
    async fn connect_failure_leaves_disconnected() {
        let connector = ScriptedConnector::new();
        connector.push_failure(ControlError::connect_failed("ws://localhost:4455", "refused"));
        let sup = supervisor(&connector);

        assert_matches!(sup.connect().await, Err(ControlError::ConnectFailed { .. }));
        assert_eq!(sup.state(), ConnectionState::Disconnected);
        // a plain connect failure does not start the loop
        assert!(!sup.is_reconnecting());
    }

    #[tokio::test]
    async fn connect_passes_current_password() {
        let connector = ScriptedConnector::new();
        let sup = ConnectionSupervisor::new(
            "ws://localhost:4455",
            connector.clone(),
            Arc::new(StaticCredentials(Some("hunter2".into()))),
            PERIOD,
        );
        sup.connect().await.unwrap();
        assert_eq!(connector.passwords(), vec![Some("hunter2".to_string())]);
    }

    #[tokio::test(start_paused = true)]
    async fn close_triggers_periodic_retries_until_success() {
        let connector = ScriptedConnector::new();
        let sup = supervisor(&connector);
        let mut events = sup.subscribe();
        sup.connect().await.unwrap();
        assert_eq!(next_event(&mut events).await, ControlEvent::Identified);

        for _ in 0..3 {
            connector.push_failure(ControlError::connect_failed("ws://localhost:4455", "refused"));
        }
        let closed_at = Instant::now();
        connector.last_session().unwrap().simulate_close();
        assert_eq!(next_event(&mut events).await, ControlEvent::ConnectionClosed);
        assert!(sup.is_reconnecting());

        // three failures at +5, +10, +15, success at +20
        assert_eq!(next_event(&mut events).await, ControlEvent::Identified);
        let times = connector.attempt_times();
        assert_eq!(times.len(), 5);
        for (i, t) in times[1..].iter().enumerate() {
            let expected = PERIOD * u32::try_from(i + 1).unwrap();
            assert_eq!(*t - closed_at, expected);
        }

        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(connector.attempts(), 5);
        assert!(!sup.is_reconnecting());
        assert!(sup.is_connected());
    }

    #[tokio::test]
    async fn stale_session_close_is_ignored() {
        let connector = ScriptedConnector::new();
        let sup = supervisor(&connector);
        sup.connect().await.unwrap();
        let first = connector.last_session().unwrap();
        sup.connect().await.unwrap();
        let mut events = sup.subscribe();

        first.simulate_close();
        first.simulate_scene_change("Stale");
        connector.last_session().unwrap().simulate_scene_change("Fresh");

        // only the fresh session's notice comes through
        assert_eq!(
            next_event(&mut events).await,
            ControlEvent::SceneChanged("Fresh".into())
        );
        assert!(sup.is_connected());
        assert!(!sup.is_reconnecting());
    }

    #[tokio::test]
    async fn transport_error_reported_then_reconnecting() {
        let connector = ScriptedConnector::new();
        let sup = supervisor(&connector);
        sup.connect().await.unwrap();
        let mut events = sup.subscribe();

        connector.last_session().unwrap().simulate_error("connection reset");
        assert_eq!(
            next_event(&mut events).await,
            ControlEvent::ConnectionError("connection reset".into())
        );
        assert_eq!(sup.state(), ConnectionState::Disconnected);
        assert!(sup.is_reconnecting());
    }

    #[tokio::test]
    async fn error_then_close_reports_once() {
        let connector = ScriptedConnector::new();
        let sup = supervisor(&connector);
        sup.connect().await.unwrap();
        let mut events = sup.subscribe();

        let session = connector.last_session().unwrap();
        session.simulate_error("broken pipe");
        session.simulate_close();
        session.simulate_scene_change("Late");

        assert_eq!(
            next_event(&mut events).await,
            ControlEvent::ConnectionError("broken pipe".into())
        );
        tokio::time::sleep(Duration::from_millis(50)).await;
        assert_matches!(events.try_recv(), Err(broadcast::error::TryRecvError::Empty));
    }

    #[tokio::test]
    async fn status_reports_scene() {
        let connector = ScriptedConnector::new();
        let sup = supervisor(&connector);
        assert_eq!(sup.status().await, ObsStatus::disconnected());

        sup.connect().await.unwrap();
        let status = sup.status().await;
        assert!(status.connected);
        assert_eq!(status.current_scene.as_deref(), Some("Scene"));
    }

    #[tokio::test]
    async fn failing_scene_query_still_connected() {
        let connector = ScriptedConnector::new();
        let sup = supervisor(&connector);
        sup.connect().await.unwrap();
        connector.last_session().unwrap().fail_scene_queries(true);

        let status = sup.status().await;
        assert!(status.connected);
        assert!(status.current_scene.is_none());
    }

    #[tokio::test]
    async fn change_scene_while_disconnected_sends_nothing() {
        let connector = ScriptedConnector::new();
        let sup = supervisor(&connector);

        assert_matches!(sup.change_scene("X").await, Err(ControlError::NotConnected));
        assert!(connector.commands_sent().is_empty());
        assert_eq!(connector.attempts(), 0);
    }

    #[tokio::test]
    async fn change_scene_forwards_rejection() {
        let connector = ScriptedConnector::new();
        let sup = supervisor(&connector);
        sup.connect().await.unwrap();

        sup.change_scene("Desktop").await.unwrap();
        assert_matches!(
            sup.change_scene("Missing").await,
            Err(ControlError::CommandFailed { .. })
        );
        assert_eq!(connector.commands_sent(), vec!["Desktop", "Missing"]);
    }

    #[tokio::test]
    async fn disconnect_is_quiet() {
        let connector = ScriptedConnector::new();
        let sup = supervisor(&connector);
        sup.disconnect().await;

        sup.connect().await.unwrap();
        sup.disconnect().await;
        assert_eq!(sup.state(), ConnectionState::Disconnected);
        assert_eq!(connector.open_sessions(), 0);
        assert!(!sup.is_reconnecting());
    }

    #[tokio::test(start_paused = true)]
    async fn failed_reconnect_starts_loop() {
        let connector = ScriptedConnector::new();
        let sup = supervisor(&connector);
        sup.connect().await.unwrap();
        connector.push_failure(ControlError::connect_failed("ws://localhost:4455", "refused"));

        assert!(sup.reconnect(Duration::from_millis(500)).await.is_err());
        assert!(sup.is_reconnecting());

        let mut events = sup.subscribe();
        assert_eq!(next_event(&mut events).await, ControlEvent::Identified);
        assert_eq!(connector.attempts(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn reconnect_waits_settle_delay() {
        let connector = ScriptedConnector::new();
        let sup = supervisor(&connector);
        sup.connect().await.unwrap();

        let before = Instant::now();
        sup.reconnect(Duration::from_millis(500)).await.unwrap();
        let times = connector.attempt_times();
        assert_eq!(times[1] - before, Duration::from_millis(500));
        assert_eq!(connector.open_sessions(), 1);
    }
}
