//! obs-websocket client over `tokio-tungstenite`.
//!
//! [`WsConnector`] runs the Hello/Identify handshake under a timeout, then
//! hands the socket to a handler task. The handler correlates request ids
//! with pending callers, forwards `CurrentProgramSceneChanged` events and
//! reports close/error through [`SessionEvents`].

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use scenedeck_core::ControlError;
use serde_json::{Value, json};
use tokio::net::TcpStream;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::{MaybeTlsStream, WebSocketStream, connect_async};
use tracing::{debug, warn};

use crate::protocol::{self, Envelope, Event, Hello, Identify, RequestResponse, op};
use crate::transport::{Connector, ControlSession, SessionEvents};

type WsStream = WebSocketStream<MaybeTlsStream<TcpStream>>;

/// Pending request waiting for its `RequestResponse`.
type PendingTx = oneshot::Sender<Result<Value, String>>;

/// How long `disconnect` waits for the close handshake.
const CLOSE_TIMEOUT: Duration = Duration::from_secs(1);

/// Capacity of the session command queue.
const COMMAND_QUEUE: usize = 64;

/// Opens real obs-websocket sessions.
#[derive(Clone, Debug)]
pub struct WsConnector {
    handshake_timeout: Duration,
    request_timeout: Duration,
}

impl Default for WsConnector {
    fn default() -> Self {
        Self::new(Duration::from_secs(10), Duration::from_secs(10))
    }
}

impl WsConnector {
    /// Connector with the given handshake and per-request timeouts.
    pub fn new(handshake_timeout: Duration, request_timeout: Duration) -> Self {
        Self {
            handshake_timeout,
            request_timeout,
        }
    }
}

#[async_trait]
impl Connector for WsConnector {
    async fn connect(
        &self,
        url: &str,
        password: Option<&str>,
        events: SessionEvents,
    ) -> Result<Arc<dyn ControlSession>, ControlError> {
        let ws = tokio::time::timeout(self.handshake_timeout, handshake(url, password))
            .await
            .map_err(|_| ControlError::connect_failed(url, "handshake timed out"))??;

        let (cmd_tx, cmd_rx) = mpsc::channel(COMMAND_QUEUE);
        let handler = tokio::spawn(session_loop(ws, cmd_rx, events));

        Ok(Arc::new(WsSession {
            cmd_tx,
            request_timeout: self.request_timeout,
            handler: parking_lot::Mutex::new(Some(handler)),
        }))
    }
}

/// Open the socket and run Hello → Identify → Identified.
async fn handshake(url: &str, password: Option<&str>) -> Result<WsStream, ControlError> {
    let fail = |reason: String| ControlError::connect_failed(url, reason);

    let (mut ws, _) = connect_async(url).await.map_err(|e| fail(e.to_string()))?;

    let hello = next_envelope(&mut ws).await.map_err(fail)?;
    if hello.op != op::HELLO {
        return Err(fail(format!("expected Hello, got op {}", hello.op)));
    }
    let hello: Hello = serde_json::from_value(hello.d).map_err(|e| fail(format!("bad Hello: {e}")))?;
    debug!(version = ?hello.obs_web_socket_version, rpc = hello.rpc_version, "received Hello");

    let authentication = match (hello.authentication, password) {
        (Some(auth), Some(password)) => Some(protocol::auth_response(
            password,
            &auth.salt,
            &auth.challenge,
        )),
        (Some(_), None) => {
            return Err(fail(
                "authentication required but no password is configured".into(),
            ));
        }
        (None, _) => None,
    };

    let identify = Identify {
        rpc_version: protocol::RPC_VERSION,
        authentication,
        event_subscriptions: protocol::EVENT_SUBSCRIPTION_ALL,
    };
    let text = protocol::frame(op::IDENTIFY, &identify).map_err(|e| fail(e.to_string()))?;
    ws.send(Message::Text(text.into()))
        .await
        .map_err(|e| fail(e.to_string()))?;

    let identified = next_envelope(&mut ws).await.map_err(fail)?;
    if identified.op != op::IDENTIFIED {
        return Err(fail(format!("expected Identified, got op {}", identified.op)));
    }
    Ok(ws)
}

/// Next JSON frame during the handshake; close frames become errors.
async fn next_envelope(ws: &mut WsStream) -> Result<Envelope, String> {
    loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                return serde_json::from_str(&text).map_err(|e| format!("bad frame: {e}"));
            }
            Some(Ok(Message::Close(frame))) => {
                return Err(match frame {
                    Some(f) if u16::from(f.code) == protocol::CLOSE_AUTHENTICATION_FAILED => {
                        format!("authentication failed ({})", protocol::CLOSE_AUTHENTICATION_FAILED)
                    }
                    Some(f) => format!("closed during handshake: {} {}", u16::from(f.code), f.reason.as_str()),
                    None => "closed during handshake".into(),
                });
            }
            Some(Ok(_)) => {}
            Some(Err(e)) => return Err(e.to_string()),
            None => return Err("connection closed during handshake".into()),
        }
    }
}

enum SessionCommand {
    Request {
        request_type: &'static str,
        data: Option<Value>,
        response_tx: PendingTx,
    },
    Close,
}

/// A live obs-websocket session.
struct WsSession {
    cmd_tx: mpsc::Sender<SessionCommand>,
    request_timeout: Duration,
    handler: parking_lot::Mutex<Option<JoinHandle<()>>>,
}

impl WsSession {
    async fn request(
        &self,
        request_type: &'static str,
        data: Option<Value>,
    ) -> Result<Value, ControlError> {
        let (tx, rx) = oneshot::channel();
        self.cmd_tx
            .send(SessionCommand::Request {
                request_type,
                data,
                response_tx: tx,
            })
            .await
            .map_err(|_| ControlError::command_failed(request_type, "session closed"))?;

        let result = tokio::time::timeout(self.request_timeout, rx)
            .await
            .map_err(|_| ControlError::command_failed(request_type, "timed out"))?
            .map_err(|_| ControlError::command_failed(request_type, "connection closed"))?;

        result.map_err(|reason| ControlError::command_failed(request_type, reason))
    }
}

#[async_trait]
impl ControlSession for WsSession {
    async fn current_program_scene(&self) -> Result<String, ControlError> {
        let data = self.request(protocol::GET_PROGRAM_SCENE, None).await?;
        protocol::program_scene_from_response(&data).ok_or_else(|| {
            ControlError::command_failed(protocol::GET_PROGRAM_SCENE, "response has no scene name")
        })
    }

    async fn set_current_program_scene(&self, scene_name: &str) -> Result<(), ControlError> {
        let _ = self
            .request(protocol::SET_PROGRAM_SCENE, Some(json!({ "sceneName": scene_name })))
            .await?;
        Ok(())
    }

    async fn disconnect(&self) {
        let _ = tokio::time::timeout(CLOSE_TIMEOUT, self.cmd_tx.send(SessionCommand::Close)).await;
        let handler = self.handler.lock().take();
        if let Some(handler) = handler {
            let abort = handler.abort_handle();
            if tokio::time::timeout(CLOSE_TIMEOUT, handler).await.is_err() {
                abort.abort();
            }
        }
    }
}

impl Drop for WsSession {
    fn drop(&mut self) {
        if let Some(handler) = self.handler.get_mut().take() {
            handler.abort();
        }
    }
}

/// Own the socket: send requests, route responses and events.
///
/// A local `Close` ends the loop quietly; anything else that ends it is
/// reported as closed (preceded by an error notice for transport failures).
async fn session_loop(
    ws: WsStream,
    mut cmd_rx: mpsc::Receiver<SessionCommand>,
    events: SessionEvents,
) {
    let (mut ws_tx, mut ws_rx) = ws.split();
    let mut pending: HashMap<String, PendingTx> = HashMap::new();
    let mut next_id: u64 = 1;

    loop {
        tokio::select! {
            cmd = cmd_rx.recv() => {
                let Some(SessionCommand::Request { request_type, data, response_tx }) = cmd else {
                    let _ = ws_tx.send(Message::Close(None)).await;
                    return;
                };
                let request_id = next_id.to_string();
                next_id += 1;
                let text = protocol::request_frame(request_type, &request_id, data.as_ref());
                track_request(&mut pending, request_id, response_tx);
                if let Err(e) = ws_tx.send(Message::Text(text.into())).await {
                    events.error(e.to_string());
                    break;
                }
            }
            msg = ws_rx.next() => {
                match msg {
                    Some(Ok(Message::Text(text))) => route_frame(&text, &mut pending, &events),
                    Some(Ok(Message::Close(frame))) => {
                        debug!(?frame, "server closed the session");
                        break;
                    }
                    Some(Ok(_)) => {}
                    Some(Err(e)) => {
                        events.error(e.to_string());
                        break;
                    }
                    None => break,
                }
            }
        }
    }

    // dropping `pending` fails every waiting request with "connection closed"
    drop(pending);
    events.closed();
}

/// Register a waiting caller, first dropping callers that gave up
/// (timed out) so replies that never come do not pile up.
fn track_request(pending: &mut HashMap<String, PendingTx>, request_id: String, tx: PendingTx) {
    pending.retain(|_, waiting| !waiting.is_closed());
    let _ = pending.insert(request_id, tx);
}

fn route_frame(text: &str, pending: &mut HashMap<String, PendingTx>, events: &SessionEvents) {
    let Ok(envelope) = serde_json::from_str::<Envelope>(text) else {
        warn!("ignoring unparseable frame");
        return;
    };
    match envelope.op {
        op::REQUEST_RESPONSE => {
            let Ok(response) = serde_json::from_value::<RequestResponse>(envelope.d) else {
                warn!("ignoring malformed RequestResponse");
                return;
            };
            let Some(tx) = pending.remove(&response.request_id) else {
                debug!(request_id = %response.request_id, "response for unknown request");
                return;
            };
            let outcome = if response.request_status.result {
                Ok(response.response_data)
            } else {
                Err(response.request_status.reason())
            };
            let _ = tx.send(outcome);
        }
        op::EVENT => {
            if let Ok(event) = serde_json::from_value::<Event>(envelope.d) {
                if let Some(scene) = event.program_scene() {
                    events.scene_changed(scene);
                }
            }
        }
        other => debug!(op = other, "ignoring frame"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::FakeObsServer;
    use crate::transport::NoticeKind;
    use assert_matches::assert_matches;

    const WAIT: Duration = Duration::from_secs(5);

    fn connector() -> WsConnector {
        WsConnector::new(Duration::from_secs(2), Duration::from_secs(2))
    }

    async fn next_kind(rx: &mut mpsc::UnboundedReceiver<crate::SessionNotice>) -> NoticeKind {
        tokio::time::timeout(WAIT, rx.recv()).await.unwrap().unwrap().kind
    }

    #[test]
    fn abandoned_requests_are_dropped_when_tracking_new_ones() {
        let mut pending: HashMap<String, PendingTx> = HashMap::new();
        let (gave_up, rx) = oneshot::channel();
        drop(rx);
        track_request(&mut pending, "1".into(), gave_up);
        let (waiting, _rx) = oneshot::channel();
        track_request(&mut pending, "2".into(), waiting);

        assert_eq!(pending.len(), 1);
        assert!(pending.contains_key("2"));
    }

    #[tokio::test]
    async fn connects_without_password() {
        let obs = FakeObsServer::start(None).await.unwrap();
        let (events, _rx) = SessionEvents::channel(1);
        let session = connector().connect(&obs.url(), None, events).await.unwrap();
        assert_eq!(session.current_program_scene().await.unwrap(), "Scene");
        assert_eq!(obs.identified_sessions(), 1);
    }

    #[tokio::test]
    async fn authenticates_with_password() {
        let obs = FakeObsServer::start(Some("hunter2")).await.unwrap();
        let (events, _rx) = SessionEvents::channel(1);
        let session = connector()
            .connect(&obs.url(), Some("hunter2"), events)
            .await
            .unwrap();
        session.set_current_program_scene("Desktop").await.unwrap();
        assert_eq!(obs.program_scene(), "Desktop");
    }

    #[tokio::test]
    async fn wrong_password_is_authentication_failure() {
        let obs = FakeObsServer::start(Some("hunter2")).await.unwrap();
        let (events, _rx) = SessionEvents::channel(1);
        let err = connector()
            .connect(&obs.url(), Some("nope"), events)
            .await
            .err()
            .unwrap();
        assert!(err.is_authentication_failure(), "{err}");
        assert_eq!(obs.identified_sessions(), 0);
    }

    #[tokio::test]
    async fn missing_password_is_rejected_before_identify() {
        let obs = FakeObsServer::start(Some("hunter2")).await.unwrap();
        let (events, _rx) = SessionEvents::channel(1);
        let err = connector().connect(&obs.url(), None, events).await.err().unwrap();
        assert!(err.is_authentication_failure());
        assert!(err.to_string().contains("no password"));
    }

    #[tokio::test]
    async fn unreachable_endpoint_fails_to_connect() {
        let obs = FakeObsServer::start(None).await.unwrap();
        let url = obs.url();
        obs.stop();
        drop(obs);
        let (events, _rx) = SessionEvents::channel(1);
        assert_matches!(
            connector().connect(&url, None, events).await.err(),
            Some(ControlError::ConnectFailed { .. })
        );
    }

    #[tokio::test]
    async fn unknown_scene_is_command_failure() {
        let obs = FakeObsServer::start(None).await.unwrap();
        let (events, _rx) = SessionEvents::channel(1);
        let session = connector().connect(&obs.url(), None, events).await.unwrap();
        let err = session.set_current_program_scene("Nope").await.unwrap_err();
        assert_matches!(err, ControlError::CommandFailed { ref request, .. } if request == "SetCurrentProgramScene");
        assert_eq!(obs.program_scene(), "Scene");
    }

    #[tokio::test]
    async fn scene_events_are_forwarded() {
        let obs = FakeObsServer::start(None).await.unwrap();
        let (events, mut rx) = SessionEvents::channel(4);
        let _session = connector().connect(&obs.url(), None, events).await.unwrap();

        obs.switch_scene("Intro");
        assert_eq!(next_kind(&mut rx).await, NoticeKind::SceneChanged("Intro".into()));
    }

    #[tokio::test]
    async fn server_close_is_reported() {
        let obs = FakeObsServer::start(None).await.unwrap();
        let (events, mut rx) = SessionEvents::channel(9);
        let session = connector().connect(&obs.url(), None, events).await.unwrap();

        obs.drop_clients();
        assert_eq!(next_kind(&mut rx).await, NoticeKind::Closed);
        assert_matches!(
            session.current_program_scene().await,
            Err(ControlError::CommandFailed { .. })
        );
    }

    #[tokio::test]
    async fn local_disconnect_is_quiet() {
        let obs = FakeObsServer::start(None).await.unwrap();
        let (events, mut rx) = SessionEvents::channel(2);
        let session = connector().connect(&obs.url(), None, events).await.unwrap();

        session.disconnect().await;
        assert!(rx.try_recv().is_err());
    }
}
