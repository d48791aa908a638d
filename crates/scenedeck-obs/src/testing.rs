//! Test doubles: a scripted [`Connector`] and an in-process fake endpoint.

use std::collections::VecDeque;
use std::net::SocketAddr;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};

use async_trait::async_trait;
use futures::{SinkExt, StreamExt};
use parking_lot::Mutex;
use scenedeck_core::ControlError;
use serde_json::{Value, json};
use tokio::net::{TcpListener, TcpStream};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tokio_tungstenite::accept_async;
use tokio_tungstenite::tungstenite::Message;
use tokio_tungstenite::tungstenite::protocol::CloseFrame;
use tokio_tungstenite::tungstenite::protocol::frame::coding::CloseCode;

use crate::protocol::{self, Envelope, Identify, op};
use crate::transport::{Connector, ControlSession, SessionEvents};

/// Scenes both doubles know about; the program starts on the first.
pub const KNOWN_SCENES: [&str; 3] = ["Scene", "Desktop", "Intro"];

// ── Scripted connector ──────────────────────────────────────────────────────

/// A [`Connector`] whose outcomes are queued by the test.
///
/// With an empty queue every attempt succeeds.
#[derive(Default)]
pub struct ScriptedConnector {
    outcomes: Mutex<VecDeque<ControlError>>,
    attempt_times: Mutex<Vec<Instant>>,
    passwords: Mutex<Vec<Option<String>>>,
    sessions: Mutex<Vec<Arc<ScriptedSession>>>,
}

impl ScriptedConnector {
    /// A connector that succeeds until told otherwise.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail the next not-yet-scripted attempt with `error`.
    pub fn push_failure(&self, error: ControlError) {
        self.outcomes.lock().push_back(error);
    }

    /// Number of connect attempts so far.
    pub fn attempts(&self) -> usize {
        self.attempt_times.lock().len()
    }

    /// When each attempt happened.
    pub fn attempt_times(&self) -> Vec<Instant> {
        self.attempt_times.lock().clone()
    }

    /// Password passed to each attempt.
    pub fn passwords(&self) -> Vec<Option<String>> {
        self.passwords.lock().clone()
    }

    /// Most recently opened session.
    pub fn last_session(&self) -> Option<Arc<ScriptedSession>> {
        self.sessions.lock().last().cloned()
    }

    /// Sessions not yet disconnected.
    pub fn open_sessions(&self) -> usize {
        self.sessions
            .lock()
            .iter()
            .filter(|s| !s.disconnected.load(Ordering::SeqCst))
            .count()
    }

    /// Every scene-change command sent on any session, in order.
    pub fn commands_sent(&self) -> Vec<String> {
        self.sessions
            .lock()
            .iter()
            .flat_map(|s| s.commands.lock().clone())
            .collect()
    }
}

#[async_trait]
impl Connector for ScriptedConnector {
    async fn connect(
        &self,
        url: &str,
        password: Option<&str>,
        events: SessionEvents,
    ) -> Result<Arc<dyn ControlSession>, ControlError> {
        self.attempt_times.lock().push(Instant::now());
        self.passwords.lock().push(password.map(ToString::to_string));
        if let Some(error) = self.outcomes.lock().pop_front() {
            return Err(error);
        }
        tracing::debug!(url, generation = events.generation(), "scripted session opened");
        let session = Arc::new(ScriptedSession::new(events));
        self.sessions.lock().push(Arc::clone(&session));
        Ok(session)
    }
}

/// A session driven by the test.
pub struct ScriptedSession {
    events: SessionEvents,
    scene: Mutex<String>,
    fail_scene_queries: AtomicBool,
    disconnected: AtomicBool,
    commands: Mutex<Vec<String>>,
}

impl ScriptedSession {
    fn new(events: SessionEvents) -> Self {
        Self {
            events,
            scene: Mutex::new(KNOWN_SCENES[0].to_string()),
            fail_scene_queries: AtomicBool::new(false),
            disconnected: AtomicBool::new(false),
            commands: Mutex::new(Vec::new()),
        }
    }

    /// Make `current_program_scene` fail (or succeed again).
    pub fn fail_scene_queries(&self, fail: bool) {
        self.fail_scene_queries.store(fail, Ordering::SeqCst);
    }

    /// Report a remote close.
    pub fn simulate_close(&self) {
        self.events.closed();
    }

    /// Report a transport error.
    pub fn simulate_error(&self, message: &str) {
        self.events.error(message);
    }

    /// Switch scene as if done in OBS and report it.
    pub fn simulate_scene_change(&self, scene_name: &str) {
        *self.scene.lock() = scene_name.to_string();
        self.events.scene_changed(scene_name);
    }

    /// Whether `disconnect` was called.
    pub fn is_disconnected(&self) -> bool {
        self.disconnected.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ControlSession for ScriptedSession {
    async fn current_program_scene(&self) -> Result<String, ControlError> {
        if self.fail_scene_queries.load(Ordering::SeqCst) {
            return Err(ControlError::command_failed(
                protocol::GET_PROGRAM_SCENE,
                "timed out",
            ));
        }
        Ok(self.scene.lock().clone())
    }

    async fn set_current_program_scene(&self, scene_name: &str) -> Result<(), ControlError> {
        self.commands.lock().push(scene_name.to_string());
        if !KNOWN_SCENES.contains(&scene_name) {
            return Err(ControlError::command_failed(
                protocol::SET_PROGRAM_SCENE,
                format!("No source was found by the name of `{scene_name}`."),
            ));
        }
        *self.scene.lock() = scene_name.to_string();
        Ok(())
    }

    async fn disconnect(&self) {
        self.disconnected.store(true, Ordering::SeqCst);
    }
}

// ── Fake obs-websocket endpoint ─────────────────────────────────────────────

const FAKE_SALT: &str = "c2NlbmVkZWNrLXNhbHQ=";
const FAKE_CHALLENGE: &str = "c2NlbmVkZWNrLWNoYWxsZW5nZQ==";

struct FakeState {
    password: Option<String>,
    scene: Mutex<String>,
    clients: Mutex<Vec<mpsc::UnboundedSender<Message>>>,
    identified: AtomicUsize,
}

impl FakeState {
    fn broadcast(&self, message: &Message) {
        self.clients
            .lock()
            .retain(|tx| tx.send(message.clone()).is_ok());
    }

    fn scene_event(scene_name: &str) -> Message {
        let text = json!({
            "op": op::EVENT,
            "d": {
                "eventType": protocol::EVENT_PROGRAM_SCENE_CHANGED,
                "eventIntent": 4,
                "eventData": { "sceneName": scene_name }
            }
        })
        .to_string();
        Message::Text(text.into())
    }

    /// Answer a `Request` frame; scene switches are also broadcast as events.
    fn answer(&self, text: &str) -> Option<Message> {
        let envelope: Envelope = serde_json::from_str(text).ok()?;
        if envelope.op != op::REQUEST {
            return None;
        }
        let request_type = envelope.d.get("requestType")?.as_str()?.to_string();
        let request_id = envelope.d.get("requestId")?.as_str()?.to_string();

        let (status, data) = match request_type.as_str() {
            protocol::GET_PROGRAM_SCENE => {
                let scene = self.scene.lock().clone();
                (
                    json!({"result": true, "code": 100}),
                    json!({"currentProgramSceneName": scene, "sceneName": scene}),
                )
            }
            protocol::SET_PROGRAM_SCENE => {
                let target = envelope.d["requestData"]["sceneName"]
                    .as_str()
                    .unwrap_or_default()
                    .to_string();
                if KNOWN_SCENES.contains(&target.as_str()) {
                    *self.scene.lock() = target.clone();
                    self.broadcast(&Self::scene_event(&target));
                    (json!({"result": true, "code": 100}), Value::Null)
                } else {
                    (
                        json!({
                            "result": false,
                            "code": 600,
                            "comment": format!("No source was found by the name of `{target}`.")
                        }),
                        Value::Null,
                    )
                }
            }
            _ => (
                json!({"result": false, "code": 204, "comment": "Unknown request type."}),
                Value::Null,
            ),
        };

        let mut d = json!({
            "requestType": request_type,
            "requestId": request_id,
            "requestStatus": status,
        });
        if !data.is_null() {
            d["responseData"] = data;
        }
        Some(Message::Text(
            json!({"op": op::REQUEST_RESPONSE, "d": d}).to_string().into(),
        ))
    }
}

/// A minimal obs-websocket v5 server on a loopback port.
///
/// Speaks Hello/Identify (with optional password), answers
/// `GetCurrentProgramScene` / `SetCurrentProgramScene` over [`KNOWN_SCENES`]
/// and pushes `CurrentProgramSceneChanged` to every identified client.
pub struct FakeObsServer {
    addr: SocketAddr,
    state: Arc<FakeState>,
    accept: Mutex<Option<JoinHandle<()>>>,
}

impl FakeObsServer {
    /// Bind `127.0.0.1:0` and start accepting.
    pub async fn start(password: Option<&str>) -> std::io::Result<Self> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let state = Arc::new(FakeState {
            password: password.map(ToString::to_string),
            scene: Mutex::new(KNOWN_SCENES[0].to_string()),
            clients: Mutex::new(Vec::new()),
            identified: AtomicUsize::new(0),
        });

        let accept_state = Arc::clone(&state);
        let accept = tokio::spawn(async move {
            while let Ok((stream, _)) = listener.accept().await {
                drop(tokio::spawn(serve_client(stream, Arc::clone(&accept_state))));
            }
        });

        Ok(Self {
            addr,
            state,
            accept: Mutex::new(Some(accept)),
        })
    }

    /// `ws://` URL of the endpoint.
    pub fn url(&self) -> String {
        format!("ws://{}", self.addr)
    }

    /// Current program scene.
    pub fn program_scene(&self) -> String {
        self.state.scene.lock().clone()
    }

    /// Switch scene as if done in the OBS UI and notify clients.
    pub fn switch_scene(&self, scene_name: &str) {
        *self.state.scene.lock() = scene_name.to_string();
        self.state.broadcast(&FakeState::scene_event(scene_name));
    }

    /// Number of successful identifications so far.
    pub fn identified_sessions(&self) -> usize {
        self.state.identified.load(Ordering::SeqCst)
    }

    /// Identified clients still attached.
    pub fn connected_clients(&self) -> usize {
        let mut clients = self.state.clients.lock();
        clients.retain(|tx| !tx.is_closed());
        clients.len()
    }

    /// Close every client connection.
    pub fn drop_clients(&self) {
        self.state.broadcast(&Message::Close(None));
        self.state.clients.lock().clear();
    }

    /// Stop accepting and close every client, as if OBS quit.
    pub fn stop(&self) {
        if let Some(accept) = self.accept.lock().take() {
            accept.abort();
        }
        self.drop_clients();
    }
}

impl Drop for FakeObsServer {
    fn drop(&mut self) {
        self.stop();
    }
}

async fn serve_client(stream: TcpStream, state: Arc<FakeState>) {
    let Ok(mut ws) = accept_async(stream).await else {
        return;
    };

    let mut hello = json!({"obsWebSocketVersion": "5.5.0", "rpcVersion": protocol::RPC_VERSION});
    if state.password.is_some() {
        hello["authentication"] = json!({"challenge": FAKE_CHALLENGE, "salt": FAKE_SALT});
    }
    let Ok(text) = protocol::frame(op::HELLO, &hello) else {
        return;
    };
    if ws.send(Message::Text(text.into())).await.is_err() {
        return;
    }

    let identify = loop {
        match ws.next().await {
            Some(Ok(Message::Text(text))) => {
                let Ok(envelope) = serde_json::from_str::<Envelope>(&text) else {
                    return;
                };
                if envelope.op != op::IDENTIFY {
                    continue;
                }
                let Ok(identify) = serde_json::from_value::<Identify>(envelope.d) else {
                    return;
                };
                break identify;
            }
            Some(Ok(_)) => {}
            _ => return,
        }
    };

    if let Some(password) = &state.password {
        let expected = protocol::auth_response(password, FAKE_SALT, FAKE_CHALLENGE);
        if identify.authentication.as_deref() != Some(expected.as_str()) {
            let _ = ws
                .close(Some(CloseFrame {
                    code: CloseCode::from(protocol::CLOSE_AUTHENTICATION_FAILED),
                    reason: "Authentication failed.".into(),
                }))
                .await;
            return;
        }
    }

    let Ok(text) = protocol::frame(op::IDENTIFIED, &json!({"negotiatedRpcVersion": 1})) else {
        return;
    };
    if ws.send(Message::Text(text.into())).await.is_err() {
        return;
    }

    let (tx, mut rx) = mpsc::unbounded_channel();
    state.clients.lock().push(tx);
    let _ = state.identified.fetch_add(1, Ordering::SeqCst);

    let (mut sink, mut source) = ws.split();
    loop {
        tokio::select! {
            outgoing = rx.recv() => {
                let Some(message) = outgoing else { break };
                let closing = matches!(message, Message::Close(_));
                if sink.send(message).await.is_err() || closing {
                    break;
                }
            }
            incoming = source.next() => {
                match incoming {
                    Some(Ok(Message::Text(text))) => {
                        if let Some(reply) = state.answer(&text) {
                            if sink.send(reply).await.is_err() {
                                break;
                            }
                        }
                    }
                    Some(Ok(Message::Close(_)) | Err(_)) | None => break,
                    Some(Ok(_)) => {}
                }
            }
        }
    }
}
