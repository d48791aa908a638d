//! obs-websocket v5 wire format.
//!
//! Every frame is a JSON text message `{"op": <u8>, "d": {...}}`.

use base64::Engine as _;
use base64::engine::general_purpose::STANDARD;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use sha2::{Digest, Sha256};

/// RPC version negotiated in `Identify`.
pub const RPC_VERSION: u32 = 1;

/// Subscribe to every non-high-volume event category.
pub const EVENT_SUBSCRIPTION_ALL: u32 = 0x7FF;

/// Close code the server uses when authentication fails.
pub const CLOSE_AUTHENTICATION_FAILED: u16 = 4009;

/// Event sent when the program scene changes.
pub const EVENT_PROGRAM_SCENE_CHANGED: &str = "CurrentProgramSceneChanged";

/// Request reading the program scene.
pub const GET_PROGRAM_SCENE: &str = "GetCurrentProgramScene";

/// Request switching the program scene.
pub const SET_PROGRAM_SCENE: &str = "SetCurrentProgramScene";

/// Message opcodes.
pub mod op {
    /// Server greeting, carries the auth challenge.
    pub const HELLO: u8 = 0;
    /// Client identification.
    pub const IDENTIFY: u8 = 1;
    /// Server accepted the identification.
    pub const IDENTIFIED: u8 = 2;
    /// Server-pushed event.
    pub const EVENT: u8 = 5;
    /// Client request.
    pub const REQUEST: u8 = 6;
    /// Server reply to a request.
    pub const REQUEST_RESPONSE: u8 = 7;
}

/// Outer frame.
#[derive(Clone, Debug, Deserialize)]
pub struct Envelope {
    /// Opcode.
    pub op: u8,
    /// Payload.
    #[serde(default)]
    pub d: Value,
}

/// `Hello` payload.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Hello {
    /// Server's obs-websocket version.
    #[serde(default)]
    pub obs_web_socket_version: Option<String>,
    /// Latest RPC version the server speaks.
    pub rpc_version: u32,
    /// Present when the server requires a password.
    #[serde(default)]
    pub authentication: Option<AuthChallenge>,
}

/// Salt and challenge for the password hash.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct AuthChallenge {
    /// Per-session challenge.
    pub challenge: String,
    /// Per-password salt.
    pub salt: String,
}

/// `Identify` payload.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Identify {
    /// Requested RPC version.
    pub rpc_version: u32,
    /// Hashed password, when required.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub authentication: Option<String>,
    /// Event category bitmask.
    pub event_subscriptions: u32,
}

/// `Event` payload.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Event {
    /// Event name.
    pub event_type: String,
    /// Event fields.
    #[serde(default)]
    pub event_data: Value,
}

impl Event {
    /// Scene name of a `CurrentProgramSceneChanged` event.
    pub fn program_scene(&self) -> Option<&str> {
        if self.event_type != EVENT_PROGRAM_SCENE_CHANGED {
            return None;
        }
        self.event_data.get("sceneName").and_then(Value::as_str)
    }
}

/// `RequestResponse` payload.
#[derive(Clone, Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RequestResponse {
    /// Echo of the request type.
    #[serde(default)]
    pub request_type: String,
    /// Echo of the request id.
    pub request_id: String,
    /// Outcome.
    pub request_status: RequestStatus,
    /// Result fields.
    #[serde(default)]
    pub response_data: Value,
}

/// Outcome of a request.
#[derive(Clone, Debug, Deserialize)]
pub struct RequestStatus {
    /// Whether the request succeeded.
    pub result: bool,
    /// obs-websocket status code.
    pub code: u32,
    /// Human-readable failure reason.
    #[serde(default)]
    pub comment: Option<String>,
}

impl RequestStatus {
    /// Failure reason for a rejected request.
    pub fn reason(&self) -> String {
        self.comment
            .clone()
            .unwrap_or_else(|| format!("request failed with code {}", self.code))
    }
}

/// Password hash: `b64(sha256(b64(sha256(password + salt)) + challenge))`.
pub fn auth_response(password: &str, salt: &str, challenge: &str) -> String {
    let secret = STANDARD.encode(Sha256::digest(format!("{password}{salt}")));
    STANDARD.encode(Sha256::digest(format!("{secret}{challenge}")))
}

/// Serialize a frame.
pub fn frame(op: u8, d: &impl Serialize) -> serde_json::Result<String> {
    serde_json::to_string(&json!({ "op": op, "d": d }))
}

/// Serialize a `Request` frame.
pub fn request_frame(request_type: &str, request_id: &str, data: Option<&Value>) -> String {
    let mut d = json!({ "requestType": request_type, "requestId": request_id });
    if let Some(data) = data {
        d["requestData"] = data.clone();
    }
    json!({ "op": op::REQUEST, "d": d }).to_string()
}

/// Program scene name from a `GetCurrentProgramScene` response.
///
/// Newer servers answer `currentProgramSceneName`, older 5.x builds `sceneName`.
pub fn program_scene_from_response(data: &Value) -> Option<String> {
    data.get("currentProgramSceneName")
        .or_else(|| data.get("sceneName"))
        .and_then(Value::as_str)
        .map(ToString::to_string)
}
