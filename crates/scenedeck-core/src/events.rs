//! Wire payloads exchanged between the server and dashboards.
//!
//! [`StreamMessage`] is what travels over `GET /api/events`; each message is
//! framed as a single `data: <json>\n\n` block. The remaining types are the
//! JSON bodies of the connection-related HTTP endpoints.

use serde::{Deserialize, Serialize};

use crate::ids::ClientId;

/// A message pushed to event-stream subscribers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum StreamMessage {
    /// Handshake sent once when a subscriber opens the stream.
    #[serde(rename_all = "camelCase")]
    Connected {
        /// Id assigned to the subscriber.
        client_id: ClientId,
    },
    /// The program scene changed on the control endpoint.
    #[serde(rename_all = "camelCase")]
    SceneChanged {
        /// Name of the new program scene.
        scene_name: String,
    },
}

impl StreamMessage {
    /// Scene-change notification.
    pub fn scene_changed(scene_name: impl Into<String>) -> Self {
        Self::SceneChanged {
            scene_name: scene_name.into(),
        }
    }

    /// Wire name of the message type, for logging.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Connected { .. } => "connected",
            Self::SceneChanged { .. } => "sceneChanged",
        }
    }

    /// Serialize into a complete SSE frame: `data: <json>\n\n`.
    pub fn to_sse_frame(&self) -> serde_json::Result<String> {
        Ok(format!("data: {}\n\n", serde_json::to_string(self)?))
    }
}

/// Body of `GET /api/obs-status`.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ObsStatus {
    /// Whether an identified session exists.
    pub connected: bool,
    /// Current program scene; absent when disconnected or the query failed.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub current_scene: Option<String>,
}

impl ObsStatus {
    /// Status of a disconnected supervisor.
    pub fn disconnected() -> Self {
        Self::default()
    }
}

/// Body of `POST /api/change-scene`.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangeSceneRequest {
    /// Scene to switch the program output to.
    #[serde(default)]
    pub scene_name: Option<String>,
}

/// `{message}` success body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct MessageResponse {
    /// Human-readable outcome.
    pub message: String,
}

impl MessageResponse {
    /// Wrap a message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

/// `{error}` failure body.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct ErrorResponse {
    /// Human-readable error.
    pub error: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scene_changed_frame_matches_wire_format() {
        let frame = StreamMessage::scene_changed("Intro").to_sse_frame().unwrap();
        assert_eq!(frame, "data: {\"type\":\"sceneChanged\",\"sceneName\":\"Intro\"}\n\n");
    }

    #[test]
    fn connected_frame_carries_client_id() {
        let msg = StreamMessage::Connected {
            client_id: ClientId("client_1".into()),
        };
        let frame = msg.to_sse_frame().unwrap();
        assert_eq!(frame, "data: {\"type\":\"connected\",\"clientId\":\"client_1\"}\n\n");
        assert_eq!(msg.type_name(), "connected");
    }

    #[test]
    fn stream_message_parses_from_wire() {
        let msg: StreamMessage =
            serde_json::from_str(r#"{"type":"sceneChanged","sceneName":"Desktop"}"#).unwrap();
        assert_eq!(msg, StreamMessage::scene_changed("Desktop"));
    }

    #[test]
    fn status_omits_missing_scene() {
        let json = serde_json::to_value(ObsStatus {
            connected: true,
            current_scene: None,
        })
        .unwrap();
        assert_eq!(json, serde_json::json!({"connected": true}));
    }

    #[test]
    fn status_includes_scene() {
        let json = serde_json::to_value(ObsStatus {
            connected: true,
            current_scene: Some("Scene".into()),
        })
        .unwrap();
        assert_eq!(json["currentScene"], "Scene");
    }

    #[test]
    fn change_scene_request_tolerates_missing_field() {
        let req: ChangeSceneRequest = serde_json::from_str("{}").unwrap();
        assert!(req.scene_name.is_none());
    }
}
