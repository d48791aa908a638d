//! HTTP client for the SceneDeck API.

use std::time::Duration;

use futures::Stream;
use scenedeck_core::ObsStatus;
use scenedeck_core::events::{ChangeSceneRequest, MessageResponse};
use scenedeck_core::model::Button;

use crate::errors::Result;

/// Thin typed wrapper over the server's JSON API.
#[derive(Clone, Debug)]
pub struct DeckClient {
    http: reqwest::Client,
    base_url: String,
}

impl DeckClient {
    /// Client for the server at `base_url` (e.g. `http://localhost:3000`).
    ///
    /// Requests time out after `timeout`; the event stream is exempt.
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = reqwest::Client::builder().connect_timeout(timeout).build()?;
        let base_url = base_url.into().trim_end_matches('/').to_string();
        Ok(Self { http, base_url })
    }

    /// Server base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    /// `GET /api/obs-status`
    pub async fn status(&self) -> Result<ObsStatus> {
        let resp = self
            .http
            .get(self.url("/api/obs-status"))
            .send()
            .await?
            .error_for_status()?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// `GET /api/buttons`
    pub async fn buttons(&self) -> Result<Vec<Button>> {
        let resp = self
            .http
            .get(self.url("/api/buttons"))
            .send()
            .await?
            .error_for_status()?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// `POST /api/change-scene`
    pub async fn change_scene(&self, scene_name: &str) -> Result<MessageResponse> {
        let body = ChangeSceneRequest {
            scene_name: Some(scene_name.to_string()),
        };
        let resp = self
            .http
            .post(self.url("/api/change-scene"))
            .json(&body)
            .send()
            .await?
            .error_for_status()?;
        let bytes = resp.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Open `GET /api/events` and return the raw body stream.
    pub async fn events(
        &self,
    ) -> Result<impl Stream<Item = reqwest::Result<bytes::Bytes>> + Send + Unpin + 'static> {
        let resp = self
            .http
            .get(self.url("/api/events"))
            .header(reqwest::header::ACCEPT, "text/event-stream")
            .send()
            .await?
            .error_for_status()?;
        Ok(resp.bytes_stream())
    }
}
