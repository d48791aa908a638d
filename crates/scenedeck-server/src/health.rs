//! `/health` endpoint body.

use std::time::Instant;

use serde::Serialize;

/// Health check response.
#[derive(Clone, Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct HealthResponse {
    /// Always `"ok"` while the server runs.
    pub status: &'static str,
    /// Seconds since start.
    pub uptime_secs: u64,
    /// Open event-stream subscribers.
    pub subscribers: usize,
    /// Whether OBS is identified.
    pub obs_connected: bool,
}

/// Build a health response from live counters.
pub fn health_check(start_time: Instant, subscribers: usize, obs_connected: bool) -> HealthResponse {
    HealthResponse {
        status: "ok",
        uptime_secs: start_time.elapsed().as_secs(),
        subscribers,
        obs_connected,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fields_and_uptime() {
        let start = Instant::now()
            .checked_sub(std::time::Duration::from_secs(60))
            .unwrap();
        let resp = health_check(start, 3, true);
        let json = serde_json::to_value(&resp).unwrap();
        assert_eq!(json["status"], "ok");
        assert_eq!(json["subscribers"], 3);
        assert_eq!(json["obsConnected"], true);
        assert!(json["uptimeSecs"].as_u64().unwrap() >= 59);
    }
}
