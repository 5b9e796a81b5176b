//! `/health` endpoint.

use std::time::Instant;

use chrono::Utc;
use serde::Serialize;

/// Health check response body.
#[derive(Debug, Clone, Serialize)]
pub struct HealthResponse {
    /// Always `"ok"` when the server is running.
    pub status: String,
    /// Server version.
    pub version: String,
    /// Seconds since the server started.
    pub uptime: u64,
    /// RFC 3339 time the response was built.
    pub timestamp: String,
    /// Open SSE connections.
    pub connections: usize,
}

/// Build a health response from live counters.
pub fn health_check(start_time: Instant, version: &str, connections: usize) -> HealthResponse {
    HealthResponse {
        status: "ok".into(),
        version: version.to_owned(),
        uptime: start_time.elapsed().as_secs(),
        timestamp: Utc::now().to_rfc3339(),
        connections,
    }
}
