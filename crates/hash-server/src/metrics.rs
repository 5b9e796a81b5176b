//! Prometheus metrics recorder and `/metrics` endpoint handler.

use metrics_exporter_prometheus::{BuildError, PrometheusBuilder, PrometheusHandle};
use tracing::info;

/// Install the Prometheus metrics recorder (global).
///
/// Returns the handle used to render `/metrics`. Fails if a recorder is
/// already installed.
pub fn install_recorder() -> Result<PrometheusHandle, BuildError> {
    let handle = PrometheusBuilder::new().install_recorder()?;
    info!("prometheus metrics recorder installed");
    Ok(handle)
}

/// Render Prometheus text format from the installed recorder.
pub fn render(handle: &PrometheusHandle) -> String {
    handle.render()
}

// Metric names recorded across the server.

/// SSE connections opened (counter).
pub const SSE_CONNECTIONS_TOTAL: &str = "sse_connections_total";
/// SSE connections torn down (counter).
pub const SSE_DISCONNECTIONS_TOTAL: &str = "sse_disconnections_total";
/// Open SSE connections (gauge).
pub const SSE_CONNECTIONS_ACTIVE: &str = "sse_connections_active";
/// SSE connection lifetime in seconds (histogram).
pub const SSE_CONNECTION_DURATION_SECONDS: &str = "sse_connection_duration_seconds";
/// Heartbeat comments written (counter).
pub const SSE_HEARTBEATS_TOTAL: &str = "sse_heartbeats_total";
/// Upstream calls handed to a session (counter).
pub const MESSAGES_ROUTED_TOTAL: &str = "messages_routed_total";
/// Upstream calls rejected (counter, labels: kind).
pub const ROUTE_ERRORS_TOTAL: &str = "route_errors_total";
/// Tool invocations (counter, labels: tool, outcome).
pub const TOOL_CALLS_TOTAL: &str = "tool_calls_total";
