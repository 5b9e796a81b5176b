//! `HashServer`: Axum HTTP + SSE server.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use axum::Router;
use axum::body::Bytes;
use axum::extract::rejection::{BytesRejection, QueryRejection};
use axum::extract::{DefaultBodyLimit, Query, State};
use axum::http::{HeaderValue, Method, StatusCode, header};
use axum::response::sse::{Event, Sse};
use axum::response::{IntoResponse, Json, Response};
use axum::routing::{get, post};
use futures::{Stream, StreamExt};
use hash_tools::registry::ToolRegistry;
use metrics_exporter_prometheus::PrometheusHandle;
use serde::Deserialize;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use tower_http::cors::{AllowOrigin, Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{error, info, warn};

use crate::config::ServerConfig;
use crate::error::RouteError;
use crate::health::{self, HealthResponse};
use crate::mcp::McpHandler;
use crate::shutdown::ShutdownCoordinator;
use crate::transport::handle::Frame;
use crate::transport::lifecycle::{ConnectionLifecycle, LifecycleOptions};
use crate::transport::registry::SessionRegistry;
use crate::transport::router::MessageRouter;
use crate::transport::stream::SessionStream;

/// Name advertised in `serverInfo`.
pub const SERVER_NAME: &str = "hash";
/// Version advertised in `serverInfo` and `/health`.
pub const SERVER_VERSION: &str = env!("CARGO_PKG_VERSION");

/// Shared state accessible from Axum handlers.
#[derive(Clone)]
pub struct AppState {
    /// Live sessions.
    pub sessions: Arc<SessionRegistry>,
    /// Routes upstream calls to sessions.
    pub router: Arc<MessageRouter<McpHandler>>,
    /// Heartbeat and queue settings for new connections.
    pub lifecycle: LifecycleOptions,
    /// Shutdown coordinator.
    pub shutdown: Arc<ShutdownCoordinator>,
    /// When the server started.
    pub start_time: Instant,
    /// Prometheus handle for `/metrics`, if a recorder is installed.
    pub metrics: Option<PrometheusHandle>,
}

/// The hash tool server.
pub struct HashServer {
    config: ServerConfig,
    sessions: Arc<SessionRegistry>,
    router: Arc<MessageRouter<McpHandler>>,
    shutdown: Arc<ShutdownCoordinator>,
    start_time: Instant,
    metrics: Option<PrometheusHandle>,
}

impl HashServer {
    /// Create a server serving `tools`.
    pub fn new(config: ServerConfig, tools: ToolRegistry, metrics: Option<PrometheusHandle>) -> Self {
        let sessions = Arc::new(SessionRegistry::new());
        let handler = McpHandler::new(Arc::new(tools), SERVER_NAME, SERVER_VERSION);
        let router = Arc::new(MessageRouter::new(Arc::clone(&sessions), Arc::new(handler)));
        Self {
            config,
            sessions,
            router,
            shutdown: Arc::new(ShutdownCoordinator::new()),
            start_time: Instant::now(),
            metrics,
        }
    }

    /// Build the Axum router with all routes.
    pub fn router(&self) -> Router {
        let state = AppState {
            sessions: Arc::clone(&self.sessions),
            router: Arc::clone(&self.router),
            lifecycle: LifecycleOptions {
                heartbeat_interval: self.config.heartbeat_interval(),
                send_queue_capacity: self.config.send_queue_capacity,
            },
            shutdown: Arc::clone(&self.shutdown),
            start_time: self.start_time,
            metrics: self.metrics.clone(),
        };

        Router::new()
            .route("/health", get(health_handler))
            .route("/metrics", get(metrics_handler))
            .route("/sse", get(sse_handler))
            .route("/messages", post(messages_handler))
            .layer(DefaultBodyLimit::max(self.config.max_body_bytes))
            .layer(cors_layer(self.config.allowed_origins.as_deref()))
            .layer(TraceLayer::new_for_http())
            .with_state(state)
    }

    /// Bind the configured address and serve in a background task.
    ///
    /// Returns the bound address (useful with port 0) and the serve task,
    /// which ends once [`ShutdownCoordinator::shutdown`] is called and open
    /// streams have closed.
    pub async fn listen(&self) -> std::io::Result<(SocketAddr, JoinHandle<()>)> {
        let listener = TcpListener::bind(self.config.bind_addr()).await?;
        let addr = listener.local_addr()?;
        let app = self.router();
        let token = self.shutdown.token();

        info!(%addr, "hash server listening");
        let handle = tokio::spawn(async move {
            if let Err(e) = axum::serve(listener, app)
                .with_graceful_shutdown(token.cancelled_owned())
                .await
            {
                error!(error = %e, "server error");
            }
        });
        Ok((addr, handle))
    }

    /// Live sessions.
    pub fn sessions(&self) -> &Arc<SessionRegistry> {
        &self.sessions
    }

    /// Get the shutdown coordinator.
    pub fn shutdown(&self) -> &Arc<ShutdownCoordinator> {
        &self.shutdown
    }

    /// Get the server configuration.
    pub fn config(&self) -> &ServerConfig {
        &self.config
    }
}

fn cors_layer(allowed: Option<&[String]>) -> CorsLayer {
    let Some(allowed) = allowed else {
        return CorsLayer::permissive();
    };
    let origins: Vec<HeaderValue> = allowed
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(%origin, "ignoring invalid CORS origin");
                None
            }
        })
        .collect();
    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers(Any)
}

/// GET /health
async fn health_handler(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(health::health_check(
        state.start_time,
        SERVER_VERSION,
        state.sessions.size(),
    ))
}

/// GET /metrics
async fn metrics_handler(State(state): State<AppState>) -> Response {
    match &state.metrics {
        Some(handle) => (
            [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
            crate::metrics::render(handle),
        )
            .into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// GET /sse: open a downstream stream and announce its upstream endpoint.
async fn sse_handler(
    State(state): State<AppState>,
) -> Result<Sse<impl Stream<Item = Result<Event, Infallible>>>, RouteError> {
    let (lifecycle, rx) = ConnectionLifecycle::open(
        Arc::clone(&state.sessions),
        state.lifecycle,
        &state.shutdown.token(),
    )?;

    let endpoint = format!("/messages?sessionId={}", lifecycle.id());
    lifecycle
        .handle()
        .try_push(Frame::Endpoint(endpoint))
        .map_err(RouteError::internal)?;

    let stream = SessionStream::new(rx, lifecycle)
        .take_until(state.shutdown.token().cancelled_owned())
        .map(|frame| Ok(frame.into_event()));
    Ok(Sse::new(stream))
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct MessagesQuery {
    session_id: Option<String>,
}

/// POST /messages?sessionId=…: route one upstream call.
///
/// A body that cannot be read (too large, aborted) is a server fault, but
/// only once the session itself has resolved.
async fn messages_handler(
    State(state): State<AppState>,
    query: Result<Query<MessagesQuery>, QueryRejection>,
    body: Result<Bytes, BytesRejection>,
) -> Result<(StatusCode, &'static str), RouteError> {
    let session_id = query.ok().and_then(|Query(q)| q.session_id);
    let body = match body {
        Ok(body) => body,
        Err(rejection) => {
            let _ = state.router.resolve(session_id.as_deref())?;
            return Err(RouteError::internal(format!("unreadable body: {rejection}")));
        }
    };
    let _ = state.router.route(session_id.as_deref(), &body)?;
    Ok((StatusCode::ACCEPTED, "Accepted"))
}
