//! Boundary error classification for upstream calls.

use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use metrics::counter;
use tracing::{error, warn};

use crate::transport::registry::RegistryError;

/// Generic message returned for every server fault.
pub const INTERNAL_ERROR_MESSAGE: &str = "internal error";

/// Who is at fault for a failed call.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FaultClass {
    /// The caller sent something unroutable. Message is shown as-is.
    Client,
    /// Something failed on our side. Message is replaced by a generic one.
    Server,
}

/// Failure routing an upstream call.
#[derive(Debug, thiserror::Error)]
pub enum RouteError {
    /// Session id missing or not a well-formed token.
    #[error("invalid session id")]
    InvalidSession,
    /// Well-formed id with no live session behind it.
    #[error("no active connection")]
    NoActiveConnection,
    /// Anything else. The detail is for logs only.
    #[error("internal error: {0}")]
    Internal(String),
}

impl RouteError {
    /// Build an internal error from any displayable cause.
    pub fn internal(cause: impl std::fmt::Display) -> Self {
        Self::Internal(cause.to_string())
    }

    /// Fault class of this error.
    pub fn class(&self) -> FaultClass {
        match self {
            Self::InvalidSession | Self::NoActiveConnection => FaultClass::Client,
            Self::Internal(_) => FaultClass::Server,
        }
    }

    /// Short classification string for logs and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::InvalidSession => "invalid_session",
            Self::NoActiveConnection => "no_active_connection",
            Self::Internal(_) => "internal_error",
        }
    }

    /// HTTP status returned to the caller.
    pub fn status(&self) -> StatusCode {
        match self.class() {
            FaultClass::Client => StatusCode::BAD_REQUEST,
            FaultClass::Server => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    /// Message safe to show the caller.
    pub fn public_message(&self) -> String {
        match self.class() {
            FaultClass::Client => self.to_string(),
            FaultClass::Server => INTERNAL_ERROR_MESSAGE.to_owned(),
        }
    }
}

impl From<RegistryError> for RouteError {
    fn from(err: RegistryError) -> Self {
        Self::internal(err)
    }
}

impl IntoResponse for RouteError {
    fn into_response(self) -> Response {
        counter!("route_errors_total", "kind" => self.kind()).increment(1);
        match self.class() {
            FaultClass::Client => warn!(kind = self.kind(), "rejected upstream call: {self}"),
            FaultClass::Server => error!(kind = self.kind(), error = %self, "upstream call failed"),
        }
        let body = serde_json::json!({ "error": self.public_message() });
        (self.status(), Json(body)).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use hash_core::ids::SessionId;

    async fn body_json(resp: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(resp.into_body(), 10_000).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[test]
    fn client_faults() {
        assert_eq!(RouteError::InvalidSession.class(), FaultClass::Client);
        assert_eq!(RouteError::NoActiveConnection.class(), FaultClass::Client);
        assert_eq!(RouteError::InvalidSession.status(), StatusCode::BAD_REQUEST);
        assert_eq!(RouteError::NoActiveConnection.status(), StatusCode::BAD_REQUEST);
    }

    #[test]
    fn internal_is_server_fault() {
        let err = RouteError::internal("db exploded at line 42");
        assert_eq!(err.class(), FaultClass::Server);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.public_message(), "internal error");
    }

    #[test]
    fn registry_error_maps_to_internal() {
        let err: RouteError = RegistryError::DuplicateSession(SessionId::from_raw("x")).into();
        assert_eq!(err.kind(), "internal_error");
    }

    #[tokio::test]
    async fn no_active_connection_response() {
        let resp = RouteError::NoActiveConnection.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await, serde_json::json!({"error": "no active connection"}));
    }

    #[tokio::test]
    async fn invalid_session_response() {
        let resp = RouteError::InvalidSession.into_response();
        assert_eq!(resp.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(resp).await["error"], "invalid session id");
    }

    #[tokio::test]
    async fn internal_detail_never_leaks() {
        let resp = RouteError::internal("secret stack detail").into_response();
        assert_eq!(resp.status(), StatusCode::INTERNAL_SERVER_ERROR);
        let body = body_json(resp).await;
        assert_eq!(body, serde_json::json!({"error": "internal error"}));
        assert!(!body.to_string().contains("secret"));
    }
}
