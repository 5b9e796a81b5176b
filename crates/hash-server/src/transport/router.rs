//! Routes upstream calls to the downstream stream of their session.

use std::sync::Arc;

use async_trait::async_trait;
use hash_core::ids::SessionId;
use metrics::counter;
use tracing::{debug, instrument};

use super::handle::Frame;
use super::registry::{Session, SessionRegistry};
use crate::error::RouteError;

/// The protocol layer that consumes routed payloads.
#[async_trait]
pub trait MessageHandler: Send + Sync + 'static {
    /// Decoded upstream payload.
    type Message: Send + 'static;
    /// Why a payload was rejected.
    type Error: std::fmt::Display;

    /// Validate and decode a payload. Runs before the call is acknowledged.
    fn decode(&self, body: &[u8]) -> Result<Self::Message, Self::Error>;

    /// Process a decoded payload and return the serialized reply to push
    /// downstream, if the message calls for one.
    async fn handle(&self, message: Self::Message, session_id: &SessionId) -> Option<String>;
}

/// Correlates upstream calls with live sessions.
pub struct MessageRouter<H> {
    registry: Arc<SessionRegistry>,
    handler: Arc<H>,
}

impl<H: MessageHandler> MessageRouter<H> {
    /// Create a router over `registry` that forwards to `handler`.
    pub fn new(registry: Arc<SessionRegistry>, handler: Arc<H>) -> Self {
        Self { registry, handler }
    }

    /// Registry the router reads from.
    pub fn registry(&self) -> &Arc<SessionRegistry> {
        &self.registry
    }

    /// Resolve a raw session id to its live session.
    ///
    /// A missing or malformed id is [`RouteError::InvalidSession`]; a
    /// well-formed id with no registered stream is
    /// [`RouteError::NoActiveConnection`].
    pub fn resolve(&self, session_id: Option<&str>) -> Result<Arc<Session>, RouteError> {
        let id = session_id
            .and_then(SessionId::parse)
            .ok_or(RouteError::InvalidSession)?;
        self.registry
            .lookup(&id)
            .ok_or(RouteError::NoActiveConnection)
    }

    /// Route one upstream call.
    ///
    /// Validates the session id, looks the session up, decodes the payload
    /// and hands it to the handler on a spawned task. Returns once the
    /// payload is handed off; the reply is pushed on the session's stream.
    #[instrument(skip_all, fields(session_id = session_id.unwrap_or_default()))]
    pub fn route(&self, session_id: Option<&str>, body: &[u8]) -> Result<SessionId, RouteError> {
        let session = self.resolve(session_id)?;
        let id = session.id.clone();
        let message = self
            .handler
            .decode(body)
            .map_err(|e| RouteError::internal(format!("rejected payload: {e}")))?;

        counter!("messages_routed_total").increment(1);
        let handler = Arc::clone(&self.handler);
        let _ = tokio::spawn(async move {
            let Some(reply) = handler.handle(message, &session.id).await else {
                return;
            };
            if let Err(e) = session.handle.push(Frame::Message(reply)).await {
                debug!(session_id = %session.id, error = %e, "reply dropped, stream gone");
            }
        });

        Ok(id)
    }
}
