//! Method dispatch for the Model Context Protocol subset the server speaks.

use std::sync::Arc;

use async_trait::async_trait;
use hash_core::ids::SessionId;
use hash_core::tools::{ToolContext, ToolError};
use hash_tools::registry::ToolRegistry;
use metrics::counter;
use serde_json::{Value, json};
use tracing::{debug, warn};

use super::types::{
    DecodeError, INTERNAL_ERROR, INVALID_PARAMS, JsonRpcMessage, JsonRpcResponse, METHOD_NOT_FOUND,
};
use crate::transport::router::MessageHandler;

/// Protocol versions the server understands, oldest first.
pub const SUPPORTED_PROTOCOL_VERSIONS: &[&str] = &["2024-11-05", "2025-03-26", "2025-06-18"];

/// Version offered when the client asks for one we do not know.
pub const LATEST_PROTOCOL_VERSION: &str = "2025-06-18";

/// Failure handling one request. Becomes a JSON-RPC error reply.
#[derive(Debug, thiserror::Error)]
pub enum McpError {
    /// No handler for the method.
    #[error("method not found: {0}")]
    MethodNotFound(String),
    /// Params missing or malformed.
    #[error("invalid params: {0}")]
    InvalidParams(String),
    /// Reply could not be built.
    #[error("internal error: {0}")]
    Internal(String),
}

impl McpError {
    /// JSON-RPC error code.
    pub fn code(&self) -> i32 {
        match self {
            Self::MethodNotFound(_) => METHOD_NOT_FOUND,
            Self::InvalidParams(_) => INVALID_PARAMS,
            Self::Internal(_) => INTERNAL_ERROR,
        }
    }
}

/// Answers MCP requests using a tool registry.
pub struct McpHandler {
    tools: Arc<ToolRegistry>,
    name: String,
    version: String,
}

impl McpHandler {
    /// Handler advertising itself as `name`/`version`.
    pub fn new(tools: Arc<ToolRegistry>, name: impl Into<String>, version: impl Into<String>) -> Self {
        Self {
            tools,
            name: name.into(),
            version: version.into(),
        }
    }

    /// Tools this handler serves.
    pub fn tools(&self) -> &Arc<ToolRegistry> {
        &self.tools
    }

    /// Dispatch one request to its method.
    pub async fn dispatch(
        &self,
        method: &str,
        params: Option<Value>,
        session_id: &SessionId,
    ) -> Result<Value, McpError> {
        match method {
            "initialize" => Ok(self.initialize(params.as_ref())),
            "ping" => Ok(json!({})),
            "tools/list" => Ok(json!({ "tools": self.tools.definitions() })),
            "tools/call" => self.call_tool(params, session_id).await,
            other => Err(McpError::MethodNotFound(other.to_owned())),
        }
    }

    fn initialize(&self, params: Option<&Value>) -> Value {
        let requested = params
            .and_then(|p| p.get("protocolVersion"))
            .and_then(Value::as_str);
        let version = match requested {
            Some(v) if SUPPORTED_PROTOCOL_VERSIONS.contains(&v) => v,
            _ => LATEST_PROTOCOL_VERSION,
        };
        json!({
            "protocolVersion": version,
            "capabilities": { "tools": {} },
            "serverInfo": { "name": self.name, "version": self.version },
        })
    }

    async fn call_tool(&self, params: Option<Value>, session_id: &SessionId) -> Result<Value, McpError> {
        let mut params = params.ok_or_else(|| McpError::InvalidParams("missing params".into()))?;
        let name = params
            .get("name")
            .and_then(Value::as_str)
            .ok_or_else(|| McpError::InvalidParams("missing tool name".into()))?
            .to_owned();
        let args = match params.get_mut("arguments").map(Value::take) {
            None | Some(Value::Null) => json!({}),
            Some(args) => args,
        };

        let tool = self.tools.get(&name).ok_or_else(|| {
            counter!("tool_calls_total", "tool" => "unknown", "outcome" => "unknown_tool").increment(1);
            McpError::InvalidParams(format!("unknown tool: {name}"))
        })?;

        let ctx = ToolContext {
            session_id: session_id.clone(),
        };
        match tool.execute(args, &ctx).await {
            Ok(result) => {
                let outcome = if result.is_error { "error" } else { "ok" };
                counter!("tool_calls_total", "tool" => name.clone(), "outcome" => outcome).increment(1);
                debug!(
                    tool = %name,
                    duration_ms = u64::try_from(result.duration.as_millis()).unwrap_or(u64::MAX),
                    "tool call finished"
                );
                Ok(json!({
                    "content": [{ "type": "text", "text": result.content }],
                    "isError": result.is_error,
                }))
            }
            Err(ToolError::InvalidArguments(msg)) => {
                counter!("tool_calls_total", "tool" => name, "outcome" => "invalid_arguments").increment(1);
                Err(McpError::InvalidParams(msg))
            }
            Err(err @ ToolError::ExecutionFailed(_)) => {
                counter!("tool_calls_total", "tool" => name.clone(), "outcome" => "error").increment(1);
                warn!(tool = %name, error = %err, "tool call failed");
                Ok(json!({
                    "content": [{ "type": "text", "text": err.to_string() }],
                    "isError": true,
                }))
            }
        }
    }
}

#[async_trait]
impl MessageHandler for McpHandler {
    type Message = JsonRpcMessage;
    type Error = DecodeError;

    fn decode(&self, body: &[u8]) -> Result<JsonRpcMessage, DecodeError> {
        JsonRpcMessage::from_slice(body)
            .inspect_err(|e| debug!(code = e.code(), error = %e, "rejected upstream body"))
    }

    async fn handle(&self, message: JsonRpcMessage, session_id: &SessionId) -> Option<String> {
        debug!(%session_id, method = message.method().unwrap_or("-"), "handling message");
        let (id, method, params) = match message {
            JsonRpcMessage::Request { id, method, params } => (id, method, params),
            JsonRpcMessage::Notification { method, .. } => {
                debug!(%session_id, %method, "notification received");
                return None;
            }
            JsonRpcMessage::Response(_) => {
                debug!(%session_id, "client response ignored");
                return None;
            }
        };

        let outcome = self.dispatch(&method, params, session_id).await;
        if let Err(err) = &outcome {
            debug!(%session_id, %method, code = err.code(), error = %err, "request failed");
        }
        encode_reply(id, outcome)
    }
}

/// Serialize the reply to request `id`.
///
/// A result that cannot be serialized is answered with an internal error
/// instead, so the caller is never left waiting.
fn encode_reply(id: Value, outcome: Result<Value, McpError>) -> Option<String> {
    let response = match outcome {
        Ok(result) => JsonRpcResponse::success(id.clone(), result),
        Err(err) => JsonRpcResponse::error(id.clone(), err.code(), err.to_string()),
    };
    serde_json::to_string(&response)
        .or_else(|e| {
            let err = McpError::Internal(format!("failed to serialize response: {e}"));
            warn!(error = %err, "replying with internal error");
            serde_json::to_string(&JsonRpcResponse::error(id, err.code(), err.to_string()))
        })
        .ok()
}
