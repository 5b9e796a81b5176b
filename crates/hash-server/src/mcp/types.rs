//! JSON-RPC 2.0 envelopes carried over the SSE transport.

use serde::{Deserialize, Serialize};
use serde_json::Value;

// ── Error code constants ────────────────────────────────────────────

/// Invalid JSON was received.
pub const PARSE_ERROR: i32 = -32700;
/// The JSON sent is not a valid request object.
pub const INVALID_REQUEST: i32 = -32600;
/// Method does not exist.
pub const METHOD_NOT_FOUND: i32 = -32601;
/// Invalid method parameters.
pub const INVALID_PARAMS: i32 = -32602;
/// Internal JSON-RPC error.
pub const INTERNAL_ERROR: i32 = -32603;

/// Protocol version string every envelope must carry.
pub const JSONRPC_VERSION: &str = "2.0";

/// Why an upstream body is not a usable JSON-RPC message.
#[derive(Debug, thiserror::Error)]
pub enum DecodeError {
    /// Not valid JSON at all.
    #[error("invalid JSON: {0}")]
    Json(#[from] serde_json::Error),
    /// A JSON array. Batches are not accepted.
    #[error("batch requests are not supported")]
    Batch,
    /// Valid JSON but not a JSON-RPC 2.0 object.
    #[error("not a JSON-RPC 2.0 message: {0}")]
    Envelope(&'static str),
}

impl DecodeError {
    /// JSON-RPC error code for this rejection.
    pub fn code(&self) -> i32 {
        match self {
            Self::Json(_) => PARSE_ERROR,
            Self::Batch | Self::Envelope(_) => INVALID_REQUEST,
        }
    }
}

/// One decoded upstream message.
#[derive(Clone, Debug, PartialEq)]
pub enum JsonRpcMessage {
    /// Call expecting a reply.
    Request {
        /// Caller-chosen id echoed in the reply.
        id: Value,
        /// Method name.
        method: String,
        /// Parameters, if any.
        params: Option<Value>,
    },
    /// Call with no id. Never answered.
    Notification {
        /// Method name.
        method: String,
        /// Parameters, if any.
        params: Option<Value>,
    },
    /// A client's reply to a server-initiated request.
    Response(Value),
}

impl JsonRpcMessage {
    /// Decode and validate one upstream body.
    pub fn from_slice(body: &[u8]) -> Result<Self, DecodeError> {
        let value: Value = serde_json::from_slice(body)?;
        let mut obj = match value {
            Value::Object(obj) => obj,
            Value::Array(_) => return Err(DecodeError::Batch),
            _ => return Err(DecodeError::Envelope("expected an object")),
        };

        if obj.get("jsonrpc").and_then(Value::as_str) != Some(JSONRPC_VERSION) {
            return Err(DecodeError::Envelope("jsonrpc must be \"2.0\""));
        }

        let Some(method) = obj.remove("method") else {
            if obj.contains_key("id") && (obj.contains_key("result") || obj.contains_key("error")) {
                return Ok(Self::Response(Value::Object(obj)));
            }
            return Err(DecodeError::Envelope("missing method"));
        };
        let Value::String(method) = method else {
            return Err(DecodeError::Envelope("method must be a string"));
        };
        let params = obj.remove("params");

        match obj.remove("id") {
            None => Ok(Self::Notification { method, params }),
            Some(id @ (Value::String(_) | Value::Number(_))) => Ok(Self::Request { id, method, params }),
            Some(_) => Err(DecodeError::Envelope("id must be a string or number")),
        }
    }

    /// Method name, for requests and notifications.
    pub fn method(&self) -> Option<&str> {
        match self {
            Self::Request { method, .. } | Self::Notification { method, .. } => Some(method),
            Self::Response(_) => None,
        }
    }
}

/// Outgoing JSON-RPC response.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    /// Always `"2.0"`.
    pub jsonrpc: String,
    /// Id of the request being answered.
    pub id: Value,
    /// Success payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    /// Failure payload.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
}

/// JSON-RPC error object.
#[derive(Debug, Serialize, Deserialize)]
pub struct JsonRpcError {
    /// Numeric error code.
    pub code: i32,
    /// Human-readable message.
    pub message: String,
    /// Extra detail.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcResponse {
    /// Successful response.
    pub fn success(id: Value, result: Value) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: Some(result),
            error: None,
        }
    }

    /// Error response.
    pub fn error(id: Value, code: i32, message: impl Into<String>) -> Self {
        Self {
            jsonrpc: JSONRPC_VERSION.into(),
            id,
            result: None,
            error: Some(JsonRpcError {
                code,
                message: message.into(),
                data: None,
            }),
        }
    }
}
