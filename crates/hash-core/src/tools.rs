//! Tool contract shared by the registry and the protocol layer.

use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::ids::SessionId;

/// Context available to tools during execution.
#[derive(Clone, Debug)]
pub struct ToolContext {
    /// Session whose downstream stream will receive the result.
    pub session_id: SessionId,
}

/// Result returned by a tool execution.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ToolResult {
    /// Text content returned to the caller.
    pub content: String,
    /// Whether the content describes a failure.
    pub is_error: bool,
    /// Wall-clock execution time.
    #[serde(with = "duration_ms")]
    pub duration: Duration,
}

impl ToolResult {
    /// Successful text result.
    pub fn text(content: impl Into<String>, duration: Duration) -> Self {
        Self {
            content: content.into(),
            is_error: false,
            duration,
        }
    }
}

/// Tool definition advertised to clients.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// Human-readable description.
    pub description: String,
    /// JSON Schema of the arguments object.
    pub input_schema: serde_json::Value,
}

/// Trait implemented by each tool.
#[async_trait]
pub trait Tool: Send + Sync {
    /// Unique tool name.
    fn name(&self) -> &str;
    /// Human-readable description.
    fn description(&self) -> &str;
    /// JSON Schema of the arguments object.
    fn parameters_schema(&self) -> serde_json::Value;

    /// Run the tool.
    async fn execute(
        &self,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError>;

    /// Definition advertised by `tools/list`.
    fn to_definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            input_schema: self.parameters_schema(),
        }
    }
}

/// Tool failure.
#[derive(Debug, thiserror::Error)]
pub enum ToolError {
    /// Arguments missing, mistyped, or outside the allowed values.
    #[error("invalid arguments: {0}")]
    InvalidArguments(String),
    /// The tool ran and failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),
}

/// Serde helper for Duration as milliseconds.
mod duration_ms {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S: Serializer>(d: &Duration, s: S) -> Result<S::Ok, S::Error> {
        s.serialize_u64(u64::try_from(d.as_millis()).unwrap_or(u64::MAX))
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Duration, D::Error> {
        let ms = u64::deserialize(d)?;
        Ok(Duration::from_millis(ms))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct EchoTool;

    #[async_trait]
    impl Tool for EchoTool {
        fn name(&self) -> &str {
            "echo"
        }

        fn description(&self) -> &str {
            "Echo the input"
        }

        fn parameters_schema(&self) -> serde_json::Value {
            serde_json::json!({"type": "object"})
        }

        async fn execute(
            &self,
            args: serde_json::Value,
            _ctx: &ToolContext,
        ) -> Result<ToolResult, ToolError> {
            Ok(ToolResult::text(args.to_string(), Duration::ZERO))
        }
    }

    #[test]
    fn definition_uses_input_schema_key() {
        let def = EchoTool.to_definition();
        let json = serde_json::to_value(&def).unwrap();
        assert_eq!(json["name"], "echo");
        assert_eq!(json["inputSchema"]["type"], "object");
        assert!(json.get("input_schema").is_none());
    }

    #[tokio::test]
    async fn execute_through_trait_object() {
        let tool: Box<dyn Tool> = Box::new(EchoTool);
        let ctx = ToolContext {
            session_id: SessionId::new(),
        };
        let result = tool.execute(serde_json::json!({"a": 1}), &ctx).await.unwrap();
        assert!(!result.is_error);
        assert_eq!(result.content, r#"{"a":1}"#);
    }

    #[test]
    fn tool_result_duration_serializes_as_ms() {
        let result = ToolResult::text("ok", Duration::from_millis(1234));
        let json = serde_json::to_value(&result).unwrap();
        assert_eq!(json["duration"], 1234);

        let parsed: ToolResult = serde_json::from_value(json).unwrap();
        assert_eq!(parsed.duration, Duration::from_millis(1234));
    }

    #[test]
    fn tool_error_display() {
        let err = ToolError::InvalidArguments("missing input".into());
        assert_eq!(err.to_string(), "invalid arguments: missing input");
    }
}
