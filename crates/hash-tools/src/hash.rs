//! The `hash` tool.

use std::time::Instant;

use async_trait::async_trait;
use hash_core::digest::{self, HashAlgorithm};
use hash_core::tools::{Tool, ToolContext, ToolError, ToolResult};

/// Computes the hex digest of a string with one of the supported algorithms.
pub struct HashTool;

#[async_trait]
impl Tool for HashTool {
    fn name(&self) -> &str {
        "hash"
    }

    fn description(&self) -> &str {
        "Compute the hash of a string"
    }

    fn parameters_schema(&self) -> serde_json::Value {
        serde_json::json!({
            "type": "object",
            "required": ["input", "algorithm"],
            "properties": {
                "input": {
                    "type": "string",
                    "description": "The string to hash"
                },
                "algorithm": {
                    "type": "string",
                    "enum": HashAlgorithm::names(),
                    "description": "Hash algorithm"
                }
            },
            "additionalProperties": false
        })
    }

    async fn execute(
        &self,
        args: serde_json::Value,
        ctx: &ToolContext,
    ) -> Result<ToolResult, ToolError> {
        let start = Instant::now();

        let input = args["input"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("input must be a string".into()))?;
        let algorithm = args["algorithm"]
            .as_str()
            .ok_or_else(|| ToolError::InvalidArguments("algorithm must be a string".into()))?
            .parse::<HashAlgorithm>()
            .map_err(|e| ToolError::InvalidArguments(e.to_string()))?;

        let hex = digest::digest_hex(algorithm, input);
        tracing::debug!(
            session_id = %ctx.session_id,
            algorithm = algorithm.as_str(),
            input_len = input.len(),
            "hash computed"
        );

        Ok(ToolResult::text(hex, start.elapsed()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use assert_matches::assert_matches;
    use hash_core::ids::SessionId;

    fn test_ctx() -> ToolContext {
        ToolContext {
            session_id: SessionId::new(),
        }
    }

    #[test]
    fn tool_metadata() {
        let tool = HashTool;
        assert_eq!(tool.name(), "hash");
        let schema = tool.parameters_schema();
        assert_eq!(schema["required"], serde_json::json!(["input", "algorithm"]));
        assert_eq!(schema["properties"]["algorithm"]["enum"].as_array().unwrap().len(), 18);
    }

    #[tokio::test]
    async fn md5_of_hello() {
        let result = HashTool
            .execute(
                serde_json::json!({"algorithm": "md5", "input": "hello"}),
                &test_ctx(),
            )
            .await
            .unwrap();
        assert!(!result.is_error);
        assert_eq!(result.content, "5d41402abc4b2a76b9719d911017c592");
    }

    #[tokio::test]
    async fn unsupported_algorithm_is_invalid_arguments() {
        let result = HashTool
            .execute(
                serde_json::json!({"algorithm": "crc32", "input": "hello"}),
                &test_ctx(),
            )
            .await;
        assert_matches!(result, Err(ToolError::InvalidArguments(msg)) if msg.contains("crc32"));
    }

    #[tokio::test]
    async fn missing_input() {
        let result = HashTool
            .execute(serde_json::json!({"algorithm": "md5"}), &test_ctx())
            .await;
        assert_matches!(result, Err(ToolError::InvalidArguments(_)));
    }

    #[tokio::test]
    async fn non_string_input() {
        let result = HashTool
            .execute(serde_json::json!({"algorithm": "md5", "input": 42}), &test_ctx())
            .await;
        assert_matches!(result, Err(ToolError::InvalidArguments(_)));
    }
}
