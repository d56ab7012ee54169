//! In-process stand-in used when no credential is configured.

use async_trait::async_trait;
use tracing::{debug, warn};

use super::base::{ChatProvider, ToolCapableProvider, ToolExecutor};
use super::schema::Tool;
use super::types::{ChatMessage, ChatOptions, ChatResponse, FinishReason, Usage};
use crate::error::GatewayError;

/// Canned answer returned by [`MockProvider::chat`].
pub const MOCK_RESPONSE: &str = "Mock response: Analysis would be performed here";

/// Returned by the tool loop when no extraction was requested.
pub const MOCK_TOOL_RESPONSE: &str = "Mock tool response";

/// Provider that never leaves the process.
#[derive(Debug, Default, Clone)]
pub struct MockProvider;

impl MockProvider {
    /// Name reported by [`ChatProvider::name`].
    pub const NAME: &'static str = "mock";

    pub fn new() -> Self {
        Self
    }

    fn sample_doctors() -> serde_json::Value {
        serde_json::json!({
            "doctors": [
                {
                    "name": "Dr. Mock",
                    "specialty": "Mock Specialty",
                    "address": "Mock Address"
                }
            ]
        })
    }
}

#[async_trait]
impl ChatProvider for MockProvider {
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatResponse, GatewayError> {
        debug!(
            messages = messages.len(),
            tools = options.tools.len(),
            "Mock chat called"
        );
        Ok(ChatResponse {
            content: MOCK_RESPONSE.to_string(),
            tool_calls: Vec::new(),
            finish_reason: FinishReason::Stop,
            usage: Usage {
                prompt_tokens: 100,
                completion_tokens: 50,
            },
        })
    }

    fn name(&self) -> &str {
        Self::NAME
    }

    fn default_model(&self) -> &str {
        Self::NAME
    }
}

#[async_trait]
impl ToolCapableProvider for MockProvider {
    /// Pretends the model called the first tool when the conversation asks
    /// for an extraction.
    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[Tool],
        executor: &dyn ToolExecutor,
    ) -> Result<String, GatewayError> {
        let wants_extraction = messages.iter().any(|m| m.content.contains("extract"));

        let Some(first) = tools.first().filter(|_| wants_extraction) else {
            return Ok(MOCK_TOOL_RESPONSE.to_string());
        };

        debug!(tool = %first.name, "Mock invoking tool");
        let encoded = match executor.execute(&first.name, Self::sample_doctors()).await {
            Ok(value) => value.to_string(),
            Err(err) => {
                warn!(tool = %first.name, error = %err, "Tool execution failed");
                serde_json::json!({ "error": err.message }).to_string()
            }
        };
        Ok(encoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ToolError;
    use crate::providers::schema::ObjectSchema;
    use serde_json::json;

    fn extract_tool() -> Tool {
        Tool::new("save_doctors", "Save extracted doctors", ObjectSchema::new())
    }

    #[tokio::test]
    async fn test_chat_returns_canned_response() {
        let resp = MockProvider::new()
            .chat(&[ChatMessage::user("hello")], &ChatOptions::default())
            .await
            .unwrap();
        assert_eq!(resp.content, MOCK_RESPONSE);
        assert_eq!(resp.usage.prompt_tokens, 100);
        assert_eq!(resp.usage.completion_tokens, 50);
    }

    #[tokio::test]
    async fn test_extraction_prompt_invokes_first_tool() {
        let executor = |name: String, args: serde_json::Value| async move {
            assert_eq!(name, "save_doctors");
            Ok::<_, ToolError>(json!({ "saved": args["doctors"].as_array().map(|a| a.len()) }))
        };
        let out = MockProvider::new()
            .chat_with_tools(
                &[ChatMessage::user("Please extract the doctors from this page")],
                &[extract_tool()],
                &executor,
            )
            .await
            .unwrap();
        assert_eq!(out, r#"{"saved":1}"#);
    }

    #[tokio::test]
    async fn test_other_prompts_skip_tools() {
        use std::sync::atomic::{AtomicUsize, Ordering};

        let runs = AtomicUsize::new(0);
        let executor = |_name: String, _args: serde_json::Value| {
            runs.fetch_add(1, Ordering::SeqCst);
            async { Ok::<_, ToolError>(json!(null)) }
        };
        let out = MockProvider::new()
            .chat_with_tools(&[ChatMessage::user("hello")], &[extract_tool()], &executor)
            .await
            .unwrap();
        assert_eq!(out, MOCK_TOOL_RESPONSE);
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        let out = MockProvider::new()
            .chat_with_tools(&[ChatMessage::user("extract this")], &[], &executor)
            .await
            .unwrap();
        assert_eq!(out, MOCK_TOOL_RESPONSE);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_tool_failure_is_encoded() {
        let executor = |_name: String, _args: serde_json::Value| async move {
            Err::<serde_json::Value, _>(ToolError::new("disk full"))
        };
        let out = MockProvider::new()
            .chat_with_tools(&[ChatMessage::user("extract")], &[extract_tool()], &executor)
            .await
            .unwrap();
        assert_eq!(out, r#"{"error":"disk full"}"#);
    }
}
