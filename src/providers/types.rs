//! Canonical chat types shared by every provider.
//!
//! These define the contract between application code and any LLM backend.
//! Adapters translate them to and from their vendor wire format.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use super::schema::Tool;
use crate::error::GatewayError;

/// Author of a message in a conversation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
    Assistant,
    Tool,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::System => "system",
            Role::User => "user",
            Role::Assistant => "assistant",
            Role::Tool => "tool",
        }
    }
}

/// A single message in a conversation.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    #[serde(default)]
    pub content: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_calls: Option<Vec<ToolCall>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub tool_call_id: Option<String>,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self::plain(Role::System, content)
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self::plain(Role::User, content)
    }

    pub fn assistant(content: impl Into<String>) -> Self {
        Self::plain(Role::Assistant, content)
    }

    /// Assistant turn that requested tool invocations.
    pub fn assistant_with_tool_calls(content: impl Into<String>, tool_calls: Vec<ToolCall>) -> Self {
        Self {
            role: Role::Assistant,
            content: content.into(),
            tool_calls: Some(tool_calls),
            tool_call_id: None,
        }
    }

    /// Result of executing the tool call identified by `tool_call_id`.
    pub fn tool_result(tool_call_id: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            role: Role::Tool,
            content: content.into(),
            tool_calls: None,
            tool_call_id: Some(tool_call_id.into()),
        }
    }

    fn plain(role: Role, content: impl Into<String>) -> Self {
        Self {
            role,
            content: content.into(),
            tool_calls: None,
            tool_call_id: None,
        }
    }
}

/// Check the structural invariants of a conversation.
///
/// Only assistant messages may carry `tool_calls`, and every tool message must
/// answer a tool call id issued by an earlier assistant message.
pub fn validate_conversation(messages: &[ChatMessage]) -> Result<(), GatewayError> {
    let mut issued: HashSet<&str> = HashSet::new();

    for (idx, msg) in messages.iter().enumerate() {
        if let Some(calls) = &msg.tool_calls {
            if msg.role != Role::Assistant {
                return Err(GatewayError::InvalidConversation(format!(
                    "message {} has role '{}' but carries tool_calls",
                    idx,
                    msg.role.as_str()
                )));
            }
            issued.extend(calls.iter().map(|c| c.id.as_str()));
        }

        if msg.role == Role::Tool {
            match msg.tool_call_id.as_deref() {
                Some(id) if issued.contains(id) => {}
                Some(id) => {
                    return Err(GatewayError::InvalidConversation(format!(
                        "tool message {} answers unknown tool call '{}'",
                        idx, id
                    )))
                }
                None => {
                    return Err(GatewayError::InvalidConversation(format!(
                        "tool message {} has no tool_call_id",
                        idx
                    )))
                }
            }
        }
    }

    Ok(())
}

/// A tool invocation requested by the model.
///
/// `arguments` is kept exactly as the vendor sent it; it is usually JSON but
/// nothing guarantees that.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub name: String,
    pub arguments: String,
}

/// How the model may use the declared tools.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ToolChoice {
    Auto,
    None,
    Required,
    /// Force a call to the named function.
    Function(String),
}

impl ToolChoice {
    /// Vendor representation: a bare string or a pinned function object.
    pub fn to_value(&self) -> serde_json::Value {
        match self {
            ToolChoice::Auto => serde_json::json!("auto"),
            ToolChoice::None => serde_json::json!("none"),
            ToolChoice::Required => serde_json::json!("required"),
            ToolChoice::Function(name) => serde_json::json!({
                "type": "function",
                "function": { "name": name },
            }),
        }
    }
}

/// Per-request options. Absent fields fall back to the provider defaults.
#[derive(Debug, Clone, Default)]
pub struct ChatOptions {
    pub model: Option<String>,
    pub temperature: Option<f32>,
    pub max_tokens: Option<u32>,
    pub tools: Vec<Tool>,
    pub tool_choice: Option<ToolChoice>,
    pub parallel_tool_calls: Option<bool>,
}

impl ChatOptions {
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = Some(model.into());
        self
    }

    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = Some(temperature);
        self
    }

    pub fn with_max_tokens(mut self, max_tokens: u32) -> Self {
        self.max_tokens = Some(max_tokens);
        self
    }
}

/// Why generation stopped.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FinishReason {
    Stop,
    ToolCalls,
    Length,
    ContentFilter,
    Other(String),
}

impl FinishReason {
    pub fn parse(raw: &str) -> Self {
        match raw {
            "stop" => FinishReason::Stop,
            "tool_calls" | "function_call" => FinishReason::ToolCalls,
            "length" => FinishReason::Length,
            "content_filter" => FinishReason::ContentFilter,
            other => FinishReason::Other(other.to_string()),
        }
    }
}

impl fmt::Display for FinishReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FinishReason::Stop => f.write_str("stop"),
            FinishReason::ToolCalls => f.write_str("tool_calls"),
            FinishReason::Length => f.write_str("length"),
            FinishReason::ContentFilter => f.write_str("content_filter"),
            FinishReason::Other(s) => f.write_str(s),
        }
    }
}

/// Token usage statistics.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Usage {
    pub prompt_tokens: u32,
    pub completion_tokens: u32,
}

/// Normalized response from a provider.
#[derive(Debug, Clone, PartialEq)]
pub struct ChatResponse {
    /// Empty when the model only emitted tool calls.
    pub content: String,
    pub tool_calls: Vec<ToolCall>,
    pub finish_reason: FinishReason,
    pub usage: Usage,
}

impl ChatResponse {
    /// Plain text answer with no tool calls.
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            tool_calls: Vec::new(),
            finish_reason: FinishReason::Stop,
            usage: Usage::default(),
        }
    }

    /// Check if response contains tool calls.
    pub fn has_tool_calls(&self) -> bool {
        !self.tool_calls.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn call(id: &str) -> ToolCall {
        ToolCall {
            id: id.to_string(),
            name: "search_doctors".to_string(),
            arguments: "{}".to_string(),
        }
    }

    #[test]
    fn test_constructors_set_roles() {
        assert_eq!(ChatMessage::system("s").role, Role::System);
        assert_eq!(ChatMessage::user("u").role, Role::User);
        assert_eq!(ChatMessage::assistant("a").role, Role::Assistant);

        let tool = ChatMessage::tool_result("call_1", "{}");
        assert_eq!(tool.role, Role::Tool);
        assert_eq!(tool.tool_call_id.as_deref(), Some("call_1"));
    }

    #[test]
    fn test_valid_tool_exchange() {
        let messages = vec![
            ChatMessage::user("find a cardiologist"),
            ChatMessage::assistant_with_tool_calls("", vec![call("call_1")]),
            ChatMessage::tool_result("call_1", r#"{"count":2}"#),
        ];
        assert!(validate_conversation(&messages).is_ok());
    }

    #[test]
    fn test_tool_message_must_reference_prior_call() {
        let messages = vec![
            ChatMessage::user("hi"),
            ChatMessage::tool_result("call_9", "{}"),
        ];
        let err = validate_conversation(&messages).unwrap_err();
        assert!(err.to_string().contains("call_9"));
    }

    #[test]
    fn test_tool_calls_only_on_assistant() {
        let mut msg = ChatMessage::user("hi");
        msg.tool_calls = Some(vec![call("call_1")]);
        let err = validate_conversation(&[msg]).unwrap_err();
        assert!(err.to_string().contains("role 'user'"));
    }

    #[test]
    fn test_tool_choice_values() {
        assert_eq!(ToolChoice::Auto.to_value(), serde_json::json!("auto"));
        assert_eq!(ToolChoice::Required.to_value(), serde_json::json!("required"));
        let pinned = ToolChoice::Function("search_doctors".into()).to_value();
        assert_eq!(pinned["type"], "function");
        assert_eq!(pinned["function"]["name"], "search_doctors");
    }

    #[test]
    fn test_finish_reason_parse() {
        assert_eq!(FinishReason::parse("tool_calls"), FinishReason::ToolCalls);
        assert_eq!(FinishReason::parse("length"), FinishReason::Length);
        assert_eq!(
            FinishReason::parse("eos"),
            FinishReason::Other("eos".to_string())
        );
        assert_eq!(FinishReason::ToolCalls.to_string(), "tool_calls");
    }
}
