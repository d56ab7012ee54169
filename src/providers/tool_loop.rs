//! Bounded tool-calling loop.
//!
//! At most two vendor round-trips: one with tools attached and, when the
//! model asked for tools, one without tools to obtain the final answer.
//! Tool calls run one at a time in the order the model returned them, even
//! when parallel calls were requested of the vendor.

use tracing::{debug, warn};

use super::base::{ChatProvider, ToolExecutor};
use super::schema::Tool;
use super::types::{ChatMessage, ChatOptions, ToolCall, ToolChoice};
use crate::error::{GatewayError, ToolError};

/// Run one round of tool use against `provider`.
///
/// `options` supplies model/temperature/max-tokens for both calls and may
/// override `tool_choice` (default auto) and `parallel_tool_calls` (default
/// true) for the first call. Its `tools` field is ignored in favour of
/// `tools`.
pub async fn run_tool_loop<P>(
    provider: &P,
    messages: &[ChatMessage],
    tools: &[Tool],
    executor: &dyn ToolExecutor,
    options: ChatOptions,
) -> Result<String, GatewayError>
where
    P: ChatProvider + ?Sized,
{
    let first_options = ChatOptions {
        tools: tools.to_vec(),
        tool_choice: Some(options.tool_choice.clone().unwrap_or(ToolChoice::Auto)),
        parallel_tool_calls: Some(options.parallel_tool_calls.unwrap_or(true)),
        ..options.clone()
    };

    let initial = provider.chat(messages, &first_options).await?;

    if !initial.has_tool_calls() {
        debug!(
            provider = provider.name(),
            finish_reason = %initial.finish_reason,
            "Model answered without tool calls"
        );
        return Ok(initial.content);
    }

    debug!(
        provider = provider.name(),
        tool_calls = initial.tool_calls.len(),
        "Executing requested tool calls"
    );

    let mut working: Vec<ChatMessage> = Vec::with_capacity(messages.len() + 1 + initial.tool_calls.len());
    working.extend_from_slice(messages);
    working.push(ChatMessage::assistant_with_tool_calls(
        initial.content.clone(),
        initial.tool_calls.clone(),
    ));

    for call in &initial.tool_calls {
        let content = execute_call(call, executor).await;
        working.push(ChatMessage::tool_result(call.id.clone(), content));
    }

    let final_options = ChatOptions {
        tools: Vec::new(),
        tool_choice: None,
        parallel_tool_calls: None,
        ..options
    };

    let final_response = provider.chat(&working, &final_options).await?;
    Ok(final_response.content)
}

/// Execute one call and encode its outcome as tool-message content.
async fn execute_call(call: &ToolCall, executor: &dyn ToolExecutor) -> String {
    let args = parse_arguments(call);

    match executor.execute(&call.name, args).await {
        Ok(value) => encode_result(&value),
        Err(err) => {
            warn!(tool = %call.name, error = %err, "Tool execution failed");
            encode_error(&err)
        }
    }
}

/// Parse the raw arguments, substituting an empty object when they are not JSON.
fn parse_arguments(call: &ToolCall) -> serde_json::Value {
    if call.arguments.trim().is_empty() {
        return serde_json::Value::Object(serde_json::Map::new());
    }
    match serde_json::from_str(&call.arguments) {
        Ok(value) => value,
        Err(e) => {
            warn!(
                tool = %call.name,
                error = %e,
                raw = %call.arguments,
                "Failed to parse tool arguments, using empty object"
            );
            serde_json::Value::Object(serde_json::Map::new())
        }
    }
}

/// Strings go through verbatim; everything else is JSON-serialized.
fn encode_result(value: &serde_json::Value) -> String {
    match value {
        serde_json::Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn encode_error(err: &ToolError) -> String {
    let message = if err.message.is_empty() {
        "Tool execution failed"
    } else {
        err.message.as_str()
    };
    serde_json::json!({ "error": message }).to_string()
}
