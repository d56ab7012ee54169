//! Error types.
//!
//! [`GatewayError`] is the fatal channel: it propagates to the caller.
//! [`ToolError`] is local to one tool invocation and ends up inside the
//! conversation instead.

use thiserror::Error;

/// Failures surfaced by providers and the provider factory.
#[derive(Debug, Error)]
pub enum GatewayError {
    /// Missing or unusable configuration (e.g. absent credential).
    #[error("configuration error: {0}")]
    Configuration(String),

    /// Vendor answered with a non-success status.
    #[error("{vendor} API error ({status}): {body}{}", status_hint(.status))]
    Provider {
        vendor: String,
        status: u16,
        body: String,
    },

    /// Vendor answered 2xx without a usable completion.
    #[error("unexpected response shape: {0}")]
    ResponseShape(String),

    /// `chat_with_tools` requested from a chat-only provider.
    #[error("provider '{0}' does not support tool calling")]
    ToolsUnsupported(String),

    #[error("invalid tool definition: {0}")]
    InvalidTool(String),

    #[error("invalid conversation: {0}")]
    InvalidConversation(String),

    /// Transport-level failure talking to the vendor.
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),
}

impl GatewayError {
    /// HTTP status for vendor errors.
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::Provider { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn status_hint(status: &u16) -> &'static str {
    match *status {
        404 => " (hint: the base URL should be an API root such as https://api.openai.com/v1, without /chat/completions or /models; also check the model name)",
        401 | 403 => " (hint: check that the API key matches the configured provider)",
        _ => "",
    }
}

/// A single tool invocation failed. Never aborts the tool batch.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("{message}")]
pub struct ToolError {
    pub message: String,
}

impl ToolError {
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }
}

impl From<anyhow::Error> for ToolError {
    fn from(err: anyhow::Error) -> Self {
        Self::new(err.to_string())
    }
}

impl From<serde_json::Error> for ToolError {
    fn from(err: serde_json::Error) -> Self {
        Self::new(err.to_string())
    }
}
