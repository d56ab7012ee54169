//! Base LLM provider interface.

use std::future::Future;
use std::sync::Arc;

use async_trait::async_trait;

use super::schema::Tool;
use super::tool_loop::run_tool_loop;
use super::types::{ChatMessage, ChatOptions, ChatResponse};
use crate::error::{GatewayError, ToolError};

/// A backend that can answer chat completions.
///
/// Implementations handle the specifics of each vendor's API while keeping
/// the canonical request/response contract. They hold no conversation state.
#[async_trait]
pub trait ChatProvider: Send + Sync {
    /// Send the conversation once and return the normalized response.
    ///
    /// The input messages are never mutated.
    async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatResponse, GatewayError>;

    /// Provider identifier used in logs and provider info.
    fn name(&self) -> &str;

    /// Get the default model for this provider.
    fn default_model(&self) -> &str;
}

/// A provider that can drive one bounded round of tool use.
#[async_trait]
pub trait ToolCapableProvider: ChatProvider {
    /// Offer `tools` to the model, execute whatever it requests, and return
    /// the model's final prose answer.
    async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[Tool],
        executor: &dyn ToolExecutor,
    ) -> Result<String, GatewayError> {
        run_tool_loop(self, messages, tools, executor, ChatOptions::default()).await
    }
}

/// Caller-supplied side of tool calling: runs the function the model asked for.
#[async_trait]
pub trait ToolExecutor: Send + Sync {
    async fn execute(
        &self,
        name: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError>;
}

#[async_trait]
impl<F, Fut> ToolExecutor for F
where
    F: Fn(String, serde_json::Value) -> Fut + Send + Sync,
    Fut: Future<Output = Result<serde_json::Value, ToolError>> + Send,
{
    async fn execute(
        &self,
        name: &str,
        args: serde_json::Value,
    ) -> Result<serde_json::Value, ToolError> {
        (self)(name.to_string(), args).await
    }
}

/// Handle to the provider selected for this process.
///
/// Tool support is part of the type: only the `ToolCapable` variant can run
/// the tool loop.
#[derive(Clone)]
pub enum Provider {
    Basic(Arc<dyn ChatProvider>),
    ToolCapable(Arc<dyn ToolCapableProvider>),
}

impl Provider {
    pub fn basic(provider: impl ChatProvider + 'static) -> Self {
        Provider::Basic(Arc::new(provider))
    }

    pub fn tool_capable(provider: impl ToolCapableProvider + 'static) -> Self {
        Provider::ToolCapable(Arc::new(provider))
    }

    pub fn supports_tools(&self) -> bool {
        matches!(self, Provider::ToolCapable(_))
    }

    pub fn name(&self) -> &str {
        match self {
            Provider::Basic(p) => p.name(),
            Provider::ToolCapable(p) => p.name(),
        }
    }

    pub fn default_model(&self) -> &str {
        match self {
            Provider::Basic(p) => p.default_model(),
            Provider::ToolCapable(p) => p.default_model(),
        }
    }

    pub async fn chat(
        &self,
        messages: &[ChatMessage],
        options: &ChatOptions,
    ) -> Result<ChatResponse, GatewayError> {
        match self {
            Provider::Basic(p) => p.chat(messages, options).await,
            Provider::ToolCapable(p) => p.chat(messages, options).await,
        }
    }

    /// Run the tool loop, failing fast when the provider cannot call tools.
    pub async fn chat_with_tools(
        &self,
        messages: &[ChatMessage],
        tools: &[Tool],
        executor: &dyn ToolExecutor,
    ) -> Result<String, GatewayError> {
        match self {
            Provider::ToolCapable(p) => p.chat_with_tools(messages, tools, executor).await,
            Provider::Basic(p) => Err(GatewayError::ToolsUnsupported(p.name().to_string())),
        }
    }

    /// True when both handles point at the same provider instance.
    pub fn ptr_eq(a: &Provider, b: &Provider) -> bool {
        match (a, b) {
            (Provider::Basic(x), Provider::Basic(y)) => Arc::ptr_eq(x, y),
            (Provider::ToolCapable(x), Provider::ToolCapable(y)) => Arc::ptr_eq(x, y),
            _ => false,
        }
    }
}

impl std::fmt::Debug for Provider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Provider")
            .field("name", &self.name())
            .field("supports_tools", &self.supports_tools())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct EchoProvider {
        calls: AtomicUsize,
    }

    #[async_trait]
    impl ChatProvider for EchoProvider {
        async fn chat(
            &self,
            messages: &[ChatMessage],
            _options: &ChatOptions,
        ) -> Result<ChatResponse, GatewayError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            let last = messages.last().map(|m| m.content.clone()).unwrap_or_default();
            Ok(ChatResponse::text(last))
        }

        fn name(&self) -> &str {
            "echo"
        }

        fn default_model(&self) -> &str {
            "echo-1"
        }
    }

    #[tokio::test]
    async fn test_basic_provider_rejects_tools_without_calling_vendor() {
        let inner = Arc::new(EchoProvider {
            calls: AtomicUsize::new(0),
        });
        let provider = Provider::Basic(inner.clone());
        assert!(!provider.supports_tools());

        let executor = |_name: String, _args: serde_json::Value| async {
            Ok::<_, ToolError>(serde_json::Value::Null)
        };
        let err = provider
            .chat_with_tools(&[ChatMessage::user("hi")], &[], &executor)
            .await
            .unwrap_err();

        assert!(matches!(err, GatewayError::ToolsUnsupported(ref n) if n == "echo"));
        assert_eq!(inner.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_basic_provider_chat_dispatches() {
        let provider = Provider::basic(EchoProvider {
            calls: AtomicUsize::new(0),
        });
        let resp = provider
            .chat(&[ChatMessage::user("ping")], &ChatOptions::default())
            .await
            .unwrap();
        assert_eq!(resp.content, "ping");
        assert_eq!(provider.default_model(), "echo-1");
    }

    #[test]
    fn test_ptr_eq_distinguishes_instances() {
        let a = Provider::basic(EchoProvider {
            calls: AtomicUsize::new(0),
        });
        let b = Provider::basic(EchoProvider {
            calls: AtomicUsize::new(0),
        });
        assert!(Provider::ptr_eq(&a, &a.clone()));
        assert!(!Provider::ptr_eq(&a, &b));
    }
}
