//! LLM provider layer.
//!
//! A [`Provider`] handle wraps one adapter. Every adapter can chat; the
//! tool-capable ones also run the bounded tool-calling loop. The
//! [`ProviderFactory`] picks and memoizes the adapter from configuration.

pub mod base;
pub mod factory;
pub mod mock;
pub mod openai_compat;
pub mod schema;
pub mod tool_loop;
pub mod types;

pub use base::{ChatProvider, Provider, ToolCapableProvider, ToolExecutor};
pub use factory::{ProviderFactory, ProviderInfo};
pub use mock::MockProvider;
pub use openai_compat::{normalize_base_url, OpenAICompatProvider, VendorProfile};
pub use schema::{ObjectSchema, ParamSchema, Tool};
pub use tool_loop::run_tool_loop;
pub use types::{
    ChatMessage, ChatOptions, ChatResponse, FinishReason, Role, ToolCall, ToolChoice, Usage,
};
