//! docscout: LLM gateway for the doctor-search aggregator.
//!
//! One request/response contract over OpenAI-compatible chat backends, a
//! bounded tool-calling loop, configuration-driven provider selection and the
//! review analysis built on top of them.

pub mod analysis;
pub mod config;
pub mod error;
pub mod providers;
pub mod tools;

pub use error::{GatewayError, ToolError};
pub use providers::{Provider, ProviderFactory};
