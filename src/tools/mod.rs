//! Local tool handlers and their registry.

pub mod base;
pub mod registry;

pub use base::ToolHandler;
pub use registry::ToolRegistry;
