//! Tool registry: dispatches model tool calls to local handlers.

use std::collections::HashMap;

use async_trait::async_trait;
use serde_json::Value;
use tracing::debug;

use super::base::ToolHandler;
use crate::error::ToolError;
use crate::providers::base::ToolExecutor;
use crate::providers::schema::Tool;

/// Registry of local tools keyed by name.
pub struct ToolRegistry {
    tools: HashMap<String, Box<dyn ToolHandler>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self {
            tools: HashMap::new(),
        }
    }

    /// Register a tool. Replaces any existing tool with the same name.
    pub fn register(&mut self, tool: Box<dyn ToolHandler>) {
        let name = tool.name().to_string();
        self.tools.insert(name, tool);
    }

    /// Definitions of every registered tool, ordered by name.
    pub fn definitions(&self) -> Vec<Tool> {
        let mut defs: Vec<Tool> = self
            .tools
            .values()
            .map(|t| t.definition().clone())
            .collect();
        defs.sort_by(|a, b| a.name.cmp(&b.name));
        defs
    }
}

impl Default for ToolRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl ToolExecutor for ToolRegistry {
    async fn execute(&self, name: &str, args: Value) -> Result<Value, ToolError> {
        let tool = self
            .tools
            .get(name)
            .ok_or_else(|| ToolError::new(format!("Tool '{}' not found", name)))?;
        debug!(tool = name, "Executing tool");
        tool.call(args).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::providers::schema::ObjectSchema;
    use serde_json::json;

    struct Constant {
        tool: Tool,
        value: Value,
    }

    impl Constant {
        fn boxed(name: &str, value: Value) -> Box<dyn ToolHandler> {
            Box::new(Self {
                tool: Tool::new(name, "Returns a constant", ObjectSchema::new()),
                value,
            })
        }
    }

    #[async_trait]
    impl ToolHandler for Constant {
        fn definition(&self) -> &Tool {
            &self.tool
        }

        async fn call(&self, _args: Value) -> Result<Value, ToolError> {
            Ok(self.value.clone())
        }
    }

    #[test]
    fn test_definitions_are_sorted_by_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Constant::boxed("b_tool", json!(2)));
        registry.register(Constant::boxed("a_tool", json!(1)));

        let names: Vec<String> = registry.definitions().into_iter().map(|t| t.name).collect();
        assert_eq!(names, vec!["a_tool", "b_tool"]);
    }

    #[test]
    fn test_register_replaces_same_name() {
        let mut registry = ToolRegistry::new();
        registry.register(Constant::boxed("t", json!(1)));
        registry.register(Constant::boxed("t", json!(2)));
        assert_eq!(registry.definitions().len(), 1);
    }

    #[tokio::test]
    async fn test_execute_dispatches_by_name() {
        let mut registry = ToolRegistry::default();
        registry.register(Constant::boxed("answer", json!({"value": 42})));

        let out = registry.execute("answer", json!({})).await.unwrap();
        assert_eq!(out, json!({"value": 42}));
    }

    #[tokio::test]
    async fn test_execute_unknown_tool() {
        let registry = ToolRegistry::new();
        let err = registry.execute("missing", json!({})).await.unwrap_err();
        assert_eq!(err.message, "Tool 'missing' not found");
    }
}
