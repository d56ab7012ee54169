//! Local tools the model may call.

use async_trait::async_trait;
use serde_json::Value;

use crate::error::ToolError;
use crate::providers::schema::Tool;

/// A locally implemented tool.
///
/// The definition is what the model sees; `call` runs when the model asks
/// for it.
#[async_trait]
pub trait ToolHandler: Send + Sync {
    /// Name, description and parameter schema advertised to the model.
    fn definition(&self) -> &Tool;

    /// Run the tool with the arguments the model supplied.
    async fn call(&self, args: Value) -> Result<Value, ToolError>;

    fn name(&self) -> &str {
        &self.definition().name
    }
}
