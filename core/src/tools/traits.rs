use super::definition::ToolDefinition;
use super::error::ToolResult;
use crate::session::SessionContext;
use async_trait::async_trait;
use serde_json::Value;

/// The core trait for every locally executed tool
#[async_trait]
pub trait Tool: Send + Sync {
    /// Name, description and JSON Schema for the tool's arguments.
    /// Must return the same value on every call.
    fn definition(&self) -> ToolDefinition;

    /// Execute the tool with the given arguments and produce the text handed back to the model
    async fn call(&self, ctx: &SessionContext, arguments: Value) -> ToolResult<String>;
}
