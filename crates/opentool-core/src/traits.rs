use crate::{Result, ToolAnnotations, ToolContext, ToolResponse};
use async_trait::async_trait;
use serde_json::Value;
use std::sync::Arc;

/// Tool trait - abstraction for callable tools
#[async_trait]
pub trait Tool: Send + Sync {
    /// Returns the name of the tool
    fn name(&self) -> &str;

    /// Returns a description of what the tool does
    fn description(&self) -> &str;

    /// Returns the JSON schema for the tool's parameters
    fn schema(&self) -> Value;

    /// Returns behavioral hints for the calling agent
    fn annotations(&self) -> ToolAnnotations {
        ToolAnnotations::default()
    }

    /// Executes the tool with given parameters
    ///
    /// Recoverable failures (bad arguments, non-2xx upstream responses) are
    /// returned as `Ok` responses flagged with `is_error`. `Err` is reserved
    /// for failures where no meaningful result can be produced.
    async fn execute(&self, ctx: Arc<dyn ToolContext>, params: Value) -> Result<ToolResponse>;
}

/// Read-only resource exposed next to the tools
#[async_trait]
pub trait Resource: Send + Sync {
    fn uri(&self) -> &str;

    fn name(&self) -> &str;

    fn description(&self) -> &str;

    fn mime_type(&self) -> &str {
        "application/json"
    }

    async fn read(&self) -> Result<Value>;
}

/// Registration boundary of a tool host
pub trait ToolHost: Send + Sync {
    /// Register a tool; a later registration under the same name replaces it
    fn register_tool(&self, tool: Arc<dyn Tool>);

    fn register_resource(&self, resource: Arc<dyn Resource>);
}
