//! In-memory tool host.

use dashmap::DashMap;
use opentool_core::{
    Error, Resource, Result, Tool, ToolContext, ToolDescriptor, ToolHost, ToolResponse,
};
use opentool_telemetry::{ToolSpanAttributes, safe_serialize, trace_tool_call};
use serde_json::Value;
use std::sync::Arc;
use tracing::debug;

/// Registry of tools and resources keyed by name / URI.
///
/// Registering a tool under an existing name replaces the previous tool.
#[derive(Default)]
pub struct ToolRegistry {
    tools: DashMap<String, Arc<dyn Tool>>,
    resources: DashMap<String, Arc<dyn Resource>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.tools.get(name).map(|entry| entry.value().clone())
    }

    /// Registered tools sorted by name
    pub fn tools(&self) -> Vec<Arc<dyn Tool>> {
        let mut tools: Vec<Arc<dyn Tool>> =
            self.tools.iter().map(|entry| entry.value().clone()).collect();
        tools.sort_by(|a, b| a.name().cmp(b.name()));
        tools
    }

    /// Registered tool names, sorted
    pub fn tool_names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.tools.iter().map(|entry| entry.key().clone()).collect();
        names.sort();
        names
    }

    pub fn descriptors(&self) -> Vec<ToolDescriptor> {
        self.tools()
            .iter()
            .map(|tool| ToolDescriptor::from_tool(tool.as_ref()))
            .collect()
    }

    pub fn resource(&self, uri: &str) -> Option<Arc<dyn Resource>> {
        self.resources.get(uri).map(|entry| entry.value().clone())
    }

    pub fn resources(&self) -> Vec<Arc<dyn Resource>> {
        let mut resources: Vec<Arc<dyn Resource>> = self
            .resources
            .iter()
            .map(|entry| entry.value().clone())
            .collect();
        resources.sort_by(|a, b| a.uri().cmp(b.uri()));
        resources
    }

    pub fn len(&self) -> usize {
        self.tools.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tools.is_empty()
    }

    /// Dispatch one call to the named tool.
    ///
    /// An unknown name is not an error: the caller gets a flagged result
    /// pointing it at `list`.
    pub async fn call(
        &self,
        name: &str,
        ctx: Arc<dyn ToolContext>,
        args: Value,
    ) -> Result<ToolResponse> {
        let Some(tool) = self.get(name) else {
            debug!(tool = %name, "Call for unknown tool");
            return Ok(ToolResponse::error_text(format!(
                "Unknown tool '{}'. Use `list` to see the available tools.",
                name
            ))
            .with_next_step("list"));
        };

        let args_json = safe_serialize(&args);
        let result = tool.execute(ctx.clone(), args).await;

        let (response_json, is_error) = match &result {
            Ok(response) => (safe_serialize(response), response.is_error),
            Err(e) => (e.to_string(), true),
        };
        trace_tool_call(ToolSpanAttributes {
            tool_name: tool.name().to_string(),
            tool_description: tool.description().to_string(),
            tool_call_id: ctx.function_call_id().to_string(),
            invocation_id: ctx.invocation_id().to_string(),
            args_json,
            response_json,
            is_error,
        });

        result
    }

    pub async fn read_resource(&self, uri: &str) -> Result<Value> {
        let resource = self
            .resource(uri)
            .ok_or_else(|| Error::ResourceNotFound(uri.to_string()))?;
        resource.read().await
    }
}

impl ToolHost for ToolRegistry {
    fn register_tool(&self, tool: Arc<dyn Tool>) {
        let name = tool.name().to_string();
        if self.tools.insert(name.clone(), tool).is_some() {
            debug!(tool = %name, "Replaced previously registered tool");
        }
    }

    fn register_resource(&self, resource: Arc<dyn Resource>) {
        self.resources.insert(resource.uri().to_string(), resource);
    }
}
