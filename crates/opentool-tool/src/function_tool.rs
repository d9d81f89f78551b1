//! Tools answered by a closure instead of an upstream API.

use async_trait::async_trait;
use opentool_core::{Result, Tool, ToolAnnotations, ToolContext, ToolDescriptor, ToolResponse};
use serde_json::Value;
use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

type Handler = Box<
    dyn Fn(Arc<dyn ToolContext>, Value) -> Pin<Box<dyn Future<Output = Result<ToolResponse>> + Send>>
        + Send
        + Sync,
>;

/// A tool whose name, description, schema and hints are fixed up front.
pub struct FunctionTool {
    descriptor: ToolDescriptor,
    handler: Handler,
}

impl FunctionTool {
    pub fn new<F, Fut>(descriptor: ToolDescriptor, handler: F) -> Self
    where
        F: Fn(Arc<dyn ToolContext>, Value) -> Fut + Send + Sync + 'static,
        Fut: Future<Output = Result<ToolResponse>> + Send + 'static,
    {
        Self {
            descriptor,
            handler: Box::new(move |ctx, params| Box::pin(handler(ctx, params))),
        }
    }

    pub fn descriptor(&self) -> &ToolDescriptor {
        &self.descriptor
    }
}

impl std::fmt::Debug for FunctionTool {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_tuple("FunctionTool").field(&self.descriptor.name).finish()
    }
}

#[async_trait]
impl Tool for FunctionTool {
    fn name(&self) -> &str {
        &self.descriptor.name
    }

    fn description(&self) -> &str {
        &self.descriptor.description
    }

    fn schema(&self) -> Value {
        self.descriptor.input_schema.clone()
    }

    fn annotations(&self) -> ToolAnnotations {
        self.descriptor.annotations.clone()
    }

    async fn execute(&self, ctx: Arc<dyn ToolContext>, params: Value) -> Result<ToolResponse> {
        (self.handler)(ctx, params).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::context::DefaultToolContext;
    use serde_json::json;

    #[tokio::test]
    async fn test_handler_sees_arguments() {
        let descriptor = ToolDescriptor {
            name: "add".to_string(),
            description: "Adds two numbers".to_string(),
            input_schema: json!({"type": "object", "required": ["x", "y"]}),
            annotations: ToolAnnotations::read_only("Add"),
        };
        let tool = FunctionTool::new(descriptor, |_ctx, params| async move {
            let x = params["x"].as_f64().unwrap_or(0.0);
            let y = params["y"].as_f64().unwrap_or(0.0);
            Ok(ToolResponse::json(json!({"sum": x + y})))
        });

        assert_eq!(tool.name(), "add");
        assert_eq!(tool.schema()["required"], json!(["x", "y"]));
        assert_eq!(tool.annotations().read_only_hint, Some(true));

        let ctx = Arc::new(DefaultToolContext::new("call-1".to_string(), "inv-1".to_string()));
        let response = tool.execute(ctx, json!({"x": 5.0, "y": 3.0})).await.unwrap();
        match response.output {
            opentool_core::ToolOutput::Json { value } => assert_eq!(value["sum"], 8.0),
            other => panic!("unexpected output: {:?}", other),
        }
    }

    #[test]
    fn test_descriptor_round_trips_through_tool() {
        let tool = FunctionTool::new(
            ToolDescriptor::without_arguments("info", "About the API", ToolAnnotations::default()),
            |_ctx, _params| async move { Ok(ToolResponse::text("ok")) },
        );
        assert_eq!(&ToolDescriptor::from_tool(&tool), tool.descriptor());
    }
}
