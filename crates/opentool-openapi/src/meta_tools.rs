//! Fixed tools and resources registered next to the operation tools.

use crate::parser::ApiDocument;
use crate::types::Operation;
use async_trait::async_trait;
use opentool_core::{Resource, ToolAnnotations, ToolDescriptor, ToolResponse};
use opentool_tool::FunctionTool;
use serde_json::{Value, json};
use std::sync::Arc;

pub const INFO_TOOL: &str = "info";
pub const EXTERNAL_DOCS_TOOL: &str = "externalDocs";
pub const DESCRIBE_TOOL: &str = "describe";
pub const TIME_RESOURCE_URI: &str = "time://now";

const TIME_NAME_HINTS: [&str; 8] = [
    "date", "time", "timestamp", "since", "until", "created", "updated", "expires",
];
const TIME_FORMATS: [&str; 3] = ["date", "date-time", "time"];

/// A no-argument tool that always answers with `payload`.
fn fixed_json_tool(descriptor: ToolDescriptor, payload: Value) -> FunctionTool {
    let payload = Arc::new(payload);
    FunctionTool::new(descriptor, move |_ctx, _params| {
        let payload = payload.clone();
        async move { Ok(ToolResponse::json((*payload).clone())) }
    })
}

/// `info`: title, version, description and terms of service.
pub fn info_tool(document: &ApiDocument, version_tag: Option<&str>) -> FunctionTool {
    let info = document.info();
    let mut payload = json!({
        "title": info.title,
        "version": info.version,
        "description": info.description,
        "termsOfService": info.terms_of_service,
    });
    if let Some(tag) = version_tag {
        payload["toolsetVersion"] = Value::String(tag.to_string());
    }

    let descriptor = ToolDescriptor::without_arguments(
        INFO_TOOL,
        format!("Show information about the {} API.", info.title),
        ToolAnnotations::read_only("API information"),
    );
    fixed_json_tool(descriptor, payload)
}

/// `externalDocs`, only when the document links external documentation.
pub fn external_docs_tool(document: &ApiDocument) -> Option<FunctionTool> {
    let docs = document.external_docs()?;
    let descriptor = ToolDescriptor::without_arguments(
        EXTERNAL_DOCS_TOOL,
        "Show the API's external documentation link.",
        ToolAnnotations::read_only("External documentation"),
    );
    Some(fixed_json_tool(
        descriptor,
        json!({"url": docs.url, "description": docs.description}),
    ))
}

/// Descriptor the `describe` tool reports for itself.
pub fn describe_descriptor() -> ToolDescriptor {
    ToolDescriptor::without_arguments(
        DESCRIBE_TOOL,
        "Describe every available tool: name, description, input schema and annotations.",
        ToolAnnotations::read_only("Describe tools"),
    )
}

/// `describe`: a snapshot of the catalog taken when it was built.
pub fn describe_tool(descriptors: Vec<ToolDescriptor>) -> opentool_core::Result<FunctionTool> {
    let tools = serde_json::to_value(&descriptors).map_err(anyhow::Error::from)?;
    Ok(fixed_json_tool(describe_descriptor(), json!({ "tools": tools })))
}

/// True if any parameter of any operation looks time-relevant.
pub fn looks_time_sensitive<'a>(operations: impl IntoIterator<Item = &'a Operation>) -> bool {
    operations
        .into_iter()
        .flat_map(|op| op.parameters.iter())
        .any(|param| {
            let name = param.name.to_ascii_lowercase();
            let by_name = TIME_NAME_HINTS.iter().any(|hint| name.contains(hint));
            let by_format = param
                .schema
                .as_ref()
                .and_then(|s| s.get("format"))
                .and_then(Value::as_str)
                .is_some_and(|format| TIME_FORMATS.contains(&format));
            by_name || by_format
        })
}

/// `time://now`: the current time, so agents can fill date parameters.
#[derive(Debug, Default)]
pub struct TimeResource;

#[async_trait]
impl Resource for TimeResource {
    fn uri(&self) -> &str {
        TIME_RESOURCE_URI
    }

    fn name(&self) -> &str {
        "Current time"
    }

    fn description(&self) -> &str {
        "The current time in UTC, for filling date and time parameters."
    }

    async fn read(&self) -> opentool_core::Result<Value> {
        let now = chrono::Utc::now();
        Ok(json!({
            "unix": now.timestamp(),
            "iso8601": now.to_rfc3339_opts(chrono::SecondsFormat::Secs, true),
            "timezone": "UTC",
        }))
    }
}
