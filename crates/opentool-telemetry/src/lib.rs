//! # OpenTool Telemetry
//!
//! Structured logging and tracing spans for tool execution.
//!
//! Spans carry tool names, call identifiers and argument/response payloads.
//! Credentials never appear in span fields: HTTP spans record the request
//! URL without its query string, and header values are not recorded at all.

mod spans;
mod tracer;

pub use spans::{
    HttpSpanAttributes, ToolSpanAttributes, safe_serialize, safe_serialize_pretty,
    trace_http_exchange, trace_tool_call,
};
pub use tracer::{LogFormat, init_telemetry, try_init_telemetry};

/// Span attribute names.
pub mod attributes {
    pub const OPERATION_NAME: &str = "opentool.operation.name";
    pub const SYSTEM_NAME: &str = "opentool";

    // Tool-specific attributes
    pub const TOOL_NAME: &str = "opentool.tool.name";
    pub const TOOL_DESCRIPTION: &str = "opentool.tool.description";
    pub const TOOL_CALL_ID: &str = "opentool.tool.call_id";
    pub const TOOL_CALL_ARGS: &str = "opentool.tool.call_args";
    pub const TOOL_RESPONSE: &str = "opentool.tool.response";
    pub const TOOL_IS_ERROR: &str = "opentool.tool.is_error";
    pub const INVOCATION_ID: &str = "opentool.invocation_id";

    // HTTP attributes
    pub const HTTP_METHOD: &str = "http.request.method";
    pub const HTTP_URL: &str = "url.full";
    pub const HTTP_STATUS_CODE: &str = "http.response.status_code";
    pub const HTTP_DURATION_MS: &str = "http.duration_ms";
}
