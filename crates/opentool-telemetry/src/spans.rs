//! Span creation helpers for tool executions and the HTTP exchanges behind them

use crate::attributes::*;

/// Attributes for tracing a tool call
#[derive(Debug, Clone)]
pub struct ToolSpanAttributes {
    pub tool_name: String,
    pub tool_description: String,
    pub tool_call_id: String,
    pub invocation_id: String,
    pub args_json: String,
    pub response_json: String,
    pub is_error: bool,
}

/// Attributes for tracing one outbound HTTP request
#[derive(Debug, Clone)]
pub struct HttpSpanAttributes {
    pub method: String,
    pub url: String,
    pub status: Option<u16>,
    pub duration_ms: u128,
}

/// Record a span for a tool execution.
///
/// The span holds the tool name, call identifiers and the serialized
/// arguments and response so a subscriber can reconstruct the call.
pub fn trace_tool_call(attrs: ToolSpanAttributes) {
    let span = tracing::info_span!(
        "execute_tool",
        { OPERATION_NAME } = "execute_tool",
        { TOOL_NAME } = %attrs.tool_name,
        { TOOL_DESCRIPTION } = %attrs.tool_description,
        { TOOL_CALL_ID } = %attrs.tool_call_id,
        { INVOCATION_ID } = %attrs.invocation_id,
        { TOOL_CALL_ARGS } = %attrs.args_json,
        { TOOL_RESPONSE } = %attrs.response_json,
        { TOOL_IS_ERROR } = attrs.is_error,
    );

    let _guard = span.enter();
}

/// Record a span for an outbound HTTP exchange.
///
/// The query string is dropped from the recorded URL since API keys can
/// travel there.
pub fn trace_http_exchange(attrs: HttpSpanAttributes) {
    let url = strip_query(&attrs.url);
    let span = tracing::debug_span!(
        "http_request",
        { HTTP_METHOD } = %attrs.method,
        { HTTP_URL } = %url,
        { HTTP_STATUS_CODE } = tracing::field::Empty,
        { HTTP_DURATION_MS } = attrs.duration_ms as u64,
    );
    if let Some(status) = attrs.status {
        span.record(HTTP_STATUS_CODE, status);
    }

    let _guard = span.enter();
}

fn strip_query(url: &str) -> &str {
    url.split(['?', '#']).next().unwrap_or(url)
}

/// Helper to safely serialize to JSON string
pub fn safe_serialize<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string(value).unwrap_or_else(|_| "<not serializable>".to_string())
}

/// Helper to safely serialize to pretty JSON string
pub fn safe_serialize_pretty<T: serde::Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| "<not serializable>".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_safe_serialize() {
        let value = serde_json::json!({"test": "value"});
        let result = safe_serialize(&value);
        assert!(result.contains("test"));
        assert!(result.contains("value"));
    }

    #[test]
    fn test_strip_query_drops_secrets() {
        assert_eq!(
            strip_query("https://api.test/pets?api_key=s3cret"),
            "https://api.test/pets"
        );
        assert_eq!(strip_query("https://api.test/pets"), "https://api.test/pets");
    }

    #[test]
    fn test_tool_span_attributes() {
        let attrs = ToolSpanAttributes {
            tool_name: "getPet".to_string(),
            tool_description: "Fetch a pet".to_string(),
            tool_call_id: "call-123".to_string(),
            invocation_id: "inv-123".to_string(),
            args_json: r#"{"petId": 1}"#.to_string(),
            response_json: r#"{"name": "Rex"}"#.to_string(),
            is_error: false,
        };

        trace_tool_call(attrs);
    }

    #[test]
    fn test_http_span_attributes() {
        trace_http_exchange(HttpSpanAttributes {
            method: "GET".to_string(),
            url: "https://api.test/pets/1".to_string(),
            status: Some(200),
            duration_ms: 12,
        });
    }
}
