//! Remediation-oriented explanations of failed calls, keyed by status.

use crate::auth::SecuritySchemeKind;
use crate::input_schema::ParameterNameMap;
use crate::request::format_parameter_value;
use crate::types::{Operation, ParameterLocation};
use crate::validation::example_arguments;
use opentool_core::{API_KEY_ENV, BASIC_AUTH_ENV, BEARER_TOKEN_ENV};
use serde::Serialize;
use serde_json::Value;
use std::fmt::Write as _;

/// Backoff schedule recommended for retryable failures
const RETRY_DELAYS_SECS: [u64; 3] = [1, 2, 4];

/// Inputs of one narrative.
pub struct NarrativeContext<'a> {
    pub tool_name: &'a str,
    pub operation: &'a Operation,
    pub input_schema: &'a Value,
    pub names: &'a ParameterNameMap,
    pub arguments: &'a Value,
    pub security_schemes: &'a [(String, SecuritySchemeKind)],
}

/// Explain a non-2xx status and how to recover.
pub fn narrate(ctx: &NarrativeContext<'_>, status: u16, body: &str) -> String {
    match status {
        400 | 422 => bad_request(ctx, status),
        401 | 403 => unauthorized(ctx, status),
        404 => not_found(ctx),
        429 => format!(
            "The API rate limit was exceeded (429). {}",
            backoff_advice()
        ),
        500..=599 => server_error(status, body),
        _ => format!(
            "The API answered {} {} with status {}. Check the arguments against `schema {}` and the response body below.",
            ctx.operation.method, ctx.operation.path, status, ctx.tool_name
        ),
    }
}

/// `{"id": 123}` style JSON: compact, with a space after `:` and `,`
pub fn compact_json(value: &Value) -> String {
    let mut buf = Vec::new();
    let mut serializer = serde_json::Serializer::with_formatter(&mut buf, SpacedFormatter);
    if value.serialize(&mut serializer).is_err() {
        return value.to_string();
    }
    String::from_utf8(buf).unwrap_or_else(|_| value.to_string())
}

struct SpacedFormatter;

impl serde_json::ser::Formatter for SpacedFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> std::io::Result<()>
    where
        W: ?Sized + std::io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> std::io::Result<()>
    where
        W: ?Sized + std::io::Write,
    {
        if first { Ok(()) } else { writer.write_all(b", ") }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> std::io::Result<()>
    where
        W: ?Sized + std::io::Write,
    {
        writer.write_all(b": ")
    }
}

/// `call <tool> {...}` with an example argument set
pub fn example_call(tool_name: &str, input_schema: &Value) -> String {
    format!(
        "call {} {}",
        tool_name,
        compact_json(&example_arguments(input_schema))
    )
}

fn backoff_advice() -> String {
    let delays: Vec<String> = RETRY_DELAYS_SECS.iter().map(|d| format!("{}s", d)).collect();
    format!(
        "Retry with exponential backoff: at most {} retries, waiting {} between attempts.",
        RETRY_DELAYS_SECS.len(),
        delays.join(", ")
    )
}

fn bad_request(ctx: &NarrativeContext<'_>, status: u16) -> String {
    let mut text = format!(
        "The API rejected the arguments as invalid ({}).\n",
        status
    );

    let properties = ctx
        .input_schema
        .get("properties")
        .and_then(Value::as_object);
    let required: Vec<&str> = ctx
        .input_schema
        .get("required")
        .and_then(Value::as_array)
        .map(|r| r.iter().filter_map(Value::as_str).collect())
        .unwrap_or_default();

    if let Some(properties) = properties {
        let (req, opt): (Vec<_>, Vec<_>) = properties
            .iter()
            .partition(|(name, _)| required.contains(&name.as_str()));

        for (heading, group) in [("Required parameters", req), ("Optional parameters", opt)] {
            if group.is_empty() {
                continue;
            }
            let _ = writeln!(text, "\n{}:", heading);
            for (name, schema) in group {
                let _ = writeln!(text, "- {}", describe_property(ctx, name, schema));
            }
        }
    }

    let _ = write!(
        text,
        "\nCorrected example: {}",
        example_call(ctx.tool_name, ctx.input_schema)
    );
    text
}

fn describe_property(ctx: &NarrativeContext<'_>, name: &str, schema: &Value) -> String {
    let ty = schema
        .get("type")
        .and_then(Value::as_str)
        .unwrap_or("any");
    let location = ctx
        .names
        .location(name)
        .map(|l| l.to_string())
        .unwrap_or_else(|| "body".to_string());

    let mut line = format!("{} ({}, {})", name, ty, location);
    if let Some(values) = schema.get("enum").and_then(Value::as_array) {
        let values: Vec<String> = values.iter().map(compact_json).collect();
        let _ = write!(line, ", one of: {}", values.join(", "));
    }
    if let Some(description) = schema.get("description").and_then(Value::as_str) {
        let _ = write!(line, ": {}", description);
    }
    line
}

fn unauthorized(ctx: &NarrativeContext<'_>, status: u16) -> String {
    let mut text = if status == 401 {
        "Authentication failed (401): the credentials are missing or were not accepted.\n".to_string()
    } else {
        "Access was denied (403): the credentials lack permission for this operation.\n".to_string()
    };

    let applicable: Vec<String> = ctx
        .operation
        .security
        .iter()
        .flat_map(|req| req.schemes.iter())
        .map(|scheme_ref| {
            let kind = ctx
                .security_schemes
                .iter()
                .find(|(name, _)| name == &scheme_ref.name)
                .map(|(_, kind)| kind.describe())
                .unwrap_or_else(|| "undeclared scheme".to_string());
            if scheme_ref.scopes.is_empty() {
                format!("- {}: {}", scheme_ref.name, kind)
            } else {
                format!(
                    "- {}: {} (scopes: {})",
                    scheme_ref.name,
                    kind,
                    scheme_ref.scopes.join(", ")
                )
            }
        })
        .collect();

    if applicable.is_empty() {
        text.push_str("\nThe document declares no security requirement for this operation.\n");
    } else {
        text.push_str("\nAccepted security schemes:\n");
        for line in applicable {
            let _ = writeln!(text, "{}", line);
        }
    }

    let _ = write!(
        text,
        "\nProvide credentials through {} (API key), {} (bearer token) or {} (user:pass).",
        API_KEY_ENV, BEARER_TOKEN_ENV, BASIC_AUTH_ENV
    );
    text
}

fn not_found(ctx: &NarrativeContext<'_>) -> String {
    let mut text = format!(
        "The resource was not found (404) at {} {}.\n",
        ctx.operation.method, ctx.operation.path
    );

    let path_params: Vec<_> = ctx
        .operation
        .parameters_in(ParameterLocation::Path)
        .collect();
    if path_params.is_empty() {
        text.push_str("\nThis operation has no path parameters; check the base URL and the path.");
        return text;
    }

    text.push_str("\nPath parameters used:\n");
    for param in path_params {
        let escaped = ctx.names.escaped(&param.name, param.location);
        let supplied = ctx
            .arguments
            .get(escaped)
            .or_else(|| ctx.arguments.get(&param.name))
            .map(format_parameter_value)
            .unwrap_or_else(|| "(not supplied)".to_string());
        let _ = writeln!(text, "- {} = {}", param.name, supplied);
    }
    text.push_str("\nVerify these identifiers exist, for example with a list operation, and retry.");
    text
}

fn server_error(status: u16, body: &str) -> String {
    let kind = match status {
        500 => "an internal server error (500)",
        502 => "a bad gateway error (502): an upstream server returned an invalid response",
        503 => "service unavailable (503): the server is overloaded or down for maintenance",
        504 => "a gateway timeout (504): an upstream server did not answer in time",
        _ => "a server error",
    };
    let mut text = format!("The API reported {}. {}", kind, backoff_advice());
    if body.trim().is_empty() {
        text.push_str(" The server sent no details.");
    }
    if status != 500 && !(502..=504).contains(&status) {
        let _ = write!(text, " (status {})", status);
    }
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{ApiParameter, SchemeRef, SecurityRequirement};
    use serde_json::json;

    fn operation() -> Operation {
        Operation {
            operation_id: Some("getPet".to_string()),
            summary: None,
            description: None,
            method: "GET".to_string(),
            path: "/pets/{petId}".to_string(),
            parameters: vec![
                ApiParameter {
                    name: "petId".to_string(),
                    location: ParameterLocation::Path,
                    required: true,
                    schema: Some(json!({"type": "integer"})),
                    description: None,
                },
                ApiParameter {
                    name: "status".to_string(),
                    location: ParameterLocation::Query,
                    required: false,
                    schema: Some(json!({"type": "string", "enum": ["a", "b"]})),
                    description: None,
                },
            ],
            request_body: None,
            tags: vec![],
            security: vec![SecurityRequirement {
                schemes: vec![SchemeRef {
                    name: "bearerAuth".to_string(),
                    scopes: vec![],
                }],
            }],
        }
    }

    fn input_schema() -> Value {
        json!({
            "type": "object",
            "properties": {
                "petId": {"type": "integer"},
                "status": {"type": "string", "enum": ["a", "b"]}
            },
            "required": ["petId"]
        })
    }

    fn narrate_with(status: u16, arguments: Value) -> String {
        let op = operation();
        let schema = input_schema();
        let names = ParameterNameMap::new(&op.parameters, &[]);
        let schemes = vec![("bearerAuth".to_string(), SecuritySchemeKind::Bearer)];
        let ctx = NarrativeContext {
            tool_name: "getPet",
            operation: &op,
            input_schema: &schema,
            names: &names,
            arguments: &arguments,
            security_schemes: &schemes,
        };
        narrate(&ctx, status, "")
    }

    #[test]
    fn test_compact_json_spacing() {
        assert_eq!(compact_json(&json!({"id": 123})), r#"{"id": 123}"#);
        assert_eq!(compact_json(&json!([1, {"a": "b"}])), r#"[1, {"a": "b"}]"#);
    }

    #[test]
    fn test_bad_request_lists_parameters_and_example() {
        let text = narrate_with(422, json!({}));
        assert!(text.contains("Required parameters:\n- petId (integer, path)"));
        assert!(text.contains("status (string, query), one of: \"a\", \"b\""));
        assert!(text.contains(r#"call getPet {"petId": 123}"#));
    }

    #[test]
    fn test_unauthorized_names_schemes_and_env() {
        let text = narrate_with(401, json!({}));
        assert!(text.contains("bearerAuth: HTTP bearer token"));
        assert!(text.contains("OPENTOOL_API_KEY"));
        assert!(text.contains("OPENTOOL_BEARER_TOKEN"));
        assert!(text.contains("OPENTOOL_BASIC_AUTH"));
    }

    #[test]
    fn test_not_found_lists_path_values() {
        let text = narrate_with(404, json!({"petId": 42.0}));
        assert!(text.contains("- petId = 42"));
    }

    #[test]
    fn test_server_errors_recommend_backoff() {
        let text = narrate_with(503, json!({}));
        assert!(text.contains("service unavailable"));
        assert!(text.contains("at most 3 retries"));
        assert!(text.contains("1s, 2s, 4s"));
    }

    #[test]
    fn test_generic_status() {
        let text = narrate_with(409, json!({}));
        assert!(text.contains("status 409"));
    }
}
