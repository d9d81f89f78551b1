//! Argument validation and example synthesis.

use jsonschema::error::ValidationErrorKind;
use serde_json::{Map, Value};
use tracing::warn;

/// Category of a schema violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ViolationKind {
    MissingRequired,
    WrongType,
    EnumMismatch,
    UnionMismatch,
    Other,
}

/// One schema violation, phrased for the calling agent.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Violation {
    pub kind: ViolationKind,
    /// Dotted argument path (`arguments` for the root)
    pub path: String,
    pub message: String,
}

/// Validate `arguments` against an input schema.
///
/// A schema that cannot be compiled validates nothing; that case is
/// logged rather than reported against the caller.
pub fn validate_arguments(schema: &Value, arguments: &Value) -> Vec<Violation> {
    let validator = match jsonschema::validator_for(schema) {
        Ok(validator) => validator,
        Err(e) => {
            warn!("Input schema could not be compiled, skipping validation: {}", e);
            return Vec::new();
        }
    };

    validator
        .iter_errors(arguments)
        .map(|error| {
            let path = display_path(&error.instance_path.to_string());
            let (kind, message) = match &error.kind {
                ValidationErrorKind::Required { property } => {
                    let name = property
                        .as_str()
                        .map(str::to_string)
                        .unwrap_or_else(|| property.to_string());
                    let name = if path == "arguments" {
                        name
                    } else {
                        format!("{}.{}", path, name)
                    };
                    (
                        ViolationKind::MissingRequired,
                        format!("Missing required parameter '{}'.", name),
                    )
                }
                ValidationErrorKind::Type { .. } => (
                    ViolationKind::WrongType,
                    format!("Parameter '{}' has the wrong type: {}.", path, error),
                ),
                ValidationErrorKind::Enum { .. } => (
                    ViolationKind::EnumMismatch,
                    format!("Parameter '{}' is not one of the allowed values: {}.", path, error),
                ),
                ValidationErrorKind::OneOfNotValid { .. }
                | ValidationErrorKind::OneOfMultipleValid { .. }
                | ValidationErrorKind::AnyOf { .. } => (
                    ViolationKind::UnionMismatch,
                    format!(
                        "Parameter '{}' does not match exactly one of the allowed alternatives.",
                        path
                    ),
                ),
                _ => (
                    ViolationKind::Other,
                    format!("Parameter '{}' is invalid: {}.", path, error),
                ),
            };
            Violation {
                kind,
                path,
                message,
            }
        })
        .collect()
}

fn display_path(pointer: &str) -> String {
    let trimmed = pointer.trim_start_matches('/');
    if trimmed.is_empty() {
        "arguments".to_string()
    } else {
        trimmed.replace('/', ".")
    }
}

/// One value that satisfies `schema`.
///
/// Prefers the schema's own `example`, then `default`, then the first
/// `enum` entry; otherwise derives a value from the type. Objects include
/// only their required properties.
pub fn example_value(schema: &Value) -> Value {
    let Some(obj) = schema.as_object() else {
        return Value::String("value".to_string());
    };

    if let Some(example) = obj.get("example") {
        return example.clone();
    }
    if let Some(default) = obj.get("default") {
        return default.clone();
    }
    if let Some(first) = obj.get("enum").and_then(Value::as_array).and_then(|e| e.first()) {
        return first.clone();
    }
    for keyword in ["oneOf", "anyOf"] {
        if let Some(first) = obj.get(keyword).and_then(Value::as_array).and_then(|a| a.first()) {
            return example_value(first);
        }
    }

    match obj.get("type").and_then(Value::as_str) {
        Some("string") => Value::String(string_example(obj.get("format").and_then(Value::as_str))),
        Some("integer") => Value::from(123),
        Some("number") => Value::from(1.5),
        Some("boolean") => Value::Bool(true),
        Some("null") => Value::Null,
        Some("array") => {
            let item = obj
                .get("items")
                .map(example_value)
                .unwrap_or_else(|| Value::String("value".to_string()));
            Value::Array(vec![item])
        }
        Some("object") => example_arguments(schema),
        _ if obj.contains_key("properties") => example_arguments(schema),
        _ => Value::String("value".to_string()),
    }
}

fn string_example(format: Option<&str>) -> String {
    match format {
        Some("date") => "2024-01-01",
        Some("date-time") => "2024-01-01T00:00:00Z",
        Some("time") => "12:00:00",
        Some("email") => "user@example.com",
        Some("uuid") => "123e4567-e89b-12d3-a456-426614174000",
        Some("uri") | Some("url") => "https://example.com",
        _ => "string",
    }
    .to_string()
}

/// Example object for an object schema, holding its required properties.
pub fn example_arguments(schema: &Value) -> Value {
    let properties = schema.get("properties").and_then(Value::as_object);
    let mut example = Map::new();

    if let Some(required) = schema.get("required").and_then(Value::as_array) {
        for name in required.iter().filter_map(Value::as_str) {
            let value = properties
                .and_then(|props| props.get(name))
                .map(example_value)
                .unwrap_or_else(|| Value::String("value".to_string()));
            example.insert(name.to_string(), value);
        }
    }

    Value::Object(example)
}
