//! Per-operation input schemas.
//!
//! Every parameter becomes one property keyed by its escaped name; a request
//! body becomes the single `requestBody` property.

use crate::schema::SchemaSynthesizer;
use crate::types::{ApiParameter, ParameterLocation, RequestBodySpec};
use serde_json::{Map, Value, json};
use tracing::warn;

/// Property holding the request body in tool arguments
pub const REQUEST_BODY_PROPERTY: &str = "requestBody";

const REQUEST_BODY_DESCRIPTION: &str = "The JSON request body.";

/// Rewrite a parameter name that is not a valid property identifier.
///
/// Each run of `[`/`]` becomes one `_` and a trailing `_` marks the name as
/// escaped: `filter[name]` becomes `filter_name_`. Underscores already in the
/// name survive. Names without brackets are returned unchanged.
pub fn escape_parameter_name(name: &str) -> String {
    if !name.contains(['[', ']']) {
        return name.to_string();
    }

    let mut escaped = String::with_capacity(name.len() + 1);
    // Adjacent brackets share one underscore; underscores in the name are kept
    let mut after_bracket = false;
    for c in name.chars() {
        if c == '[' || c == ']' {
            if !after_bracket {
                escaped.push('_');
            }
            after_bracket = true;
        } else {
            escaped.push(c);
            after_bracket = false;
        }
    }
    if !after_bracket {
        escaped.push('_');
    }
    escaped
}

/// Escaped property name ↔ original parameter name, for one operation.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParameterNameMap {
    entries: Vec<NameEntry>,
}

#[derive(Debug, Clone, PartialEq, Eq)]
struct NameEntry {
    original: String,
    location: ParameterLocation,
    escaped: String,
}

impl ParameterNameMap {
    /// Build the map, disambiguating collisions with extra underscores.
    ///
    /// `reserved` names (such as `requestBody`) are never handed out.
    pub fn new(parameters: &[ApiParameter], reserved: &[&str]) -> Self {
        let mut entries: Vec<NameEntry> = Vec::with_capacity(parameters.len());
        for param in parameters {
            let mut escaped = escape_parameter_name(&param.name);
            while reserved.contains(&escaped.as_str())
                || entries.iter().any(|e| e.escaped == escaped)
            {
                escaped.push('_');
            }
            entries.push(NameEntry {
                original: param.name.clone(),
                location: param.location,
                escaped,
            });
        }
        Self { entries }
    }

    /// Property name for a parameter; falls back to the raw name
    pub fn escaped<'a>(&'a self, original: &'a str, location: ParameterLocation) -> &'a str {
        self.entries
            .iter()
            .find(|e| e.original == original && e.location == location)
            .map(|e| e.escaped.as_str())
            .unwrap_or(original)
    }

    /// Original parameter name for a property; falls back to the property name
    pub fn original<'a>(&'a self, escaped: &'a str) -> &'a str {
        self.entries
            .iter()
            .find(|e| e.escaped == escaped)
            .map(|e| e.original.as_str())
            .unwrap_or(escaped)
    }

    /// Location of the parameter behind a property
    pub fn location(&self, escaped: &str) -> Option<ParameterLocation> {
        self.entries
            .iter()
            .find(|e| e.escaped == escaped)
            .map(|e| e.location)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// The synthesized argument schema of one operation.
#[derive(Debug, Clone)]
pub struct InputSchema {
    pub schema: Value,
    pub names: ParameterNameMap,
    pub diagnostics: Vec<String>,
}

/// Combine parameter and body schemas into one object schema.
pub fn build_input_schema(
    parameters: &[ApiParameter],
    request_body: Option<&RequestBodySpec>,
    synthesizer: &SchemaSynthesizer<'_>,
) -> InputSchema {
    let reserved: &[&str] = if request_body.is_some() {
        &[REQUEST_BODY_PROPERTY]
    } else {
        &[]
    };
    let names = ParameterNameMap::new(parameters, reserved);

    let mut properties = Map::new();
    let mut required: Vec<Value> = Vec::new();
    let mut diagnostics = Vec::new();

    for param in parameters {
        let location = format!("parameter '{}'", param.name);
        let synthesis = synthesizer.synthesize(param.schema.as_ref(), &location);
        diagnostics.extend(synthesis.diagnostics);

        let Some(mut fragment) = synthesis.fragment else {
            let diagnostic = format!("{} has no schema and was skipped", location);
            warn!("{}", diagnostic);
            diagnostics.push(diagnostic);
            continue;
        };

        if let (Some(description), Value::Object(obj)) = (&param.description, &mut fragment) {
            obj.insert(
                "description".to_string(),
                Value::String(description.clone()),
            );
        }

        let escaped = names.escaped(&param.name, param.location).to_string();
        if param.required {
            required.push(Value::String(escaped.clone()));
        }
        properties.insert(escaped, fragment);
    }

    if let Some(body) = request_body {
        let (media_type, body_schema) = match body.primary() {
            Some((media_type, schema)) => (Some(media_type), schema),
            None => (None, None),
        };
        if let Some(media_type) = media_type {
            if body.json_media_type().is_none() {
                let diagnostic = format!(
                    "request body media type '{}' is not JSON; schema is best effort",
                    media_type
                );
                warn!("{}", diagnostic);
                diagnostics.push(diagnostic);
            }
        }

        let synthesis = synthesizer.synthesize(body_schema, "requestBody");
        diagnostics.extend(synthesis.diagnostics);

        let mut fragment = match synthesis.fragment {
            Some(Value::Object(obj)) => obj,
            _ => Map::new(),
        };
        fragment.insert(
            "description".to_string(),
            Value::String(REQUEST_BODY_DESCRIPTION.to_string()),
        );
        properties.insert(REQUEST_BODY_PROPERTY.to_string(), Value::Object(fragment));

        if body.required {
            required.push(Value::String(REQUEST_BODY_PROPERTY.to_string()));
        }
    }

    let mut schema = json!({
        "type": "object",
        "properties": properties,
    });
    if !required.is_empty() {
        schema["required"] = Value::Array(required);
    }

    InputSchema {
        schema,
        names,
        diagnostics,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn param(name: &str, location: ParameterLocation, required: bool, schema: Option<Value>) -> ApiParameter {
        ApiParameter {
            name: name.to_string(),
            location,
            required,
            schema,
            description: None,
        }
    }

    #[test]
    fn test_escape_parameter_name() {
        assert_eq!(escape_parameter_name("filter[name]"), "filter_name_");
        assert_eq!(escape_parameter_name("page[size][max]"), "page_size_max_");
        assert_eq!(escape_parameter_name("ids[]"), "ids_");
        assert_eq!(escape_parameter_name("a[b]c"), "a_b_c_");
        assert_eq!(escape_parameter_name("plain_name"), "plain_name");
        assert_eq!(escape_parameter_name("a__b[c]"), "a__b_c_");
        assert_eq!(escape_parameter_name("x_[y]"), "x__y_");
        assert_ne!(escape_parameter_name("x_[y]"), escape_parameter_name("x[y]"));
    }

    #[test]
    fn test_name_map_round_trip() {
        let params = vec![
            param("filter[name]", ParameterLocation::Query, false, None),
            param("filter_name_", ParameterLocation::Query, false, None),
            param("id", ParameterLocation::Path, true, None),
        ];
        let names = ParameterNameMap::new(&params, &[]);

        for p in &params {
            let escaped = names.escaped(&p.name, p.location);
            assert_eq!(names.original(escaped), p.name);
        }
        assert_eq!(names.escaped("filter_name_", ParameterLocation::Query), "filter_name__");
        assert_eq!(names.original("unknown"), "unknown");
    }

    #[test]
    fn test_required_matches_parameters_and_body() {
        let root = json!({});
        let synthesizer = SchemaSynthesizer::new(&root);
        let params = vec![
            param("filter[name]", ParameterLocation::Query, true, Some(json!({"type": "string"}))),
            param("limit", ParameterLocation::Query, false, Some(json!({"type": "integer"}))),
        ];
        let body = RequestBodySpec {
            content: vec![(
                "application/json".to_string(),
                Some(json!({"type": "object", "properties": {"name": {"type": "string"}}})),
            )],
            required: true,
            description: None,
        };

        let input = build_input_schema(&params, Some(&body), &synthesizer);

        assert_eq!(input.schema["required"], json!(["filter_name_", "requestBody"]));
        assert_eq!(
            input.schema["properties"]["requestBody"]["description"],
            "The JSON request body."
        );
        assert_eq!(
            input.schema["properties"]["requestBody"]["properties"]["name"]["type"],
            "string"
        );
    }

    #[test]
    fn test_no_parameters_no_required_key() {
        let root = json!({});
        let synthesizer = SchemaSynthesizer::new(&root);
        let input = build_input_schema(&[], None, &synthesizer);

        assert_eq!(input.schema, json!({"type": "object", "properties": {}}));
    }

    #[test]
    fn test_parameter_without_schema_is_skipped() {
        let root = json!({});
        let synthesizer = SchemaSynthesizer::new(&root);
        let params = vec![param("x", ParameterLocation::Header, true, None)];
        let input = build_input_schema(&params, None, &synthesizer);

        assert!(input.schema["properties"].get("x").is_none());
        assert!(input.schema.get("required").is_none());
        assert_eq!(input.diagnostics.len(), 1);
    }

    #[test]
    fn test_non_json_body_is_best_effort() {
        let root = json!({});
        let synthesizer = SchemaSynthesizer::new(&root);
        let body = RequestBodySpec {
            content: vec![("text/plain".to_string(), Some(json!({"type": "string"})))],
            required: false,
            description: None,
        };
        let input = build_input_schema(&[], Some(&body), &synthesizer);

        assert_eq!(input.schema["properties"]["requestBody"]["type"], "string");
        assert!(input.schema.get("required").is_none());
        assert!(input.diagnostics[0].contains("text/plain"));
    }
}
