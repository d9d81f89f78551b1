//! Schema synthesis: document schema nodes to validation-schema fragments.

use serde_json::{Map, Value};
use tracing::{debug, warn};

/// Keywords copied verbatim from a node onto its fragment
const COPIED_KEYWORDS: [&str; 5] = ["format", "description", "enum", "default", "example"];

/// Result of synthesizing one node.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Synthesis {
    pub fragment: Option<Value>,
    /// Non-fatal findings such as partially supported composition keywords
    pub diagnostics: Vec<String>,
}

/// Converts schema nodes into validation-schema fragments.
///
/// `$ref`s are resolved as JSON pointers against the document root. A
/// stack of the references being expanded guards against cycles.
#[derive(Debug, Clone, Copy)]
pub struct SchemaSynthesizer<'a> {
    root: &'a Value,
}

struct Walk {
    stack: Vec<String>,
    diagnostics: Vec<String>,
}

impl<'a> SchemaSynthesizer<'a> {
    pub fn new(root: &'a Value) -> Self {
        Self { root }
    }

    /// Synthesize a fragment. `None` in, `None` out.
    ///
    /// `location` names the node in diagnostics (e.g. "parameter 'id'").
    pub fn synthesize(&self, node: Option<&Value>, location: &str) -> Synthesis {
        let mut walk = Walk {
            stack: Vec::new(),
            diagnostics: Vec::new(),
        };
        let fragment = node.and_then(|node| self.walk(node, location, &mut walk));
        Synthesis {
            fragment,
            diagnostics: walk.diagnostics,
        }
    }

    fn walk(&self, node: &Value, location: &str, walk: &mut Walk) -> Option<Value> {
        let obj = node.as_object()?;

        if let Some(reference) = obj.get("$ref").and_then(Value::as_str) {
            return Some(self.expand_ref(reference, location, walk));
        }

        let mut out = Map::new();

        if let Some(branches) = obj.get("allOf").and_then(Value::as_array) {
            for (i, branch) in branches.iter().enumerate() {
                let branch_location = format!("{}.allOf[{}]", location, i);
                if let Some(Value::Object(fragment)) = self.walk(branch, &branch_location, walk) {
                    merge_into(&mut out, fragment, location);
                }
            }
        }

        for keyword in ["oneOf", "anyOf"] {
            if let Some(alternatives) = obj.get(keyword).and_then(Value::as_array) {
                let synthesized: Vec<Value> = alternatives
                    .iter()
                    .enumerate()
                    .map(|(i, alt)| {
                        let alt_location = format!("{}.{}[{}]", location, keyword, i);
                        self.walk(alt, &alt_location, walk)
                            .unwrap_or_else(|| Value::Object(Map::new()))
                    })
                    .collect();
                out.insert(keyword.to_string(), Value::Array(synthesized));
                note(
                    walk,
                    format!(
                        "{}: {} is only partially supported; alternatives are passed through unresolved",
                        location, keyword
                    ),
                );
            }
        }

        if let Some(discriminator) = obj.get("discriminator") {
            out.insert("discriminator".to_string(), discriminator.clone());
            note(
                walk,
                format!("{}: discriminator is passed through without dispatch", location),
            );
        }

        match obj.get("type") {
            Some(Value::String(ty)) => {
                out.insert("type".to_string(), Value::String(ty.clone()));
            }
            Some(Value::Array(types)) => {
                if let Some(first) = types.first() {
                    out.insert("type".to_string(), first.clone());
                }
            }
            _ => {}
        }

        for keyword in COPIED_KEYWORDS {
            if let Some(value) = obj.get(keyword) {
                out.insert(keyword.to_string(), value.clone());
            }
        }

        if let Some(properties) = obj.get("properties").and_then(Value::as_object) {
            let mut synthesized = match out.remove("properties") {
                Some(Value::Object(existing)) => existing,
                _ => Map::new(),
            };
            for (name, prop) in properties {
                let prop_location = format!("{}.{}", location, name);
                let fragment = self
                    .walk(prop, &prop_location, walk)
                    .unwrap_or_else(|| Value::Object(Map::new()));
                synthesized.insert(name.clone(), fragment);
            }
            out.insert("properties".to_string(), Value::Object(synthesized));
        }

        if let Some(required) = obj.get("required").and_then(Value::as_array) {
            union_required(&mut out, required);
        }

        if let Some(items) = obj.get("items") {
            let items_location = format!("{}[]", location);
            let fragment = self
                .walk(items, &items_location, walk)
                .unwrap_or_else(|| Value::Object(Map::new()));
            out.insert("items".to_string(), fragment);
        }

        let polymorphic = out.contains_key("oneOf") || out.contains_key("anyOf");
        if !out.contains_key("type") && out.contains_key("properties") && !polymorphic {
            out.insert("type".to_string(), Value::String("object".to_string()));
        }

        Some(Value::Object(out))
    }

    fn expand_ref(&self, reference: &str, location: &str, walk: &mut Walk) -> Value {
        let name = reference.rsplit('/').next().unwrap_or(reference).to_string();

        if walk.stack.iter().any(|r| r == reference) {
            debug!(reference = %reference, "Cycle detected during schema synthesis");
            return serde_json::json!({
                "type": "object",
                "description": format!("Circular reference to {}", name),
            });
        }

        let target = reference
            .strip_prefix('#')
            .and_then(|pointer| self.root.pointer(pointer));
        let Some(target) = target else {
            note(
                walk,
                format!("{}: unresolvable reference {}", location, reference),
            );
            return serde_json::json!({
                "description": format!("Unresolved reference to {}", name),
            });
        };

        walk.stack.push(reference.to_string());
        let fragment = self.walk(target, location, walk);
        walk.stack.pop();

        fragment.unwrap_or_else(|| Value::Object(Map::new()))
    }
}

fn note(walk: &mut Walk, diagnostic: String) {
    warn!("{}", diagnostic);
    walk.diagnostics.push(diagnostic);
}

/// Shallow-merge one allOf branch: later keys win, `properties` and
/// `required` are unioned.
fn merge_into(out: &mut Map<String, Value>, branch: Map<String, Value>, location: &str) {
    for (key, value) in branch {
        match (key.as_str(), value) {
            ("properties", Value::Object(props)) => {
                let entry = out
                    .entry("properties")
                    .or_insert_with(|| Value::Object(Map::new()));
                if let Value::Object(existing) = entry {
                    for (name, prop) in props {
                        if existing.insert(name.clone(), prop).is_some() {
                            debug!(location = %location, property = %name, "allOf branch overrides property");
                        }
                    }
                }
            }
            ("required", Value::Array(required)) => union_required(out, &required),
            (_, value) => {
                if let Some(previous) = out.insert(key.clone(), value) {
                    if out.get(&key) != Some(&previous) {
                        debug!(location = %location, key = %key, "allOf branch overrides keyword");
                    }
                }
            }
        }
    }
}

fn union_required(out: &mut Map<String, Value>, required: &[Value]) {
    let entry = out
        .entry("required")
        .or_insert_with(|| Value::Array(Vec::new()));
    if let Value::Array(existing) = entry {
        for name in required {
            if !existing.contains(name) {
                existing.push(name.clone());
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn synthesize(root: &Value, node: Value) -> Synthesis {
        SchemaSynthesizer::new(root).synthesize(Some(&node), "test")
    }

    #[test]
    fn test_none_in_none_out() {
        let root = json!({});
        let result = SchemaSynthesizer::new(&root).synthesize(None, "test");
        assert_eq!(result.fragment, None);
        assert!(result.diagnostics.is_empty());
    }

    #[test]
    fn test_copies_basic_keywords() {
        let root = json!({});
        let result = synthesize(
            &root,
            json!({
                "type": ["string", "null"],
                "format": "date",
                "description": "When",
                "enum": ["2024-01-01"],
                "default": "2024-01-01",
                "pattern": "^\\d+$"
            }),
        );
        let fragment = result.fragment.unwrap();

        assert_eq!(fragment["type"], "string");
        assert_eq!(fragment["format"], "date");
        assert_eq!(fragment["enum"], json!(["2024-01-01"]));
        assert!(fragment.get("pattern").is_none());
    }

    #[test]
    fn test_all_of_later_branch_wins() {
        let root = json!({});
        let result = synthesize(
            &root,
            json!({
                "allOf": [
                    {"type": "object", "description": "first", "properties": {"a": {"type": "string"}, "b": {"type": "string"}}, "required": ["a"]},
                    {"description": "second", "properties": {"b": {"type": "integer"}, "c": {"type": "boolean"}}, "required": ["c"]}
                ]
            }),
        );
        let fragment = result.fragment.unwrap();

        assert_eq!(fragment["description"], "second");
        assert_eq!(fragment["properties"]["a"]["type"], "string");
        assert_eq!(fragment["properties"]["b"]["type"], "integer");
        assert_eq!(fragment["properties"]["c"]["type"], "boolean");
        assert_eq!(fragment["required"], json!(["a", "c"]));
    }

    #[test]
    fn test_one_of_is_kept_with_diagnostic() {
        let root = json!({});
        let result = synthesize(
            &root,
            json!({"oneOf": [{"type": "string"}, {"type": "integer"}]}),
        );
        let fragment = result.fragment.unwrap();

        assert_eq!(fragment["oneOf"][1]["type"], "integer");
        assert!(fragment.get("type").is_none());
        assert_eq!(result.diagnostics.len(), 1);
        assert!(result.diagnostics[0].contains("oneOf"));
    }

    #[test]
    fn test_refs_resolved_and_cycles_cut() {
        let root = json!({
            "components": {"schemas": {
                "Node": {
                    "type": "object",
                    "properties": {
                        "value": {"type": "integer"},
                        "next": {"$ref": "#/components/schemas/Node"}
                    }
                }
            }}
        });
        let result = synthesize(&root, json!({"$ref": "#/components/schemas/Node"}));
        let fragment = result.fragment.unwrap();

        assert_eq!(fragment["properties"]["value"]["type"], "integer");
        assert_eq!(
            fragment["properties"]["next"],
            json!({"type": "object", "description": "Circular reference to Node"})
        );
    }

    #[test]
    fn test_same_ref_twice_is_not_a_cycle() {
        let root = json!({
            "components": {"schemas": {"Tag": {"type": "string"}}}
        });
        let result = synthesize(
            &root,
            json!({
                "type": "object",
                "properties": {
                    "a": {"$ref": "#/components/schemas/Tag"},
                    "b": {"$ref": "#/components/schemas/Tag"}
                }
            }),
        );
        let fragment = result.fragment.unwrap();

        assert_eq!(fragment["properties"]["a"]["type"], "string");
        assert_eq!(fragment["properties"]["b"]["type"], "string");
    }

    #[test]
    fn test_array_items_and_discriminator() {
        let root = json!({});
        let result = synthesize(
            &root,
            json!({
                "type": "array",
                "items": {
                    "discriminator": {"propertyName": "kind"},
                    "anyOf": [{"type": "object"}]
                }
            }),
        );
        let fragment = result.fragment.unwrap();

        assert_eq!(fragment["items"]["discriminator"]["propertyName"], "kind");
        assert_eq!(result.diagnostics.len(), 2);
    }
}
