//! Data structures for extracted OpenAPI operations.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One HTTP-reachable capability extracted from the document.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Operation {
    /// `operationId` as declared; `None` when the document omits it
    pub operation_id: Option<String>,
    pub summary: Option<String>,
    pub description: Option<String>,
    /// Upper-case HTTP method
    pub method: String,
    /// Path template (e.g. "/pets/{petId}")
    pub path: String,
    /// Path-level and operation-level parameters, merged
    pub parameters: Vec<ApiParameter>,
    pub request_body: Option<RequestBodySpec>,
    pub tags: Vec<String>,
    /// Operation-level security, or the document default
    pub security: Vec<SecurityRequirement>,
}

impl Operation {
    /// Identifier used as the default tool name.
    ///
    /// Falls back to `method_path` (e.g. `get_pets_petId`) when the
    /// document omits `operationId`.
    pub fn id(&self) -> String {
        match self.operation_id.as_deref() {
            Some(id) if !id.trim().is_empty() => id.to_string(),
            _ => generate_operation_id(&self.method, &self.path),
        }
    }

    pub fn has_operation_id(&self) -> bool {
        self.operation_id
            .as_deref()
            .is_some_and(|id| !id.trim().is_empty())
    }

    /// Description shown to the calling agent
    pub fn display_description(&self) -> String {
        self.description
            .as_deref()
            .or(self.summary.as_deref())
            .filter(|s| !s.trim().is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| format!("{} {}", self.method, self.path))
    }

    /// PUT, POST, PATCH and DELETE change server state
    pub fn is_mutating(&self) -> bool {
        matches!(self.method.as_str(), "PUT" | "POST" | "PATCH" | "DELETE")
    }

    pub fn parameters_in(&self, location: ParameterLocation) -> impl Iterator<Item = &ApiParameter> {
        self.parameters
            .iter()
            .filter(move |p| p.location == location)
    }
}

fn generate_operation_id(method: &str, path: &str) -> String {
    let path_parts: Vec<String> = path
        .split('/')
        .filter(|s| !s.is_empty())
        .map(|s| s.trim_start_matches('{').trim_end_matches('}').to_string())
        .collect();

    let path_str = if path_parts.is_empty() {
        "root".to_string()
    } else {
        path_parts.join("_")
    };

    format!("{}_{}", method.to_lowercase(), path_str)
}

/// Represents a parameter in an API operation.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ApiParameter {
    /// Name as declared in the document
    pub name: String,
    pub location: ParameterLocation,
    pub required: bool,
    /// Raw schema node; may be a `$ref`
    pub schema: Option<Value>,
    pub description: Option<String>,
}

/// Location where a parameter appears in the request.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash)]
#[serde(rename_all = "lowercase")]
pub enum ParameterLocation {
    /// Path parameter (e.g., /users/{id})
    Path,
    /// Query parameter (e.g., ?search=value)
    Query,
    /// Header parameter (e.g., X-Custom-Header)
    Header,
    /// Cookie parameter
    Cookie,
}

impl std::fmt::Display for ParameterLocation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParameterLocation::Path => write!(f, "path"),
            ParameterLocation::Query => write!(f, "query"),
            ParameterLocation::Header => write!(f, "header"),
            ParameterLocation::Cookie => write!(f, "cookie"),
        }
    }
}

/// Request body of an operation, schemas keyed by media type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RequestBodySpec {
    /// Media types in document order with their raw schema nodes
    pub content: Vec<(String, Option<Value>)>,
    pub required: bool,
    pub description: Option<String>,
}

impl RequestBodySpec {
    /// First JSON-compatible media type declared for the body
    pub fn json_media_type(&self) -> Option<&str> {
        self.content
            .iter()
            .map(|(media, _)| media.as_str())
            .find(|media| is_json_media_type(media))
    }

    /// Media type and schema used for synthesis: JSON first, else the first declared
    pub fn primary(&self) -> Option<(&str, Option<&Value>)> {
        let entry = self
            .content
            .iter()
            .find(|(media, _)| is_json_media_type(media))
            .or_else(|| self.content.first())?;
        Some((entry.0.as_str(), entry.1.as_ref()))
    }
}

/// `application/json`, `application/vnd.api+json` and any other `+json` type
pub fn is_json_media_type(media_type: &str) -> bool {
    let essence = media_type
        .split(';')
        .next()
        .unwrap_or(media_type)
        .trim()
        .to_ascii_lowercase();
    essence == "application/json" || essence.ends_with("+json")
}

/// One alternative of an operation's security: any listed scheme satisfies it.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SecurityRequirement {
    pub schemes: Vec<SchemeRef>,
}

/// Reference to a named entry of `components.securitySchemes`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SchemeRef {
    pub name: String,
    /// Required scopes (for OAuth2)
    pub scopes: Vec<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn operation(method: &str, path: &str, id: Option<&str>) -> Operation {
        Operation {
            operation_id: id.map(str::to_string),
            summary: None,
            description: None,
            method: method.to_string(),
            path: path.to_string(),
            parameters: vec![],
            request_body: None,
            tags: vec![],
            security: vec![],
        }
    }

    #[test]
    fn test_generated_id_when_missing() {
        let op = operation("GET", "/pets/{petId}", None);
        assert_eq!(op.id(), "get_pets_petId");
        assert!(!op.has_operation_id());

        let root = operation("POST", "/", Some("  "));
        assert_eq!(root.id(), "post_root");
    }

    #[test]
    fn test_mutating_verbs() {
        assert!(operation("PATCH", "/a", None).is_mutating());
        assert!(operation("DELETE", "/a", None).is_mutating());
        assert!(!operation("GET", "/a", None).is_mutating());
    }

    #[test]
    fn test_json_media_types() {
        assert!(is_json_media_type("application/json; charset=utf-8"));
        assert!(is_json_media_type("application/vnd.api+json"));
        assert!(!is_json_media_type("multipart/form-data"));
    }

    #[test]
    fn test_description_falls_back_to_method_and_path() {
        let mut op = operation("GET", "/foo", Some("getFoo"));
        assert_eq!(op.display_description(), "GET /foo");
        op.summary = Some("Fetch foo".to_string());
        assert_eq!(op.display_description(), "Fetch foo");
    }
}
