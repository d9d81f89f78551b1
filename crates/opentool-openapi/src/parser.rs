//! OpenAPI document loader.
//!
//! Parses OpenAPI 3.0 documents (JSON or YAML) and extracts the operations
//! that become tools. Parameter, request-body and security-scheme
//! references into `components` are resolved here; schema references are
//! left in place and resolved during schema synthesis.

use crate::auth::SecuritySchemeKind;
use crate::error::{OpenApiError, Result};
use crate::types::{
    ApiParameter, Operation, ParameterLocation, RequestBodySpec, SchemeRef, SecurityRequirement,
};
use openapiv3::{OpenAPI, Parameter, ParameterSchemaOrContent, ReferenceOr};
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, warn};

const MAX_REF_DEPTH: usize = 16;

/// A loaded document: the typed tree plus its raw JSON form.
#[derive(Debug, Clone)]
pub struct ApiDocument {
    spec: OpenAPI,
    raw: Arc<Value>,
    security_schemes: Vec<(String, SecuritySchemeKind)>,
    source_url: Option<url::Url>,
}

impl ApiDocument {
    fn new(spec: OpenAPI, source_url: Option<url::Url>) -> Result<Self> {
        if !spec.openapi.starts_with("3.") {
            return Err(OpenApiError::InvalidSpec(format!(
                "unsupported OpenAPI version '{}', expected 3.x",
                spec.openapi
            )));
        }

        let raw = serde_json::to_value(&spec)?;
        let security_schemes = collect_security_schemes(&spec);

        Ok(Self {
            spec,
            raw: Arc::new(raw),
            security_schemes,
            source_url,
        })
    }

    pub fn spec(&self) -> &OpenAPI {
        &self.spec
    }

    /// The document as JSON, used to resolve schema `$ref`s
    pub fn raw(&self) -> &Value {
        &self.raw
    }

    pub fn info(&self) -> &openapiv3::Info {
        &self.spec.info
    }

    pub fn title(&self) -> &str {
        &self.spec.info.title
    }

    pub fn version(&self) -> &str {
        &self.spec.info.version
    }

    pub fn external_docs(&self) -> Option<&openapiv3::ExternalDocumentation> {
        self.spec.external_docs.as_ref()
    }

    pub fn servers(&self) -> &[openapiv3::Server] {
        &self.spec.servers
    }

    /// Security schemes in document order
    pub fn security_schemes(&self) -> &[(String, SecuritySchemeKind)] {
        &self.security_schemes
    }

    /// URL the document was fetched from, if any
    pub fn source_url(&self) -> Option<&url::Url> {
        self.source_url.as_ref()
    }
}

fn collect_security_schemes(spec: &OpenAPI) -> Vec<(String, SecuritySchemeKind)> {
    let Some(components) = spec.components.as_ref() else {
        return Vec::new();
    };

    components
        .security_schemes
        .iter()
        .filter_map(|(name, scheme_ref)| {
            let resolved = resolve_ref(scheme_ref, "#/components/securitySchemes/", |n| {
                components.security_schemes.get(n)
            });
            match resolved {
                Some(scheme) => Some((name.clone(), SecuritySchemeKind::from_openapi(scheme))),
                None => {
                    warn!(scheme = %name, "Unresolvable security scheme reference");
                    None
                }
            }
        })
        .collect()
}

/// Follow a `$ref` chain inside one components table.
fn resolve_ref<'a, T>(
    item: &'a ReferenceOr<T>,
    prefix: &str,
    lookup: impl Fn(&str) -> Option<&'a ReferenceOr<T>>,
) -> Option<&'a T> {
    let mut current = item;
    for _ in 0..MAX_REF_DEPTH {
        match current {
            ReferenceOr::Item(item) => return Some(item),
            ReferenceOr::Reference { reference } => {
                let name = reference.strip_prefix(prefix)?;
                current = lookup(name)?;
            }
        }
    }
    None
}

/// Parser for OpenAPI documents.
pub struct OpenApiParser {
    document: ApiDocument,
}

impl OpenApiParser {
    /// Load and parse a document from a file.
    ///
    /// `.json` files are read as JSON, everything else as YAML.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)?;

        let spec = if path.extension().is_some_and(|ext| ext == "json") {
            serde_json::from_str(&content)?
        } else {
            serde_yaml::from_str(&content)?
        };

        Ok(Self {
            document: ApiDocument::new(spec, None)?,
        })
    }

    /// Load and parse a document from a URL.
    pub async fn from_url(url: &str) -> Result<Self> {
        let source = url::Url::parse(url)?;
        let response = reqwest::get(source.clone()).await?.error_for_status()?;
        let content = response.text().await?;

        Ok(Self {
            document: ApiDocument::new(parse_content(&content)?, Some(source))?,
        })
    }

    /// Parse a document from a string.
    ///
    /// Automatically detects JSON or YAML format.
    #[allow(clippy::should_implement_trait)]
    pub fn from_str(content: &str) -> Result<Self> {
        Ok(Self {
            document: ApiDocument::new(parse_content(content)?, None)?,
        })
    }

    pub fn document(&self) -> &ApiDocument {
        &self.document
    }

    pub fn into_document(self) -> ApiDocument {
        self.document
    }

    /// Extract all operations in path order.
    pub fn parse(&self) -> Result<Vec<Operation>> {
        let spec = &self.document.spec;
        let mut operations = Vec::new();

        for (path, path_item_ref) in &spec.paths.paths {
            let path_item = match path_item_ref {
                ReferenceOr::Item(item) => item,
                ReferenceOr::Reference { reference } => {
                    warn!(path = %path, reference = %reference, "Path item references are not supported");
                    continue;
                }
            };

            let methods = [
                ("GET", &path_item.get),
                ("PUT", &path_item.put),
                ("POST", &path_item.post),
                ("DELETE", &path_item.delete),
                ("OPTIONS", &path_item.options),
                ("HEAD", &path_item.head),
                ("PATCH", &path_item.patch),
                ("TRACE", &path_item.trace),
            ];

            for (method, operation_opt) in methods {
                if let Some(operation) = operation_opt {
                    operations.push(self.parse_operation(
                        operation,
                        path,
                        method,
                        &path_item.parameters,
                    ));
                }
            }
        }

        debug!("Parsed {} operations", operations.len());
        Ok(operations)
    }

    fn parse_operation(
        &self,
        operation: &openapiv3::Operation,
        path: &str,
        method: &str,
        path_params: &[ReferenceOr<Parameter>],
    ) -> Operation {
        let mut parameters: Vec<ApiParameter> = Vec::new();

        // Operation-level parameters override path-level ones with the same name and location
        for param_ref in path_params.iter().chain(operation.parameters.iter()) {
            let Some(param) = self.resolve_parameter(param_ref) else {
                continue;
            };
            let api_param = convert_parameter(param);
            match parameters
                .iter_mut()
                .find(|p| p.name == api_param.name && p.location == api_param.location)
            {
                Some(existing) => *existing = api_param,
                None => parameters.push(api_param),
            }
        }

        let request_body = operation
            .request_body
            .as_ref()
            .and_then(|body_ref| self.resolve_request_body(body_ref))
            .map(|body| RequestBodySpec {
                content: body
                    .content
                    .iter()
                    .map(|(media_type, media)| {
                        (
                            media_type.clone(),
                            media
                                .schema
                                .as_ref()
                                .and_then(|schema| serde_json::to_value(schema).ok()),
                        )
                    })
                    .collect(),
                required: body.required,
                description: body.description.clone(),
            });

        let security = operation
            .security
            .as_ref()
            .or(self.document.spec.security.as_ref())
            .map(|requirements| {
                requirements
                    .iter()
                    .map(|req| SecurityRequirement {
                        schemes: req
                            .iter()
                            .map(|(name, scopes)| SchemeRef {
                                name: name.clone(),
                                scopes: scopes.clone(),
                            })
                            .collect(),
                    })
                    .collect()
            })
            .unwrap_or_default();

        Operation {
            operation_id: operation.operation_id.clone(),
            summary: operation.summary.clone(),
            description: operation.description.clone(),
            method: method.to_string(),
            path: path.to_string(),
            parameters,
            request_body,
            tags: operation.tags.clone(),
            security,
        }
    }

    fn resolve_parameter<'a>(&'a self, param_ref: &'a ReferenceOr<Parameter>) -> Option<&'a Parameter> {
        let components = self.document.spec.components.as_ref();
        let resolved = resolve_ref(param_ref, "#/components/parameters/", |name| {
            components?.parameters.get(name)
        });
        if resolved.is_none() {
            warn!(reference = ?reference_of(param_ref), "Unresolvable parameter reference");
        }
        resolved
    }

    fn resolve_request_body<'a>(
        &'a self,
        body_ref: &'a ReferenceOr<openapiv3::RequestBody>,
    ) -> Option<&'a openapiv3::RequestBody> {
        let components = self.document.spec.components.as_ref();
        let resolved = resolve_ref(body_ref, "#/components/requestBodies/", |name| {
            components?.request_bodies.get(name)
        });
        if resolved.is_none() {
            warn!(reference = ?reference_of(body_ref), "Unresolvable request body reference");
        }
        resolved
    }
}

fn reference_of<T>(item: &ReferenceOr<T>) -> Option<&str> {
    match item {
        ReferenceOr::Reference { reference } => Some(reference.as_str()),
        ReferenceOr::Item(_) => None,
    }
}

fn parse_content(content: &str) -> Result<OpenAPI> {
    if content.trim_start().starts_with('{') {
        Ok(serde_json::from_str(content)?)
    } else {
        Ok(serde_yaml::from_str(content)?)
    }
}

fn convert_parameter(param: &Parameter) -> ApiParameter {
    let (data, location) = match param {
        Parameter::Query { parameter_data, .. } => (parameter_data, ParameterLocation::Query),
        Parameter::Header { parameter_data, .. } => (parameter_data, ParameterLocation::Header),
        Parameter::Path { parameter_data, .. } => (parameter_data, ParameterLocation::Path),
        Parameter::Cookie { parameter_data, .. } => (parameter_data, ParameterLocation::Cookie),
    };

    let schema = match &data.format {
        ParameterSchemaOrContent::Schema(schema_ref) => serde_json::to_value(schema_ref).ok(),
        ParameterSchemaOrContent::Content(content) => content
            .values()
            .next()
            .and_then(|media| media.schema.as_ref())
            .and_then(|schema| serde_json::to_value(schema).ok()),
    };

    ApiParameter {
        name: data.name.clone(),
        location,
        required: data.required,
        schema,
        description: data.description.clone(),
    }
}
