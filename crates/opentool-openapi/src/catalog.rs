//! Tool catalog construction.

use crate::auth::default_api_key_header;
use crate::error::Result;
use crate::input_schema::build_input_schema;
use crate::meta_tools::{
    TimeResource, describe_descriptor, describe_tool, external_docs_tool, info_tool,
    looks_time_sensitive,
};
use crate::operation_tool::{DEFAULT_BASE_URL, OperationTool, ToolRuntime};
use crate::parser::ApiDocument;
use crate::schema::SchemaSynthesizer;
use crate::types::Operation;
use opentool_core::{Resource, Tool, ToolDescriptor, ToolHost};
use serde::Serialize;
use serde_json::Value;
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, warn};

/// Maps an operation identifier to a tool name
pub type NameFormatter = Arc<dyn Fn(&str) -> String + Send + Sync>;

/// Post-processes a tool's input schema; receives the operation identifier
pub type SchemaHook = Arc<dyn Fn(&str, Value) -> Value + Send + Sync>;

/// Options for one catalog build.
#[derive(Clone)]
pub struct ToolGenOptions {
    pub name_formatter: Option<NameFormatter>,
    /// Only operations sharing at least one of these tags become tools
    pub tag_filter: Vec<String>,
    /// Summarize tools without registering anything
    pub dry_run: bool,
    /// Pretty-print JSON response bodies
    pub pretty: bool,
    pub version: Option<String>,
    pub schema_hook: Option<SchemaHook>,
    /// Hold PUT/POST/PATCH/DELETE calls until the caller confirms
    pub confirm_destructive: bool,
    pub base_url: Option<String>,
    pub timeout: Duration,
}

impl Default for ToolGenOptions {
    fn default() -> Self {
        Self {
            name_formatter: None,
            tag_filter: Vec::new(),
            dry_run: false,
            pretty: false,
            version: None,
            schema_hook: None,
            confirm_destructive: false,
            base_url: None,
            timeout: Duration::from_secs(30),
        }
    }
}

impl std::fmt::Debug for ToolGenOptions {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ToolGenOptions")
            .field("name_formatter", &self.name_formatter.is_some())
            .field("tag_filter", &self.tag_filter)
            .field("dry_run", &self.dry_run)
            .field("pretty", &self.pretty)
            .field("version", &self.version)
            .field("schema_hook", &self.schema_hook.is_some())
            .field("confirm_destructive", &self.confirm_destructive)
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl ToolGenOptions {
    pub fn from_config(config: &opentool_core::GenerationConfig) -> Self {
        Self {
            tag_filter: config.tags.clone(),
            pretty: config.pretty,
            version: config.version.clone(),
            confirm_destructive: config.confirm_destructive,
            base_url: config.base_url.clone(),
            timeout: config.timeout(),
            ..Self::default()
        }
    }

    pub fn with_name_formatter(
        mut self,
        formatter: impl Fn(&str) -> String + Send + Sync + 'static,
    ) -> Self {
        self.name_formatter = Some(Arc::new(formatter));
        self
    }

    pub fn with_schema_hook(
        mut self,
        hook: impl Fn(&str, Value) -> Value + Send + Sync + 'static,
    ) -> Self {
        self.schema_hook = Some(Arc::new(hook));
        self
    }

    fn includes(&self, operation: &Operation) -> bool {
        self.tag_filter.is_empty() || operation.tags.iter().any(|t| self.tag_filter.contains(t))
    }
}

/// Dry-run view of one tool.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolSummary {
    pub name: String,
    pub description: String,
    pub tags: Vec<String>,
    pub input_schema: Value,
}

/// The outcome of a catalog build.
#[derive(Clone, Default)]
pub struct Catalog {
    /// Names registered (or, in a dry run, that would be registered)
    pub tool_names: Vec<String>,
    pub summaries: Vec<ToolSummary>,
    pub tools: Vec<Arc<dyn Tool>>,
    pub resources: Vec<Arc<dyn Resource>>,
    pub diagnostics: Vec<String>,
    pub base_urls: Vec<String>,
}

impl std::fmt::Debug for Catalog {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Catalog")
            .field("tool_names", &self.tool_names)
            .field("resources", &self.resources.len())
            .field("diagnostics", &self.diagnostics)
            .field("base_urls", &self.base_urls)
            .finish()
    }
}

/// Candidate base URLs: override, then document servers, then localhost.
///
/// Server variables take their defaults. Relative server URLs are joined
/// onto the document's source URL when it was fetched, else kept verbatim.
pub fn resolve_base_urls(document: &ApiDocument, override_url: Option<&str>) -> Vec<String> {
    if let Some(url) = override_url.filter(|u| !u.trim().is_empty()) {
        return vec![url.trim_end_matches('/').to_string()];
    }

    let urls: Vec<String> = document
        .servers()
        .iter()
        .map(|server| {
            let mut url = server.url.clone();
            if let Some(variables) = &server.variables {
                for (name, variable) in variables {
                    url = url.replace(&format!("{{{}}}", name), &variable.default);
                }
            }
            match document.source_url() {
                Some(source) if url::Url::parse(&url).is_err() => source
                    .join(&url)
                    .map(|joined| joined.to_string())
                    .unwrap_or(url),
                _ => url,
            }
        })
        .map(|url| url.trim_end_matches('/').to_string())
        .collect();

    if urls.is_empty() {
        vec![DEFAULT_BASE_URL.to_string()]
    } else {
        urls
    }
}

/// Build one tool per included operation, plus meta-tools, and register
/// them with `host` unless this is a dry run.
pub fn build_catalog(
    operations: &[Operation],
    document: &ApiDocument,
    options: &ToolGenOptions,
    host: &dyn ToolHost,
) -> Result<Catalog> {
    let base_urls = resolve_base_urls(document, options.base_url.as_deref());
    debug!(?base_urls, "Resolved base URLs");

    let client = reqwest::Client::builder().timeout(options.timeout).build()?;
    let runtime = Arc::new(ToolRuntime {
        client,
        base_urls: base_urls.clone().into(),
        security_schemes: document.security_schemes().to_vec().into(),
        default_api_key_header: default_api_key_header(document.security_schemes()),
        pretty: options.pretty,
        confirm_destructive: options.confirm_destructive,
    });

    let synthesizer = SchemaSynthesizer::new(document.raw());
    let mut catalog = Catalog {
        base_urls,
        ..Catalog::default()
    };

    let included: Vec<&Operation> = operations.iter().filter(|op| options.includes(op)).collect();
    for operation in included.iter().copied() {
        let operation_id = operation.id();
        let mut input = build_input_schema(
            &operation.parameters,
            operation.request_body.as_ref(),
            &synthesizer,
        );
        catalog.diagnostics.extend(
            input
                .diagnostics
                .drain(..)
                .map(|d| format!("{}: {}", operation_id, d)),
        );

        if let Some(hook) = &options.schema_hook {
            input.schema = hook(&operation_id, input.schema);
        }

        let name = match &options.name_formatter {
            Some(formatter) => formatter(&operation_id),
            None => operation_id.clone(),
        };

        let tool = OperationTool::new(
            name.clone(),
            Arc::new(operation.clone()),
            input,
            runtime.clone(),
        );
        let summary = ToolSummary {
            name: name.clone(),
            description: tool.description().to_string(),
            tags: operation.tags.clone(),
            input_schema: tool.schema(),
        };

        // Same-name tools replace each other, as they do in the registry
        match catalog.tool_names.iter().position(|existing| *existing == name) {
            Some(index) => {
                warn!(tool = %name, operation = %operation_id, "Duplicate tool name replaces an earlier operation");
                catalog
                    .diagnostics
                    .push(format!("{}: tool name '{}' already taken, replacing it", operation_id, name));
                catalog.summaries[index] = summary;
                catalog.tools[index] = Arc::new(tool);
            }
            None => {
                catalog.summaries.push(summary);
                catalog.tool_names.push(name);
                catalog.tools.push(Arc::new(tool));
            }
        }
    }

    if options.dry_run {
        info!("Dry run: {} tools summarized", catalog.summaries.len());
        return Ok(catalog);
    }

    let mut meta: Vec<Arc<dyn Tool>> = vec![Arc::new(info_tool(document, options.version.as_deref()))];
    if let Some(docs) = external_docs_tool(document) {
        meta.push(Arc::new(docs));
    }

    let mut descriptors: Vec<ToolDescriptor> = catalog
        .tools
        .iter()
        .chain(meta.iter())
        .map(|tool| ToolDescriptor::from_tool(tool.as_ref()))
        .collect();
    descriptors.push(describe_descriptor());
    meta.push(Arc::new(describe_tool(descriptors)?));

    for tool in meta {
        catalog.tool_names.push(tool.name().to_string());
        catalog.tools.push(tool);
    }
    for tool in &catalog.tools {
        host.register_tool(tool.clone());
    }

    if looks_time_sensitive(included) {
        let resource: Arc<dyn Resource> = Arc::new(TimeResource);
        host.register_resource(resource.clone());
        catalog.resources.push(resource);
    }

    info!(
        "Registered {} tools ({} diagnostics)",
        catalog.tool_names.len(),
        catalog.diagnostics.len()
    );
    Ok(catalog)
}
