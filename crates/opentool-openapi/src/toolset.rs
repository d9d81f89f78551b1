//! OpenAPI toolset container.

use crate::catalog::{Catalog, ToolGenOptions, build_catalog};
use crate::error::Result;
use crate::lint::{LintReport, check};
use crate::parser::{ApiDocument, OpenApiParser};
use crate::types::Operation;
use opentool_core::{Tool, ToolContext, ToolResponse};
use opentool_tool::ToolRegistry;
use serde_json::Value;
use std::path::Path;
use std::sync::Arc;
use tracing::{debug, info};

/// Tools generated from an OpenAPI document, registered in their own
/// [`ToolRegistry`].
///
/// # Example
///
/// ```no_run
/// use opentool_openapi::{OpenApiToolset, ToolGenOptions};
/// use opentool_tool::DefaultToolContext;
/// use std::sync::Arc;
///
/// # #[tokio::main]
/// # async fn main() -> anyhow::Result<()> {
/// let toolset = OpenApiToolset::from_file("./api/openapi.yaml", ToolGenOptions::default())?;
/// println!("Generated {} tools", toolset.len());
///
/// let ctx = Arc::new(DefaultToolContext::new("call-1".into(), "inv-1".into()));
/// let result = toolset
///     .call("getPet", ctx, serde_json::json!({"petId": 42}))
///     .await?;
/// println!("{:?}", result.text_content());
/// # Ok(())
/// # }
/// ```
pub struct OpenApiToolset {
    document: ApiDocument,
    operations: Vec<Operation>,
    registry: Arc<ToolRegistry>,
    catalog: Catalog,
}

impl OpenApiToolset {
    /// Load a document from a file; `.json` is parsed as JSON, anything
    /// else as YAML.
    pub fn from_file(path: impl AsRef<Path>, options: ToolGenOptions) -> Result<Self> {
        info!("Loading OpenAPI document from file: {:?}", path.as_ref());
        let parser = OpenApiParser::from_file(path)?;
        Self::from_parser(parser, options)
    }

    /// Fetch a document over HTTP. Relative server URLs resolve against it.
    pub async fn from_url(url: &str, options: ToolGenOptions) -> Result<Self> {
        info!("Loading OpenAPI document from URL: {}", url);
        let parser = OpenApiParser::from_url(url).await?;
        Self::from_parser(parser, options)
    }

    /// Parse an in-memory document, JSON or YAML.
    pub fn from_str(content: &str, options: ToolGenOptions) -> Result<Self> {
        debug!("Parsing OpenAPI document from string");
        let parser = OpenApiParser::from_str(content)?;
        Self::from_parser(parser, options)
    }

    pub fn from_parser(parser: OpenApiParser, options: ToolGenOptions) -> Result<Self> {
        let operations = parser.parse()?;
        info!("Parsed {} operations from OpenAPI document", operations.len());

        let registry = Arc::new(ToolRegistry::new());
        let catalog = build_catalog(&operations, parser.document(), &options, registry.as_ref())?;
        for diagnostic in &catalog.diagnostics {
            debug!("{}", diagnostic);
        }

        Ok(Self {
            document: parser.into_document(),
            operations,
            registry,
            catalog,
        })
    }

    /// Registered tools, sorted by name
    pub fn tools(&self) -> Vec<Arc<dyn Tool>> {
        self.registry.tools()
    }

    pub fn get_tool(&self, name: &str) -> Option<Arc<dyn Tool>> {
        self.registry.get(name)
    }

    pub fn tool_names(&self) -> Vec<String> {
        self.registry.tool_names()
    }

    pub fn len(&self) -> usize {
        self.registry.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registry.is_empty()
    }

    pub fn registry(&self) -> Arc<ToolRegistry> {
        self.registry.clone()
    }

    pub fn catalog(&self) -> &Catalog {
        &self.catalog
    }

    pub fn document(&self) -> &ApiDocument {
        &self.document
    }

    pub fn operations(&self) -> &[Operation] {
        &self.operations
    }

    /// Invoke a tool by name. Unknown names yield a flagged result.
    pub async fn call(
        &self,
        name: &str,
        ctx: Arc<dyn ToolContext>,
        args: Value,
    ) -> opentool_core::Result<ToolResponse> {
        self.registry.call(name, ctx, args).await
    }

    /// Lint the document against the registered tool names.
    pub fn check(&self, detailed: bool) -> LintReport {
        LintReport::new(check(
            &self.document,
            &self.operations,
            &self.tool_names(),
            detailed,
        ))
    }
}

impl std::fmt::Debug for OpenApiToolset {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenApiToolset")
            .field("title", &self.document.title())
            .field("operations", &self.operations.len())
            .field("catalog", &self.catalog)
            .finish()
    }
}
