//! # OpenTool OpenAPI engine
//!
//! Turns the operations of an OpenAPI 3.x document into callable tools.
//!
//! ## Features
//!
//! - Parse OpenAPI 3.x documents (JSON and YAML, from a file, URL or string)
//! - Synthesize a JSON Schema input contract per operation
//! - Validate arguments before any network traffic
//! - Inject credentials according to the operation's security requirements
//! - Shape responses into text, JSON or file results, with a diagnostic
//!   narrative for failed calls
//! - Lint the document against the generated catalog
//!
//! ## Example
//!
//! ```no_run
//! use opentool_openapi::{OpenApiToolset, ToolGenOptions};
//!
//! # fn main() -> anyhow::Result<()> {
//! let options = ToolGenOptions {
//!     tag_filter: vec!["pets".to_string()],
//!     ..ToolGenOptions::default()
//! };
//! let toolset = OpenApiToolset::from_file("./api/openapi.yaml", options)?;
//! println!("Generated {} tools", toolset.len());
//! # Ok(())
//! # }
//! ```

pub mod auth;
pub mod catalog;
mod error;
pub mod input_schema;
pub mod lint;
pub mod meta_tools;
pub mod narrator;
pub mod operation_tool;
pub mod parser;
pub mod request;
pub mod response;
pub mod schema;
mod toolset;
pub mod types;
pub mod validation;

pub use auth::{AuthInjection, SecuritySchemeKind, resolve_auth};
pub use catalog::{Catalog, NameFormatter, SchemaHook, ToolGenOptions, ToolSummary, build_catalog};
pub use error::{OpenApiError, Result};
pub use input_schema::{InputSchema, ParameterNameMap, build_input_schema, escape_parameter_name};
pub use lint::{LintIssue, LintReport, Severity};
pub use operation_tool::OperationTool;
pub use parser::{ApiDocument, OpenApiParser};
pub use schema::SchemaSynthesizer;
pub use toolset::OpenApiToolset;
pub use types::{ApiParameter, Operation, ParameterLocation, RequestBodySpec};
pub use validation::{Violation, ViolationKind, example_arguments, validate_arguments};
