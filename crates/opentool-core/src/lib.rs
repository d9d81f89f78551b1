//! Core traits and types for OpenTool
//!
//! This crate provides the foundational abstractions shared by the tool
//! engine, the registry and the command line client.

pub mod auth;
pub mod config;
pub mod context;
pub mod error;
pub mod response;
pub mod traits;

// Re-exports
pub use auth::{API_KEY_ENV, BASIC_AUTH_ENV, BEARER_TOKEN_ENV, Credentials};
pub use config::{CredentialsConfig, GenerationConfig, OpenToolConfig, SpecSource};
pub use context::ToolContext;
pub use error::{Error, Result};
pub use response::{ToolAnnotations, ToolDescriptor, ToolOutput, ToolResponse};
pub use traits::{Resource, Tool, ToolHost};
