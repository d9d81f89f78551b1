//! Tool system for OpenTool
//!
//! This crate provides the tool execution framework, including:
//! - Function tools built from closures
//! - A default per-call tool context
//! - An in-memory registry implementing the tool host boundary

pub mod context;
pub mod function_tool;
pub mod registry;

// Re-exports
pub use context::DefaultToolContext;
pub use function_tool::FunctionTool;
pub use registry::ToolRegistry;

// Re-export core types
pub use opentool_core::{Resource, Result, Tool, ToolContext, ToolHost, ToolResponse};
