//! Tool management and execution framework
//!
//! This crate provides a framework for defining tools (functions) that LLM
//! agents can call, and a registry that dispatches calls by name.

pub mod registry;
pub mod tool;

pub use registry::ToolRegistry;
pub use tool::{Tool, ToolDefinition};
