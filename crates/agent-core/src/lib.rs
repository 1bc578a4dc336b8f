//! Core types shared across the news workspace
//!
//! Defines the error type returned by tool execution so that tool
//! implementations and the registry agree on a single failure shape.

pub mod error;

pub use error::{Error, Result};
