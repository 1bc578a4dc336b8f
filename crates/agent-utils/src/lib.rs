//! Shared utilities for the news workspace
//!
//! Logging setup and process-level configuration used by the binaries.

pub mod config;
pub mod logging;

pub use config::{AppConfig, LogFormat};
pub use logging::{init_tracing, init_tracing_with};
