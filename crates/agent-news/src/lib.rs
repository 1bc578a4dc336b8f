//! Stock news and sentiment aggregation
//!
//! This crate answers two questions for an agent graph: "what is the latest
//! news for this ticker?" and "what are retail investors saying about it?".
//! It provides:
//!
//! - Ticker classification into A-share, Hong Kong and US markets
//! - Ordered provider chains per market with length-based acceptance
//! - A document store (SQLite or in-memory) populated on a cache miss
//! - Length budgeting of provider output for token-sensitive models
//! - Discussion-forum and social-media sentiment gathering
//! - Tool wrappers exposing both operations to an agent runtime
//!
//! # Example
//!
//! ```rust,ignore
//! use agent_news::{NewsConfig, UnifiedNewsAnalyzer, UnifiedNewsTools};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = NewsConfig::builder().with_env_keys().build()?;
//!     let analyzer = Arc::new(UnifiedNewsAnalyzer::from_config(config)?);
//!     let tools = UnifiedNewsTools::new(analyzer);
//!
//!     println!("{}", tools.get_stock_news_unified("600519", 100, "gemini-2.0").await);
//!     Ok(())
//! }
//! ```

pub mod analyzer;
pub mod api;
pub mod cache;
pub mod config;
pub mod error;
pub mod market;
pub mod models;
pub mod shaper;
pub mod source;
pub mod store;
pub mod sync;
pub mod tools;

// Re-export main types for convenience
pub use analyzer::{UnifiedNewsAnalyzer, UnifiedNewsAnalyzerBuilder};
pub use config::{AcceptanceThresholds, NewsConfig, ShaperConfig};
pub use error::{NewsError, Result};
pub use market::{MarketClass, classify, normalize_ticker};
pub use models::{EnvelopeStatus, NewsRecord, NewsResultEnvelope, NewsSentiment, SentimentEnvelope};
pub use shaper::ContentShaper;
pub use source::{NewsSource, NewsSources, SourceRequest};
pub use store::{MemoryNewsStore, NewsQuery, NewsStore, SqliteNewsStore};
pub use sync::NewsSyncer;
pub use tools::{UnifiedNewsTool, UnifiedNewsTools, UnifiedSentimentTool};
