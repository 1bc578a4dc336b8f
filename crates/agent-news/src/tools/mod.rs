//! Agent-facing tools for unified news and sentiment

pub mod unified;

pub use unified::{
    EMPTY_TICKER_ERROR, UnifiedNewsTool, UnifiedNewsTools, UnifiedSentimentTool, register_unified_tools,
};
