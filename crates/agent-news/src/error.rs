//! Error types for news aggregation

use thiserror::Error;

/// News aggregation specific errors
#[derive(Debug, Error)]
pub enum NewsError {
    /// API request failed
    #[error("API error: {0}")]
    ApiError(String),

    /// Invalid or empty ticker
    #[error("Invalid symbol: {0}")]
    InvalidSymbol(String),

    /// Rate limit exceeded for API
    #[error("Rate limit exceeded for {provider}")]
    RateLimitExceeded { provider: String },

    /// Network or HTTP error
    #[error("Network error: {0}")]
    NetworkError(#[from] reqwest::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),

    /// Configuration error (missing key, bad value)
    #[error("Configuration error: {0}")]
    ConfigError(String),

    /// A provider capability was requested but is not configured
    #[error("Provider not configured: {0}")]
    NotConfigured(String),

    /// Document store failure
    #[error("Store error: {0}")]
    StoreError(String),

    /// Background cache sync failure
    #[error("Sync error: {0}")]
    SyncError(String),

    /// Generic error
    #[error("{0}")]
    Other(String),
}

/// Result type alias for news operations
pub type Result<T> = std::result::Result<T, NewsError>;

/// Convert NewsError to agent_core::Error
impl From<NewsError> for agent_core::Error {
    fn from(err: NewsError) -> Self {
        agent_core::Error::ProcessingFailed(err.to_string())
    }
}

impl From<rusqlite::Error> for NewsError {
    fn from(err: rusqlite::Error) -> Self {
        NewsError::StoreError(err.to_string())
    }
}

impl From<tokio::task::JoinError> for NewsError {
    fn from(err: tokio::task::JoinError) -> Self {
        NewsError::Other(format!("Background task failed: {err}"))
    }
}
