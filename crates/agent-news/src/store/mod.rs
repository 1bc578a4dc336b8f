//! Document store holding cached news records
//!
//! The store is synchronous; async callers run it on the blocking pool.

pub mod memory;
pub mod sqlite;

use chrono::{DateTime, Utc};

use crate::error::Result;
use crate::models::NewsRecord;

pub use memory::MemoryNewsStore;
pub use sqlite::SqliteNewsStore;

/// Lookup of cached news for one ticker
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewsQuery {
    /// Matched against a record's `symbol` and `symbols`
    pub symbol: String,
    /// Only records published at or after this instant
    pub since: Option<DateTime<Utc>>,
    /// Maximum number of records, newest first
    pub limit: usize,
}

impl NewsQuery {
    pub fn new(symbol: impl Into<String>, limit: usize) -> Self {
        Self {
            symbol: symbol.into(),
            since: None,
            limit,
        }
    }

    pub fn since(mut self, since: DateTime<Utc>) -> Self {
        self.since = Some(since);
        self
    }
}

/// Persistence for news records
#[cfg_attr(test, mockall::automock)]
pub trait NewsStore: Send + Sync {
    /// Records matching the query, sorted by publish time descending
    fn find_news(&self, query: &NewsQuery) -> Result<Vec<NewsRecord>>;

    /// Insert or update records, tagging them with their feed and market.
    /// Returns the number of records written.
    fn save_news(&self, records: &[NewsRecord], data_source: &str, market: &str) -> Result<usize>;
}
