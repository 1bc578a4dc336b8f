//! Provider capabilities consumed by the unified analyzer
//!
//! Each capability is a trait object; the analyzer holds an `Option` per
//! capability and skips any that are not configured.

use async_trait::async_trait;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::Arc;

use crate::error::Result;
use crate::market::MarketClass;
use crate::models::NewsRecord;

/// Parameters passed to a text news source
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRequest {
    /// Ticker the news is about, when the source is ticker-keyed
    pub ticker: Option<String>,
    /// Free-text query, when the source is search-based
    pub query: Option<String>,
    pub curr_date: NaiveDate,
    pub max_results: usize,
}

impl SourceRequest {
    pub fn for_ticker(ticker: impl Into<String>, curr_date: NaiveDate) -> Self {
        Self {
            ticker: Some(ticker.into()),
            query: None,
            curr_date,
            max_results: 10,
        }
    }

    pub fn for_query(query: impl Into<String>, curr_date: NaiveDate) -> Self {
        Self {
            ticker: None,
            query: Some(query.into()),
            curr_date,
            max_results: 10,
        }
    }

    /// Date-only request (market-wide sources)
    pub fn for_date(curr_date: NaiveDate) -> Self {
        Self {
            ticker: None,
            query: None,
            curr_date,
            max_results: 10,
        }
    }

    pub fn with_max_results(mut self, max_results: usize) -> Self {
        self.max_results = max_results;
        self
    }

    /// Ticker, then query, for sources that accept either
    pub fn subject(&self) -> Option<&str> {
        self.ticker.as_deref().or(self.query.as_deref())
    }
}

/// A provider returning free-text news
#[async_trait]
pub trait NewsSource: Send + Sync {
    /// Short provider name for logs
    fn name(&self) -> &str;

    /// Fetch news as formatted text
    async fn fetch(&self, request: &SourceRequest) -> Result<String>;
}

/// Text news capabilities the fallback chains draw on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SourceKind {
    /// Cached records in the document store
    DocumentStore,
    /// Realtime market news for a ticker
    Realtime,
    /// Web news search
    WebSearch,
    /// LLM-backed general news
    Llm,
    /// Market-news API keyed by symbol
    MarketApi,
}

impl fmt::Display for SourceKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::DocumentStore => "document-store",
            Self::Realtime => "realtime",
            Self::WebSearch => "web-search",
            Self::Llm => "llm",
            Self::MarketApi => "market-api",
        })
    }
}

/// The configured set of text news sources
#[derive(Clone, Default)]
pub struct NewsSources {
    pub realtime: Option<Arc<dyn NewsSource>>,
    pub web_search: Option<Arc<dyn NewsSource>>,
    pub llm: Option<Arc<dyn NewsSource>>,
    pub market: Option<Arc<dyn NewsSource>>,
}

impl NewsSources {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_realtime(mut self, source: Arc<dyn NewsSource>) -> Self {
        self.realtime = Some(source);
        self
    }

    pub fn with_web_search(mut self, source: Arc<dyn NewsSource>) -> Self {
        self.web_search = Some(source);
        self
    }

    pub fn with_llm(mut self, source: Arc<dyn NewsSource>) -> Self {
        self.llm = Some(source);
        self
    }

    pub fn with_market(mut self, source: Arc<dyn NewsSource>) -> Self {
        self.market = Some(source);
        self
    }

    /// The source backing a capability, if configured
    pub fn get(&self, kind: SourceKind) -> Option<&Arc<dyn NewsSource>> {
        match kind {
            SourceKind::DocumentStore => None,
            SourceKind::Realtime => self.realtime.as_ref(),
            SourceKind::WebSearch => self.web_search.as_ref(),
            SourceKind::Llm => self.llm.as_ref(),
            SourceKind::MarketApi => self.market.as_ref(),
        }
    }
}

impl fmt::Debug for NewsSources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = |s: &Option<Arc<dyn NewsSource>>| s.as_ref().map(|s| s.name().to_string());
        f.debug_struct("NewsSources")
            .field("realtime", &name(&self.realtime))
            .field("web_search", &name(&self.web_search))
            .field("llm", &name(&self.llm))
            .field("market", &name(&self.market))
            .finish()
    }
}

/// Remote market-data feed used to populate the document store
#[async_trait]
pub trait NewsFeed: Send + Sync {
    async fn fetch_stock_news(&self, symbol: &str, limit: usize) -> Result<Vec<NewsRecord>>;
}

/// One search hit from a discussion forum
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DiscussionHit {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub link: String,
}

/// Web search restricted to investor discussion forums
#[async_trait]
pub trait DiscussionSearch: Send + Sync {
    /// Run `query`; `recent_only` limits results to the last 24 hours
    async fn search_discussions(&self, query: &str, recent_only: bool) -> Result<Vec<DiscussionHit>>;
}

/// Social-media sentiment for US tickers
#[async_trait]
pub trait SocialSentimentSource: Send + Sync {
    async fn social_sentiment(&self, ticker: &str, curr_date: NaiveDate) -> Result<String>;
}

/// Resolves a ticker to its company display name
#[async_trait]
pub trait CompanyNameResolver: Send + Sync {
    async fn company_name(&self, ticker: &str, market: MarketClass) -> Result<Option<String>>;
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Named(&'static str);

    #[async_trait]
    impl NewsSource for Named {
        fn name(&self) -> &str {
            self.0
        }

        async fn fetch(&self, _request: &SourceRequest) -> Result<String> {
            Ok(String::new())
        }
    }

    #[test]
    fn test_capability_lookup() {
        let sources = NewsSources::new()
            .with_web_search(Arc::new(Named("serper")))
            .with_llm(Arc::new(Named("openai")));

        assert!(sources.get(SourceKind::Realtime).is_none());
        assert!(sources.get(SourceKind::DocumentStore).is_none());
        assert_eq!(sources.get(SourceKind::WebSearch).map(|s| s.name()), Some("serper"));
        assert!(format!("{sources:?}").contains("openai"));
    }

    #[test]
    fn test_request_subject() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 1).unwrap();
        assert_eq!(SourceRequest::for_ticker("AAPL", date).subject(), Some("AAPL"));
        assert_eq!(SourceRequest::for_query("q", date).subject(), Some("q"));
        assert_eq!(SourceRequest::for_date(date).subject(), None);
    }
}
