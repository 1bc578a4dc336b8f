//! Serper (Google Search) client for news and discussion search

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;

use super::{SharedRateLimiter, ensure_success, http_client, rate_limiter};
use crate::error::{NewsError, Result};
use crate::source::{DiscussionHit, DiscussionSearch, NewsSource, SourceRequest};

const SERPER_API_BASE: &str = "https://google.serper.dev";

/// Results requested per discussion search
const DISCUSSION_RESULTS: usize = 20;
const REQUESTS_PER_MINUTE: u32 = 60;

/// Google time filter for the past day
const PAST_DAY: &str = "qdr:d";
/// Google time filter for the past week
const PAST_WEEK: &str = "qdr:w";

#[derive(Debug, Serialize)]
struct SearchRequest<'a> {
    q: &'a str,
    num: usize,
    #[serde(skip_serializing_if = "Option::is_none")]
    tbs: Option<&'a str>,
}

/// One Google News result
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SerperNewsItem {
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub link: String,
    #[serde(default)]
    pub snippet: String,
    #[serde(default)]
    pub date: String,
    #[serde(default)]
    pub source: String,
}

#[derive(Debug, Default, Deserialize)]
struct NewsResponse {
    #[serde(default)]
    news: Vec<SerperNewsItem>,
}

#[derive(Debug, Default, Deserialize)]
struct OrganicResponse {
    #[serde(default)]
    organic: Vec<DiscussionHit>,
}

/// Client for the Serper search API
pub struct SerperClient {
    client: Client,
    api_key: String,
    rate_limiter: SharedRateLimiter,
}

impl SerperClient {
    pub fn new(api_key: impl Into<String>, timeout: Duration) -> Result<Self> {
        let api_key = api_key.into();
        if api_key.trim().is_empty() {
            return Err(NewsError::ConfigError("SERPER_API_KEY is empty".to_string()));
        }
        Ok(Self {
            client: http_client(timeout)?,
            api_key,
            rate_limiter: rate_limiter(REQUESTS_PER_MINUTE),
        })
    }

    async fn post<T: serde::de::DeserializeOwned>(&self, endpoint: &str, body: &SearchRequest<'_>) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .post(format!("{SERPER_API_BASE}/{endpoint}"))
            .header("X-API-KEY", &self.api_key)
            .json(body)
            .send()
            .await
            .map_err(|e| NewsError::ApiError(format!("Serper request failed: {e}")))?;

        ensure_success(response, "Serper")
            .await?
            .json::<T>()
            .await
            .map_err(|e| NewsError::ApiError(format!("Failed to parse Serper response: {e}")))
    }

    /// Google News results for `query` from the past week
    #[tracing::instrument(skip(self))]
    pub async fn search_news(&self, query: &str, num: usize) -> Result<Vec<SerperNewsItem>> {
        let body = SearchRequest {
            q: query,
            num,
            tbs: Some(PAST_WEEK),
        };
        let response: NewsResponse = self.post("news", &body).await?;
        Ok(response.news)
    }
}

/// Render Google News results as text
pub fn format_news(query: &str, items: &[SerperNewsItem]) -> String {
    let mut out = format!("## Google News: {query}\n\n");
    for item in items {
        let _ = writeln!(out, "### {} ({}, {})", item.title, item.source, item.date);
        if !item.snippet.is_empty() {
            let _ = writeln!(out, "{}", item.snippet);
        }
        if !item.link.is_empty() {
            let _ = writeln!(out, "{}", item.link);
        }
        out.push('\n');
    }
    out
}

#[async_trait]
impl NewsSource for SerperClient {
    fn name(&self) -> &str {
        "serper"
    }

    async fn fetch(&self, request: &SourceRequest) -> Result<String> {
        let query = request
            .subject()
            .ok_or_else(|| NewsError::Other("Google News search needs a query".to_string()))?;
        let items = self.search_news(query, request.max_results).await?;
        tracing::debug!(query, count = items.len(), "Google News results");

        if items.is_empty() {
            return Ok(String::new());
        }
        Ok(format_news(query, &items))
    }
}

#[async_trait]
impl DiscussionSearch for SerperClient {
    async fn search_discussions(&self, query: &str, recent_only: bool) -> Result<Vec<DiscussionHit>> {
        let body = SearchRequest {
            q: query,
            num: DISCUSSION_RESULTS,
            tbs: recent_only.then_some(PAST_DAY),
        };
        let response: OrganicResponse = self.post("search", &body).await?;
        Ok(response.organic)
    }
}
