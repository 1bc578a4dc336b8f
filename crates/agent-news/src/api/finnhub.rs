//! FinnHub client for US company news and social sentiment

use async_trait::async_trait;
use chrono::{DateTime, Duration as DateDuration, NaiveDate};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;

use super::{SharedRateLimiter, clip, ensure_success, http_client, rate_limiter};
use crate::error::{NewsError, Result};
use crate::source::{NewsSource, SocialSentimentSource, SourceRequest};

const FINNHUB_API_BASE: &str = "https://finnhub.io/api/v1";

/// Days of company news fetched before the request date
const NEWS_LOOKBACK_DAYS: i64 = 7;

/// Finnhub news article
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FinnhubNewsArticle {
    #[serde(default)]
    pub category: String,
    /// Publish time (UNIX timestamp)
    pub datetime: i64,
    pub headline: String,
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub image: String,
    /// Related symbols
    #[serde(default)]
    pub related: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub url: String,
}

/// One sampling window of social-media sentiment
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SocialSentimentPoint {
    #[serde(default)]
    pub at_time: String,
    #[serde(default)]
    pub mention: i64,
    #[serde(default)]
    pub positive_mention: i64,
    #[serde(default)]
    pub negative_mention: i64,
    #[serde(default)]
    pub positive_score: f64,
    #[serde(default)]
    pub negative_score: f64,
    #[serde(default)]
    pub score: f64,
}

/// Social sentiment response, split by platform
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SocialSentimentResponse {
    #[serde(default)]
    pub symbol: String,
    #[serde(default)]
    pub reddit: Vec<SocialSentimentPoint>,
    #[serde(default)]
    pub twitter: Vec<SocialSentimentPoint>,
}

/// Finnhub client for news API
pub struct FinnhubClient {
    client: Client,
    api_key: String,
    rate_limiter: SharedRateLimiter,
}

impl FinnhubClient {
    /// Create a new Finnhub client with rate limiting
    ///
    /// # Arguments
    /// * `api_key` - Finnhub API key
    /// * `rate_limit` - Requests per minute (free tier: 60, premium: 300+)
    /// * `timeout` - Per-request timeout
    pub fn new(api_key: impl Into<String>, rate_limit: u32, timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key: api_key.into(),
            rate_limiter: rate_limiter(rate_limit),
        })
    }

    /// Get company news for a specific symbol
    ///
    /// # Arguments
    /// * `symbol` - Stock symbol (e.g., "AAPL")
    /// * `from` - Start date (YYYY-MM-DD)
    /// * `to` - End date (YYYY-MM-DD)
    #[tracing::instrument(skip(self))]
    pub async fn get_company_news(
        &self,
        symbol: &str,
        from: &str,
        to: &str,
    ) -> Result<Vec<FinnhubNewsArticle>> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(format!("{FINNHUB_API_BASE}/company-news"))
            .query(&[("symbol", symbol), ("from", from), ("to", to), ("token", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| NewsError::ApiError(format!("Finnhub request failed: {e}")))?;

        ensure_success(response, "Finnhub")
            .await?
            .json::<Vec<FinnhubNewsArticle>>()
            .await
            .map_err(|e| NewsError::ApiError(format!("Failed to parse Finnhub response: {e}")))
    }

    /// Reddit and Twitter sentiment for a symbol between two dates
    #[tracing::instrument(skip(self))]
    pub async fn get_social_sentiment(
        &self,
        symbol: &str,
        from: &str,
        to: &str,
    ) -> Result<SocialSentimentResponse> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(format!("{FINNHUB_API_BASE}/stock/social-sentiment"))
            .query(&[("symbol", symbol), ("from", from), ("to", to), ("token", self.api_key.as_str())])
            .send()
            .await
            .map_err(|e| NewsError::ApiError(format!("Finnhub request failed: {e}")))?;

        ensure_success(response, "Finnhub")
            .await?
            .json::<SocialSentimentResponse>()
            .await
            .map_err(|e| NewsError::ApiError(format!("Failed to parse Finnhub response: {e}")))
    }
}

fn lookback_window(curr_date: NaiveDate) -> (String, String) {
    let from = curr_date - DateDuration::days(NEWS_LOOKBACK_DAYS);
    (from.format("%Y-%m-%d").to_string(), curr_date.format("%Y-%m-%d").to_string())
}

/// Render company news, newest first, at most `max` articles
pub fn format_company_news(symbol: &str, articles: &[FinnhubNewsArticle], max: usize) -> String {
    let mut sorted: Vec<&FinnhubNewsArticle> = articles.iter().collect();
    sorted.sort_by(|a, b| b.datetime.cmp(&a.datetime));

    let mut out = format!("# {symbol} company news (FinnHub)\n\n");
    for article in sorted.into_iter().take(max) {
        let published = DateTime::from_timestamp(article.datetime, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        let _ = writeln!(out, "### {}", article.headline);
        let _ = writeln!(out, "{} | {}", article.source, published);
        if !article.summary.is_empty() {
            let _ = writeln!(out, "{}", clip(&article.summary, 400));
        }
        if !article.url.is_empty() {
            let _ = writeln!(out, "{}", article.url);
        }
        out.push('\n');
    }
    out
}

/// Summarize mention counts and scores per platform
pub fn format_social_sentiment(symbol: &str, response: &SocialSentimentResponse) -> String {
    let mut out = format!("### {symbol} social media sentiment (FinnHub)\n");
    for (platform, points) in [("Reddit", &response.reddit), ("Twitter", &response.twitter)] {
        if points.is_empty() {
            let _ = write!(out, "\n**{platform}**: no data in this window\n");
            continue;
        }
        let mentions: i64 = points.iter().map(|p| p.mention).sum();
        let positive: i64 = points.iter().map(|p| p.positive_mention).sum();
        let negative: i64 = points.iter().map(|p| p.negative_mention).sum();
        let avg_score = points.iter().map(|p| p.score).sum::<f64>() / points.len() as f64;
        let _ = write!(
            out,
            "\n**{platform}**: {mentions} mentions ({positive} positive, {negative} negative), \
             average score {avg_score:.3} over {} samples\n",
            points.len()
        );
    }
    out
}

#[async_trait]
impl NewsSource for FinnhubClient {
    fn name(&self) -> &str {
        "finnhub"
    }

    async fn fetch(&self, request: &SourceRequest) -> Result<String> {
        let symbol = request
            .ticker
            .as_deref()
            .ok_or_else(|| NewsError::InvalidSymbol("FinnHub news needs a ticker".to_string()))?;
        let (from, to) = lookback_window(request.curr_date);
        let articles = self.get_company_news(symbol, &from, &to).await?;
        tracing::debug!(symbol, count = articles.len(), "FinnHub company news fetched");

        if articles.is_empty() {
            return Ok(String::new());
        }
        Ok(format_company_news(symbol, &articles, request.max_results))
    }
}

#[async_trait]
impl SocialSentimentSource for FinnhubClient {
    async fn social_sentiment(&self, ticker: &str, curr_date: NaiveDate) -> Result<String> {
        let (from, to) = lookback_window(curr_date);
        let response = self.get_social_sentiment(ticker, &from, &to).await?;
        Ok(format_social_sentiment(ticker, &response))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_finnhub_client_creation() {
        let client = FinnhubClient::new("test_key", 60, Duration::from_secs(5)).unwrap();
        assert_eq!(client.api_key, "test_key");
        assert_eq!(client.name(), "finnhub");
    }

    #[test]
    fn test_lookback_window() {
        let date = NaiveDate::from_ymd_opt(2024, 3, 5).unwrap();
        assert_eq!(
            lookback_window(date),
            ("2024-02-27".to_string(), "2024-03-05".to_string())
        );
    }

    #[test]
    fn test_format_company_news() {
        let json = r#"[
            {"category":"company","datetime":1717000000,"headline":"Older","id":1,"image":"","related":"AAPL","source":"Reuters","summary":"a","url":"https://x/1"},
            {"category":"company","datetime":1717400000,"headline":"Newer","id":2,"image":"","related":"AAPL","source":"CNBC","summary":"","url":""}
        ]"#;
        let articles: Vec<FinnhubNewsArticle> = serde_json::from_str(json).unwrap();

        let text = format_company_news("AAPL", &articles, 1);
        assert!(text.starts_with("# AAPL company news (FinnHub)"));
        assert!(text.contains("### Newer"));
        assert!(!text.contains("Older"));
    }

    #[test]
    fn test_format_social_sentiment() {
        let json = r#"{
            "symbol":"TSLA",
            "reddit":[
                {"atTime":"2024-06-01 10:00:00","mention":10,"positiveMention":6,"negativeMention":2,"positiveScore":0.8,"negativeScore":-0.4,"score":0.5},
                {"atTime":"2024-06-01 11:00:00","mention":4,"positiveMention":1,"negativeMention":3,"positiveScore":0.6,"negativeScore":-0.7,"score":-0.1}
            ],
            "twitter":[]
        }"#;
        let response: SocialSentimentResponse = serde_json::from_str(json).unwrap();

        let text = format_social_sentiment("TSLA", &response);
        assert!(text.contains("**Reddit**: 14 mentions (7 positive, 5 negative), average score 0.200 over 2 samples"));
        assert!(text.contains("**Twitter**: no data in this window"));
    }
}
