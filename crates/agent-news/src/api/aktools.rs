//! AKTools HTTP gateway client for East Money stock news
//!
//! AKTools exposes AKShare functions as `GET /api/public/{function}`. The
//! East Money news function keys its columns by Chinese header names.

use async_trait::async_trait;
use chrono::{DateTime, FixedOffset, NaiveDateTime, Utc};
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::Write as _;
use std::time::Duration;

use super::{SharedRateLimiter, clip, ensure_success, http_client, rate_limiter};
use crate::error::{NewsError, Result};
use crate::market::{MarketClass, normalize_ticker};
use crate::models::NewsRecord;
use crate::source::{CompanyNameResolver, NewsFeed, NewsSource, SourceRequest};

const REQUESTS_PER_MINUTE: u32 = 30;
/// East Money publish times are Beijing time
const BEIJING_OFFSET_SECS: i32 = 8 * 3600;

/// One row of `stock_news_em`
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct EastMoneyNewsItem {
    #[serde(rename = "关键词", default)]
    pub keyword: String,
    #[serde(rename = "新闻标题", default)]
    pub title: String,
    #[serde(rename = "新闻内容", default)]
    pub content: String,
    #[serde(rename = "发布时间", default)]
    pub publish_time: String,
    #[serde(rename = "文章来源", default)]
    pub source: String,
    #[serde(rename = "新闻链接", default)]
    pub url: String,
}

/// One row of `stock_individual_info_em`
#[derive(Debug, Clone, Deserialize)]
struct InfoRow {
    item: String,
    #[serde(default)]
    value: serde_json::Value,
}

/// Client for an AKTools deployment
pub struct AkToolsClient {
    client: Client,
    base_url: String,
    rate_limiter: SharedRateLimiter,
}

impl AkToolsClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let base_url = base_url.into().trim_end_matches('/').to_string();
        if base_url.is_empty() {
            return Err(NewsError::ConfigError("AKTOOLS_BASE_URL is empty".to_string()));
        }
        Ok(Self {
            client: http_client(timeout)?,
            base_url,
            rate_limiter: rate_limiter(REQUESTS_PER_MINUTE),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    async fn call<T: serde::de::DeserializeOwned>(&self, function: &str, symbol: &str) -> Result<T> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(format!("{}/api/public/{function}", self.base_url))
            .query(&[("symbol", symbol)])
            .send()
            .await
            .map_err(|e| NewsError::ApiError(format!("AKTools request failed: {e}")))?;

        ensure_success(response, "AKTools")
            .await?
            .json::<T>()
            .await
            .map_err(|e| NewsError::ApiError(format!("Failed to parse AKTools response: {e}")))
    }

    /// Latest East Money news for a six-digit code
    #[tracing::instrument(skip(self))]
    pub async fn stock_news(&self, symbol: &str) -> Result<Vec<EastMoneyNewsItem>> {
        self.call("stock_news_em", symbol).await
    }
}

/// Parse an East Money `YYYY-MM-DD HH:MM:SS` Beijing-time string
fn parse_beijing_time(value: &str) -> Option<DateTime<Utc>> {
    let naive = NaiveDateTime::parse_from_str(value.trim(), "%Y-%m-%d %H:%M:%S").ok()?;
    let offset = FixedOffset::east_opt(BEIJING_OFFSET_SECS)?;
    naive
        .and_local_timezone(offset)
        .single()
        .map(|t| t.with_timezone(&Utc))
}

/// Convert an East Money row into a store record filed under `symbol`
pub fn to_record(symbol: &str, item: &EastMoneyNewsItem) -> NewsRecord {
    let publish_time = parse_beijing_time(&item.publish_time).unwrap_or_else(Utc::now);
    NewsRecord::new(symbol, item.title.trim(), publish_time)
        .with_content(item.content.trim())
        .with_source(item.source.trim())
        .with_url(item.url.trim())
}

/// Render East Money rows as a realtime news report
pub fn format_realtime_news(symbol: &str, items: &[EastMoneyNewsItem]) -> String {
    let mut out = format!("# {symbol} realtime news (East Money)\n\n");
    for (i, item) in items.iter().enumerate() {
        let _ = writeln!(out, "## {}. {}", i + 1, item.title.trim());
        let _ = writeln!(out, "**Time**: {} | **Source**: {}", item.publish_time, item.source);
        if !item.content.is_empty() {
            let _ = writeln!(out, "{}", clip(item.content.trim(), 300));
        }
        out.push('\n');
    }
    out
}

#[async_trait]
impl NewsSource for AkToolsClient {
    fn name(&self) -> &str {
        "aktools"
    }

    async fn fetch(&self, request: &SourceRequest) -> Result<String> {
        let ticker = request
            .ticker
            .as_deref()
            .ok_or_else(|| NewsError::InvalidSymbol("realtime news needs a ticker".to_string()))?;
        let symbol = normalize_ticker(ticker);

        let mut items = self.stock_news(&symbol).await?;
        items.truncate(request.max_results);
        tracing::debug!(symbol = %symbol, count = items.len(), "East Money news fetched");

        if items.is_empty() {
            return Ok(String::new());
        }
        Ok(format_realtime_news(&symbol, &items))
    }
}

#[async_trait]
impl NewsFeed for AkToolsClient {
    async fn fetch_stock_news(&self, symbol: &str, limit: usize) -> Result<Vec<NewsRecord>> {
        let items = self.stock_news(symbol).await?;
        Ok(items
            .iter()
            .filter(|item| !item.title.trim().is_empty())
            .take(limit)
            .map(|item| to_record(symbol, item))
            .collect())
    }
}

#[async_trait]
impl CompanyNameResolver for AkToolsClient {
    async fn company_name(&self, ticker: &str, market: MarketClass) -> Result<Option<String>> {
        // AKTools only carries the individual-info table for A-shares
        if market != MarketClass::ChinaA {
            return Ok(None);
        }

        let rows: Vec<InfoRow> = self
            .call("stock_individual_info_em", &normalize_ticker(ticker))
            .await?;
        Ok(rows
            .into_iter()
            .find(|row| row.item == "股票简称")
            .and_then(|row| row.value.as_str().map(str::to_string)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const SAMPLE: &str = r#"[
        {"关键词":"600519","新闻标题":"贵州茅台发布年报 ","新闻内容":"营业收入同比增长","发布时间":"2024-03-29 18:30:00","文章来源":"证券时报","新闻链接":"https://finance.eastmoney.com/a/1.html"},
        {"关键词":"600519","新闻标题":"","新闻内容":"","发布时间":"bad","文章来源":"","新闻链接":""}
    ]"#;

    #[test]
    fn test_empty_base_url_rejected() {
        assert!(AkToolsClient::new("", Duration::from_secs(5)).is_err());
        let client = AkToolsClient::new("http://127.0.0.1:8080/", Duration::from_secs(5)).unwrap();
        assert_eq!(client.base_url(), "http://127.0.0.1:8080");
    }

    #[test]
    fn test_parse_rows_and_convert() {
        let items: Vec<EastMoneyNewsItem> = serde_json::from_str(SAMPLE).unwrap();
        assert_eq!(items.len(), 2);

        let record = to_record("600519", &items[0]);
        assert_eq!(record.title, "贵州茅台发布年报");
        assert_eq!(record.source, "证券时报");
        assert_eq!(
            record.publish_time,
            Utc.with_ymd_and_hms(2024, 3, 29, 10, 30, 0).unwrap()
        );
    }

    #[test]
    fn test_beijing_time_parsing() {
        assert!(parse_beijing_time("bad").is_none());
        assert_eq!(
            parse_beijing_time("2024-01-01 08:00:00"),
            Some(Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap())
        );
    }

    #[test]
    fn test_format_realtime_news() {
        let items: Vec<EastMoneyNewsItem> = serde_json::from_str(SAMPLE).unwrap();
        let text = format_realtime_news("600519", &items[..1]);
        assert!(text.starts_with("# 600519 realtime news (East Money)"));
        assert!(text.contains("## 1. 贵州茅台发布年报\n**Time**: 2024-03-29 18:30:00 | **Source**: 证券时报\n营业收入同比增长"));
    }

    #[test]
    fn test_info_rows() {
        let rows: Vec<InfoRow> = serde_json::from_str(
            r#"[{"item":"股票代码","value":"600519"},{"item":"股票简称","value":"贵州茅台"},{"item":"总股本","value":1256197800.0}]"#,
        )
        .unwrap();
        let name = rows
            .into_iter()
            .find(|row| row.item == "股票简称")
            .and_then(|row| row.value.as_str().map(str::to_string));
        assert_eq!(name.as_deref(), Some("贵州茅台"));
    }
}
