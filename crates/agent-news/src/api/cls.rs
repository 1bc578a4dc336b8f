//! CaiLianPress (CLS) market-wide flash news
//!
//! Two routes are supported. RSSHub mirrors the CLS feeds per category and is
//! tried first, one public instance after another. The CLS roll-list API only
//! carries the telegraph stream and serves as the fallback for it.

use chrono::{DateTime, Utc};
use regex::Regex;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::fmt::{self, Write as _};
use std::future::Future;
use std::str::FromStr;
use std::sync::LazyLock;
use std::time::Duration;

use super::{SharedRateLimiter, clip, ensure_success, http_client, rate_limiter};
use crate::error::{NewsError, Result};

const ROLL_LIST_URL: &str = "https://www.cls.cn/v1/roll/get_roll_list";
const REFERER: &str = "https://www.cls.cn";
const REQUESTS_PER_MINUTE: u32 = 20;

/// Public RSSHub instances, in the order they are tried
pub const DEFAULT_RSSHUB_INSTANCES: [&str; 2] = ["https://rsshub.app", "https://rsshub.rssforever.com"];

static HTML_TAG: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"<[^>]+>").expect("valid regex"));

/// CLS feed to read
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelegraphCategory {
    /// Telegraph flashes
    #[default]
    Telegraph,
    /// Long-form depth articles
    Depth,
    /// Hot article ranking
    HotRanking,
}

impl TelegraphCategory {
    /// RSSHub route segment under `/cls/`
    pub fn route(self) -> &'static str {
        match self {
            Self::Telegraph => "telegraph",
            Self::Depth => "depth",
            Self::HotRanking => "ranking/hot",
        }
    }
}

impl fmt::Display for TelegraphCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.route())
    }
}

impl FromStr for TelegraphCategory {
    type Err = NewsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "telegraph" => Ok(Self::Telegraph),
            "depth" => Ok(Self::Depth),
            "hot" | "ranking/hot" | "hot_ranking" => Ok(Self::HotRanking),
            other => Err(NewsError::Other(format!("Unknown CLS category: {other}"))),
        }
    }
}

/// How to reach CLS
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TelegraphMethod {
    /// RSSHub instances, falling back to the roll-list API for telegraph
    #[default]
    RssHub,
    /// Roll-list API only
    Api,
}

impl FromStr for TelegraphMethod {
    type Err = NewsError;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "rsshub" => Ok(Self::RssHub),
            "api" => Ok(Self::Api),
            other => Err(NewsError::Other(format!("Unknown CLS method: {other}"))),
        }
    }
}

/// One telegraph entry
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TelegraphItem {
    #[serde(default)]
    pub id: i64,
    #[serde(default)]
    pub title: String,
    #[serde(default)]
    pub content: String,
    /// Publish time (UNIX timestamp)
    #[serde(default)]
    pub ctime: i64,
    /// Article link when the feed provides one
    #[serde(default)]
    pub url: String,
}

impl TelegraphItem {
    pub fn link(&self) -> String {
        if self.url.is_empty() {
            format!("https://www.cls.cn/detail/{}", self.id)
        } else {
            self.url.clone()
        }
    }

    /// Title, or the start of the content for untitled flashes
    pub fn headline(&self) -> String {
        if self.title.trim().is_empty() {
            clip(self.content.trim(), 60)
        } else {
            self.title.trim().to_string()
        }
    }
}

#[derive(Debug, Deserialize)]
struct RollList {
    #[serde(default)]
    roll_data: Vec<TelegraphItem>,
}

#[derive(Debug, Deserialize)]
struct RollResponse {
    #[serde(default)]
    errno: i64,
    #[serde(default)]
    msg: String,
    data: Option<RollList>,
}

/// RSSHub output with `format=json` (JSON Feed)
#[derive(Debug, Deserialize)]
struct JsonFeed {
    #[serde(default)]
    items: Vec<JsonFeedItem>,
}

#[derive(Debug, Deserialize)]
struct JsonFeedItem {
    #[serde(default)]
    url: String,
    #[serde(default)]
    title: String,
    #[serde(default)]
    summary: String,
    #[serde(default)]
    content_text: String,
    #[serde(default)]
    content_html: String,
    date_published: Option<String>,
}

impl From<JsonFeedItem> for TelegraphItem {
    fn from(item: JsonFeedItem) -> Self {
        let body = [item.content_text, item.summary, item.content_html]
            .into_iter()
            .find(|text| !text.trim().is_empty())
            .unwrap_or_default();
        let ctime = item
            .date_published
            .as_deref()
            .and_then(|date| DateTime::parse_from_rfc3339(date).ok())
            .map_or(0, |date| date.with_timezone(&Utc).timestamp());

        Self {
            id: 0,
            title: item.title.trim().to_string(),
            content: HTML_TAG.replace_all(&body, "").trim().to_string(),
            ctime,
            url: item.url,
        }
    }
}

/// Client for CLS news through RSSHub and the public roll list
pub struct TelegraphClient {
    client: Client,
    rate_limiter: SharedRateLimiter,
    rsshub_instances: Vec<String>,
}

impl TelegraphClient {
    pub fn new(timeout: Duration) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            rate_limiter: rate_limiter(REQUESTS_PER_MINUTE),
            rsshub_instances: DEFAULT_RSSHUB_INSTANCES.iter().map(ToString::to_string).collect(),
        })
    }

    /// Replace the RSSHub instances tried, in order
    pub fn with_rsshub_instances(mut self, instances: impl IntoIterator<Item = impl Into<String>>) -> Self {
        self.rsshub_instances = instances
            .into_iter()
            .map(|base| base.into().trim_end_matches('/').to_string())
            .collect();
        self
    }

    pub fn rsshub_instances(&self) -> &[String] {
        &self.rsshub_instances
    }

    /// Latest `limit` entries of `category` using `method`
    ///
    /// With [`TelegraphMethod::RssHub`] a telegraph request that no instance
    /// can serve is retried against the roll-list API.
    #[tracing::instrument(skip(self))]
    pub async fn fetch(
        &self,
        method: TelegraphMethod,
        category: TelegraphCategory,
        limit: usize,
    ) -> Result<Vec<TelegraphItem>> {
        match method {
            TelegraphMethod::Api => {
                if category != TelegraphCategory::Telegraph {
                    return Err(NewsError::Other(format!(
                        "CLS roll-list API only serves telegraph, not {category}"
                    )));
                }
                self.latest(limit).await
            }
            TelegraphMethod::RssHub => match self.rsshub(category, limit).await {
                Ok(items) => Ok(items),
                Err(e) if category == TelegraphCategory::Telegraph => {
                    tracing::warn!(error = %e, "RSSHub unavailable, falling back to CLS roll list");
                    self.latest(limit).await
                }
                Err(e) => Err(e),
            },
        }
    }

    /// `category` from the first RSSHub instance that returns entries
    pub async fn rsshub(&self, category: TelegraphCategory, limit: usize) -> Result<Vec<TelegraphItem>> {
        first_serving_instance(&self.rsshub_instances, |base| {
            self.rsshub_instance(base, category, limit)
        })
        .await
    }

    async fn rsshub_instance(
        &self,
        base: &str,
        category: TelegraphCategory,
        limit: usize,
    ) -> Result<Vec<TelegraphItem>> {
        self.rate_limiter.until_ready().await;

        let response = self
            .client
            .get(format!("{base}/cls/{}", category.route()))
            .query(&[("format", "json")])
            .send()
            .await
            .map_err(|e| NewsError::ApiError(format!("RSSHub request failed: {e}")))?;

        let feed: JsonFeed = ensure_success(response, "RSSHub")
            .await?
            .json()
            .await
            .map_err(|e| NewsError::ApiError(format!("Failed to parse RSSHub feed: {e}")))?;

        Ok(parse_feed(feed, limit))
    }

    /// Most recent `limit` telegraph entries from the roll-list API
    #[tracing::instrument(skip(self))]
    pub async fn latest(&self, limit: usize) -> Result<Vec<TelegraphItem>> {
        self.rate_limiter.until_ready().await;

        let rn = limit.to_string();
        let response = self
            .client
            .get(ROLL_LIST_URL)
            .header("Referer", REFERER)
            .query(&[
                ("app", "CailianpressWeb"),
                ("os", "web"),
                ("sv", "7.7.5"),
                ("rn", rn.as_str()),
            ])
            .send()
            .await
            .map_err(|e| NewsError::ApiError(format!("CLS request failed: {e}")))?;

        let body: RollResponse = ensure_success(response, "CLS")
            .await?
            .json()
            .await
            .map_err(|e| NewsError::ApiError(format!("Failed to parse CLS response: {e}")))?;

        parse_roll(body, limit)
    }
}

/// Entries from the first instance that answers with a non-empty list
async fn first_serving_instance<'a, F, Fut>(instances: &'a [String], mut fetch: F) -> Result<Vec<TelegraphItem>>
where
    F: FnMut(&'a str) -> Fut,
    Fut: Future<Output = Result<Vec<TelegraphItem>>>,
{
    for base in instances {
        match fetch(base).await {
            Ok(items) if !items.is_empty() => {
                tracing::debug!(instance = %base, count = items.len(), "RSSHub instance served feed");
                return Ok(items);
            }
            Ok(_) => tracing::warn!(instance = %base, "RSSHub instance returned an empty feed"),
            Err(e) => tracing::warn!(instance = %base, error = %e, "RSSHub instance failed"),
        }
    }
    Err(NewsError::ApiError("All RSSHub instances failed".to_string()))
}

fn parse_feed(feed: JsonFeed, limit: usize) -> Vec<TelegraphItem> {
    feed.items
        .into_iter()
        .take(limit)
        .map(TelegraphItem::from)
        .filter(|item| !item.headline().is_empty())
        .collect()
}

fn parse_roll(body: RollResponse, limit: usize) -> Result<Vec<TelegraphItem>> {
    match body.data {
        Some(list) if body.errno == 0 => Ok(list.roll_data.into_iter().take(limit).collect()),
        _ => Err(NewsError::ApiError(format!(
            "CLS returned errno {}: {}",
            body.errno, body.msg
        ))),
    }
}

/// Render telegraph entries as a bulletin
pub fn format_telegraph(items: &[TelegraphItem]) -> String {
    let mut out = String::from("# CaiLianPress telegraph\n\n");
    for item in items {
        let time = DateTime::from_timestamp(item.ctime, 0)
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_default();
        let _ = writeln!(out, "- [{time}] **{}**", item.headline());
        if !item.title.trim().is_empty() && !item.content.trim().is_empty() {
            let _ = writeln!(out, "  {}", clip(item.content.trim(), 200));
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Mutex;

    const SAMPLE: &str = r#"{"errno":0,"msg":"","data":{"roll_data":[
        {"id":101,"title":"央行开展逆回购操作","content":"央行今日开展1000亿元逆回购。","ctime":1717400000},
        {"id":102,"title":"","content":"【快讯】沪指午后拉升，券商板块走强，成交额较昨日同期明显放大","ctime":1717400100}
    ]}}"#;

    const FEED: &str = r#"{"version":"https://jsonfeed.org/version/1.1","title":"财联社 - 电报","items":[
        {"id":"https://www.cls.cn/detail/201","url":"https://www.cls.cn/detail/201","title":"工信部发布新规","content_html":"<p>工信部今日<b>发布</b>新规。</p>","date_published":"2024-06-03T08:00:00.000Z"},
        {"id":"x","title":"","content_html":""},
        {"id":"y","url":"https://www.cls.cn/detail/203","title":"第三条","summary":"摘要"}
    ]}"#;

    fn item(title: &str) -> TelegraphItem {
        TelegraphItem {
            title: title.to_string(),
            ..TelegraphItem::default()
        }
    }

    #[test]
    fn test_parse_roll() {
        let body: RollResponse = serde_json::from_str(SAMPLE).unwrap();
        let items = parse_roll(body, 1).unwrap();
        assert_eq!(items.len(), 1);
        assert_eq!(items[0].link(), "https://www.cls.cn/detail/101");
    }

    #[test]
    fn test_error_payload() {
        let body: RollResponse = serde_json::from_str(r#"{"errno":50001,"msg":"sign error"}"#).unwrap();
        let err = parse_roll(body, 10).unwrap_err();
        assert!(err.to_string().contains("sign error"));
    }

    #[test]
    fn test_parse_json_feed() {
        let feed: JsonFeed = serde_json::from_str(FEED).unwrap();
        let items = parse_feed(feed, 10);

        // The empty entry is dropped
        assert_eq!(items.len(), 2);
        assert_eq!(items[0].content, "工信部今日发布新规。");
        assert_eq!(items[0].link(), "https://www.cls.cn/detail/201");
        assert_eq!(items[0].ctime, 1_717_401_600);
        assert_eq!(items[1].content, "摘要");
        assert_eq!(items[1].ctime, 0);
    }

    #[test]
    fn test_category_routes_and_parsing() {
        assert_eq!(TelegraphCategory::default().route(), "telegraph");
        assert_eq!(TelegraphCategory::HotRanking.route(), "ranking/hot");
        assert_eq!("Depth".parse::<TelegraphCategory>().unwrap(), TelegraphCategory::Depth);
        assert_eq!("ranking/hot".parse::<TelegraphCategory>().unwrap(), TelegraphCategory::HotRanking);
        assert!("sports".parse::<TelegraphCategory>().is_err());

        assert_eq!(TelegraphMethod::default(), TelegraphMethod::RssHub);
        assert_eq!("API".parse::<TelegraphMethod>().unwrap(), TelegraphMethod::Api);
        assert!("third_party".parse::<TelegraphMethod>().is_err());
    }

    #[test]
    fn test_default_instances_and_override() {
        let client = TelegraphClient::new(Duration::from_secs(5)).unwrap();
        assert_eq!(client.rsshub_instances(), DEFAULT_RSSHUB_INSTANCES);

        let client = client.with_rsshub_instances(["http://localhost:1200/"]);
        assert_eq!(client.rsshub_instances(), ["http://localhost:1200"]);
    }

    #[tokio::test]
    async fn test_instances_are_tried_in_order() {
        let instances = vec![
            "https://down.example".to_string(),
            "https://empty.example".to_string(),
            "https://up.example".to_string(),
            "https://unused.example".to_string(),
        ];
        let tried = Mutex::new(Vec::new());

        let items = first_serving_instance(&instances, |base| {
            tried.lock().unwrap().push(base.to_string());
            async move {
                match base {
                    "https://down.example" => Err(NewsError::ApiError("502".to_string())),
                    "https://empty.example" => Ok(Vec::new()),
                    _ => Ok(vec![item(base)]),
                }
            }
        })
        .await
        .unwrap();

        assert_eq!(items[0].title, "https://up.example");
        assert_eq!(tried.lock().unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_all_instances_failing_is_an_error() {
        let instances = vec!["https://a.example".to_string(), "https://b.example".to_string()];
        let result = first_serving_instance(&instances, |_| async { Ok(Vec::new()) }).await;
        assert!(matches!(result, Err(NewsError::ApiError(_))));
    }

    #[tokio::test]
    async fn test_api_method_rejects_other_categories() {
        let client = TelegraphClient::new(Duration::from_secs(5)).unwrap();
        let result = client
            .fetch(TelegraphMethod::Api, TelegraphCategory::Depth, 5)
            .await;
        assert!(result.is_err());
    }

    #[test]
    fn test_format_telegraph() {
        let body: RollResponse = serde_json::from_str(SAMPLE).unwrap();
        let items = parse_roll(body, 10).unwrap();
        let text = format_telegraph(&items);
        assert!(text.contains("**央行开展逆回购操作**\n  央行今日开展1000亿元逆回购。"));
        // Untitled flashes use the start of their content
        assert!(text.contains("**【快讯】沪指午后拉升"));
    }
}
