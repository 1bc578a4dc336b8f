//! Configuration for news aggregation

use crate::error::{NewsError, Result};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

const DEFAULT_OPENAI_API_BASE: &str = "https://api.openai.com/v1";
const DEFAULT_OPENAI_MODEL: &str = "gpt-4o-mini";
/// Longest store lookback accepted, ten years
pub const MAX_LOOKBACK_DAYS: i64 = 3650;

/// Minimum trimmed length (in characters) a provider result needs before it
/// is accepted by the fallback chain
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AcceptanceThresholds {
    /// Realtime / market feeds for A-share and HK tickers
    pub realtime: usize,
    /// Web search and LLM sources for A-share and HK tickers
    pub search: usize,
    /// Every source for US tickers
    pub us: usize,
    /// Envelope content at or below this length is reported as a warning
    pub status: usize,
}

impl Default for AcceptanceThresholds {
    fn default() -> Self {
        Self {
            realtime: 100,
            search: 50,
            us: 50,
            status: 50,
        }
    }
}

/// Length budgets applied to content for length-sensitive consumer models
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ShaperConfig {
    /// Lower-cased substrings of the model hint that enable budgeting
    pub sensitive_models: Vec<String>,
    /// Raw content longer than this is budgeted
    pub trigger_len: usize,
    /// Target length of budgeted content
    pub target_len: usize,
    /// Share of `target_len` that lines without keywords may fill
    pub minor_ratio: f64,
    /// Hard cap applied by the final safety check
    pub max_content_len: usize,
    /// Formatted output length the safety check guards against
    pub max_total_len: usize,
    /// Approximate length of the formatting template
    pub template_overhead: usize,
    /// Lines containing any of these are kept preferentially
    pub important_keywords: Vec<String>,
}

impl Default for ShaperConfig {
    fn default() -> Self {
        Self {
            sensitive_models: ["google", "gemini", "gemma"]
                .into_iter()
                .map(String::from)
                .collect(),
            trigger_len: 5000,
            target_len: 3000,
            minor_ratio: 0.7,
            max_content_len: 3500,
            max_total_len: 4000,
            template_overhead: 300,
            important_keywords: [
                "股票", "公司", "财报", "业绩", "涨跌", "价格", "市值", "营收", "利润", "增长",
                "下跌", "上涨", "盈利", "亏损", "投资", "分析", "预期", "公告",
            ]
            .into_iter()
            .map(String::from)
            .collect(),
        }
    }
}

/// Configuration for news aggregation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewsConfig {
    /// How far back the document store lookup searches first
    pub lookback_days: i64,

    /// Default number of news items requested
    pub default_max_news: usize,

    /// Upper bound on items requested from the market-news API
    pub market_api_max_results: usize,

    /// Acceptance thresholds for the fallback chains
    pub thresholds: AcceptanceThresholds,

    /// Content shaping budgets
    pub shaper: ShaperConfig,

    /// Whether an empty A-share cache triggers a remote sync
    pub sync_enabled: bool,

    /// Wall-clock bound on a cache sync
    pub sync_timeout: Duration,

    /// Cache TTL for name lookups and discussion searches
    pub cache_ttl_news: Duration,

    /// Request timeout for HTTP providers
    pub request_timeout: Duration,

    /// Serper (Google search) API key, required for A-share/HK sentiment
    pub serper_api_key: Option<String>,

    /// Finnhub API key
    pub finnhub_api_key: Option<String>,

    /// Requests per minute allowed against Finnhub
    pub finnhub_rate_limit: u32,

    /// OpenAI-compatible API key for LLM news
    pub openai_api_key: Option<String>,

    /// OpenAI-compatible API base URL
    pub openai_api_base: String,

    /// Model used for LLM news
    pub openai_model: String,

    /// Base URL of an AKTools HTTP server (East Money data)
    pub aktools_base_url: Option<String>,

    /// SQLite database path for the news cache; in-memory when unset
    pub db_path: Option<PathBuf>,
}

impl Default for NewsConfig {
    fn default() -> Self {
        Self {
            lookback_days: 30,
            default_max_news: 100,
            market_api_max_results: 50,
            thresholds: AcceptanceThresholds::default(),
            shaper: ShaperConfig::default(),
            sync_enabled: true,
            sync_timeout: Duration::from_secs(30),
            cache_ttl_news: Duration::from_secs(300), // 5 minutes
            request_timeout: Duration::from_secs(30),
            serper_api_key: None,
            finnhub_api_key: None,
            finnhub_rate_limit: 60,
            openai_api_key: None,
            openai_api_base: DEFAULT_OPENAI_API_BASE.to_string(),
            openai_model: DEFAULT_OPENAI_MODEL.to_string(),
            aktools_base_url: None,
            db_path: None,
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

impl NewsConfig {
    /// Create a new configuration builder
    pub fn builder() -> NewsConfigBuilder {
        NewsConfigBuilder::default()
    }

    /// Load API keys and endpoints from the environment
    pub fn with_env_keys(self) -> Self {
        self.with_lookup(|key| std::env::var(key).ok())
    }

    /// Load API keys and endpoints from an arbitrary lookup, keeping current
    /// values for anything missing
    pub fn with_lookup(mut self, lookup: impl Fn(&str) -> Option<String>) -> Self {
        let get = |key: &str| non_empty(lookup(key));
        if let Some(key) = get("SERPER_API_KEY") {
            self.serper_api_key = Some(key);
        }
        if let Some(key) = get("FINNHUB_API_KEY") {
            self.finnhub_api_key = Some(key);
        }
        if let Some(key) = get("OPENAI_API_KEY") {
            self.openai_api_key = Some(key);
        }
        if let Some(base) = get("OPENAI_API_BASE") {
            self.openai_api_base = base;
        }
        if let Some(model) = get("OPENAI_MODEL") {
            self.openai_model = model;
        }
        if let Some(base) = get("AKTOOLS_BASE_URL") {
            self.aktools_base_url = Some(base);
        }
        if let Some(path) = get("NEWS_DB_PATH") {
            self.db_path = Some(PathBuf::from(path));
        }
        self
    }

    /// Validate the configuration
    pub fn validate(&self) -> Result<()> {
        if !(1..=MAX_LOOKBACK_DAYS).contains(&self.lookback_days) {
            return Err(NewsError::ConfigError(format!(
                "lookback_days must be within 1..={MAX_LOOKBACK_DAYS}"
            )));
        }

        if self.sync_timeout.is_zero() {
            return Err(NewsError::ConfigError(
                "sync_timeout must be greater than 0".to_string(),
            ));
        }

        let shaper = &self.shaper;
        if shaper.target_len == 0 || shaper.target_len > shaper.trigger_len {
            return Err(NewsError::ConfigError(
                "shaper target_len must be in 1..=trigger_len".to_string(),
            ));
        }

        if !(0.0..=1.0).contains(&shaper.minor_ratio) {
            return Err(NewsError::ConfigError(
                "shaper minor_ratio must be within [0, 1]".to_string(),
            ));
        }

        if self.finnhub_rate_limit == 0 {
            return Err(NewsError::ConfigError(
                "finnhub_rate_limit must be greater than 0".to_string(),
            ));
        }

        Ok(())
    }
}

/// Builder for NewsConfig
#[derive(Debug, Default)]
pub struct NewsConfigBuilder {
    lookback_days: Option<i64>,
    default_max_news: Option<usize>,
    thresholds: Option<AcceptanceThresholds>,
    shaper: Option<ShaperConfig>,
    sync_enabled: Option<bool>,
    sync_timeout: Option<Duration>,
    cache_ttl_news: Option<Duration>,
    request_timeout: Option<Duration>,
    serper_api_key: Option<String>,
    finnhub_api_key: Option<String>,
    openai_api_key: Option<String>,
    openai_model: Option<String>,
    aktools_base_url: Option<String>,
    db_path: Option<PathBuf>,
    from_env: bool,
}

impl NewsConfigBuilder {
    /// Set the store lookback window
    pub fn lookback_days(mut self, days: i64) -> Self {
        self.lookback_days = Some(days);
        self
    }

    /// Set the default number of news items
    pub fn default_max_news(mut self, max: usize) -> Self {
        self.default_max_news = Some(max);
        self
    }

    /// Override acceptance thresholds
    pub fn thresholds(mut self, thresholds: AcceptanceThresholds) -> Self {
        self.thresholds = Some(thresholds);
        self
    }

    /// Override shaper budgets
    pub fn shaper(mut self, shaper: ShaperConfig) -> Self {
        self.shaper = Some(shaper);
        self
    }

    /// Enable or disable populate-on-miss
    pub fn sync_enabled(mut self, enabled: bool) -> Self {
        self.sync_enabled = Some(enabled);
        self
    }

    /// Set the sync timeout
    pub fn sync_timeout(mut self, duration: Duration) -> Self {
        self.sync_timeout = Some(duration);
        self
    }

    /// Set cache TTL for lookups
    pub fn cache_ttl_news(mut self, duration: Duration) -> Self {
        self.cache_ttl_news = Some(duration);
        self
    }

    /// Set request timeout
    pub fn request_timeout(mut self, duration: Duration) -> Self {
        self.request_timeout = Some(duration);
        self
    }

    /// Set Serper API key
    pub fn serper_api_key(mut self, key: impl Into<String>) -> Self {
        self.serper_api_key = Some(key.into());
        self
    }

    /// Set Finnhub API key
    pub fn finnhub_api_key(mut self, key: impl Into<String>) -> Self {
        self.finnhub_api_key = Some(key.into());
        self
    }

    /// Set OpenAI API key
    pub fn openai_api_key(mut self, key: impl Into<String>) -> Self {
        self.openai_api_key = Some(key.into());
        self
    }

    /// Set the LLM news model
    pub fn openai_model(mut self, model: impl Into<String>) -> Self {
        self.openai_model = Some(model.into());
        self
    }

    /// Set the AKTools base URL
    pub fn aktools_base_url(mut self, url: impl Into<String>) -> Self {
        self.aktools_base_url = Some(url.into());
        self
    }

    /// Set the SQLite database path
    pub fn db_path(mut self, path: impl Into<PathBuf>) -> Self {
        self.db_path = Some(path.into());
        self
    }

    /// Fill unset keys from the environment at build time
    pub fn with_env_keys(mut self) -> Self {
        self.from_env = true;
        self
    }

    /// Build the configuration
    pub fn build(self) -> Result<NewsConfig> {
        let mut defaults = NewsConfig::default();
        if self.from_env {
            defaults = defaults.with_env_keys();
        }

        let config = NewsConfig {
            lookback_days: self.lookback_days.unwrap_or(defaults.lookback_days),
            default_max_news: self.default_max_news.unwrap_or(defaults.default_max_news),
            market_api_max_results: defaults.market_api_max_results,
            thresholds: self.thresholds.unwrap_or(defaults.thresholds),
            shaper: self.shaper.unwrap_or(defaults.shaper),
            sync_enabled: self.sync_enabled.unwrap_or(defaults.sync_enabled),
            sync_timeout: self.sync_timeout.unwrap_or(defaults.sync_timeout),
            cache_ttl_news: self.cache_ttl_news.unwrap_or(defaults.cache_ttl_news),
            request_timeout: self.request_timeout.unwrap_or(defaults.request_timeout),
            serper_api_key: self.serper_api_key.or(defaults.serper_api_key),
            finnhub_api_key: self.finnhub_api_key.or(defaults.finnhub_api_key),
            finnhub_rate_limit: defaults.finnhub_rate_limit,
            openai_api_key: self.openai_api_key.or(defaults.openai_api_key),
            openai_api_base: defaults.openai_api_base,
            openai_model: self.openai_model.unwrap_or(defaults.openai_model),
            aktools_base_url: self.aktools_base_url.or(defaults.aktools_base_url),
            db_path: self.db_path.or(defaults.db_path),
        };

        config.validate()?;
        Ok(config)
    }
}
