//! Unified news and sentiment analyzer
//!
//! Classifies a ticker, walks the market's provider chain until one source
//! yields acceptable content, and wraps the result in an envelope. Provider
//! failures never escape: each one is logged and the chain moves on.

pub mod chain;
pub mod report;
pub mod sentiment;

use chrono::{Local, NaiveDate, TimeDelta, Utc};
use std::sync::Arc;

use crate::api::{AkToolsClient, FinnhubClient, OpenAiNewsClient, SerperClient};
use crate::cache::{CacheKey, ResponseCache};
use crate::config::NewsConfig;
use crate::error::{NewsError, Result};
use crate::market::{MarketClass, classify, normalize_ticker};
use crate::models::{EnvelopeStatus, NewsRecord, NewsResultEnvelope, SentimentEnvelope};
use crate::shaper::ContentShaper;
use crate::source::{
    CompanyNameResolver, DiscussionHit, DiscussionSearch, NewsFeed, NewsSources, SocialSentimentSource,
    SourceKind,
};
use crate::store::{MemoryNewsStore, NewsQuery, NewsStore, SqliteNewsStore};
use crate::sync::NewsSyncer;

use chain::{ChainStep, chain_for, exhaustion_message, labels};
use report::render_store_report;
use sentiment::{discussion_query, discussion_section, normalize_company_name, sentiment_report};

const DISCUSSION_SOURCE: &str = "Serper/Google";
const SOCIAL_SOURCE: &str = "Social media";

/// Aggregates news and sentiment across configured providers
pub struct UnifiedNewsAnalyzer {
    config: NewsConfig,
    shaper: ContentShaper,
    store: Option<Arc<dyn NewsStore>>,
    sources: NewsSources,
    syncer: Option<NewsSyncer>,
    discussion: Option<Arc<dyn DiscussionSearch>>,
    social: Option<Arc<dyn SocialSentimentSource>>,
    names: Option<Arc<dyn CompanyNameResolver>>,
    cache: ResponseCache,
}

impl UnifiedNewsAnalyzer {
    /// Start building an analyzer with explicit collaborators
    pub fn builder(config: NewsConfig) -> UnifiedNewsAnalyzerBuilder {
        UnifiedNewsAnalyzerBuilder::new(config)
    }

    /// Wire the concrete HTTP providers enabled by `config`
    ///
    /// A provider is only attached when its key or endpoint is configured.
    /// The document store is SQLite when `db_path` is set, in-memory otherwise.
    pub fn from_config(config: NewsConfig) -> Result<Self> {
        config.validate()?;

        let store: Arc<dyn NewsStore> = match &config.db_path {
            Some(path) => Arc::new(SqliteNewsStore::open(path)?),
            None => Arc::new(MemoryNewsStore::new()),
        };

        let mut builder = Self::builder(config.clone()).store(store);
        let mut sources = NewsSources::new();

        if let Some(base_url) = &config.aktools_base_url {
            let client = Arc::new(AkToolsClient::new(base_url, config.request_timeout)?);
            sources = sources.with_realtime(Arc::clone(&client) as _);
            builder = builder.feed(Arc::clone(&client) as _).name_resolver(client);
        }

        if let Some(api_key) = &config.serper_api_key {
            let client = Arc::new(SerperClient::new(api_key, config.request_timeout)?);
            sources = sources.with_web_search(Arc::clone(&client) as _);
            builder = builder.discussion(client);
        }

        if let Some(api_key) = &config.openai_api_key {
            let client = OpenAiNewsClient::new(
                api_key,
                &config.openai_api_base,
                &config.openai_model,
                config.request_timeout,
            )?;
            sources = sources.with_llm(Arc::new(client));
        }

        if let Some(api_key) = &config.finnhub_api_key {
            let client = Arc::new(FinnhubClient::new(
                api_key,
                config.finnhub_rate_limit,
                config.request_timeout,
            )?);
            sources = sources.with_market(Arc::clone(&client) as _);
            builder = builder.social(client);
        }

        tracing::info!(?sources, "News analyzer configured");
        builder.sources(sources).build()
    }

    pub fn config(&self) -> &NewsConfig {
        &self.config
    }

    pub fn sources(&self) -> &NewsSources {
        &self.sources
    }

    /// Latest news for `ticker`, at most `max_items` items where the source
    /// supports a limit
    pub async fn get_news(&self, ticker: &str, max_items: usize, model_hint: &str) -> NewsResultEnvelope {
        let ticker = ticker.trim();
        let market = classify(ticker);
        tracing::info!(ticker, %market, max_items, model_hint, "Fetching unified news");

        let content = match self.run_chain(ticker, market, max_items, model_hint).await {
            Some(content) => content,
            None => {
                tracing::warn!(ticker, %market, "All news sources exhausted");
                exhaustion_message(market)
            }
        };

        NewsResultEnvelope::from_content(content, market, ticker, self.config.thresholds.status)
    }

    async fn run_chain(
        &self,
        ticker: &str,
        market: MarketClass,
        max_items: usize,
        model_hint: &str,
    ) -> Option<String> {
        let today = Local::now().date_naive();

        for step in chain_for(market, ticker, max_items, today, &self.config) {
            let accepted = match step.kind {
                SourceKind::DocumentStore => self.from_document_store(ticker, max_items).await,
                _ => self.from_source(&step).await.map(|content| (content, step.label)),
            };

            if let Some((content, label)) = accepted {
                tracing::info!(ticker, source = label, len = content.chars().count(), "News source accepted");
                return Some(self.shaper.shape(&content, label, model_hint));
            }
        }

        None
    }

    async fn from_source(&self, step: &ChainStep) -> Option<String> {
        let Some(source) = self.sources.get(step.kind) else {
            tracing::debug!(kind = %step.kind, label = step.label, "Source not configured, skipping");
            return None;
        };

        match source.fetch(&step.request).await {
            Ok(content) if step.accepts(&content) => Some(content),
            Ok(content) => {
                tracing::debug!(
                    source = source.name(),
                    len = content.trim().chars().count(),
                    min_len = step.min_len,
                    "Source returned too little content"
                );
                None
            }
            Err(e) => {
                tracing::warn!(source = source.name(), error = %e, "News source failed");
                None
            }
        }
    }

    /// Cached news, syncing from the feed on a miss
    async fn from_document_store(&self, ticker: &str, max_items: usize) -> Option<(String, &'static str)> {
        let store = self.store.as_ref()?;

        match self.query_store(store, ticker, max_items).await {
            Ok(records) if !records.is_empty() => {
                return Some((render_store_report(ticker, &records), labels::DATABASE_CACHE));
            }
            Ok(_) => tracing::info!(ticker, "No cached news in document store"),
            Err(e) => tracing::warn!(ticker, error = %e, "Document store query failed"),
        }

        if !self.config.sync_enabled {
            return None;
        }
        let syncer = self.syncer.as_ref()?;
        if !syncer.sync(ticker, max_items).await {
            return None;
        }

        match self.query_store(store, ticker, max_items).await {
            Ok(records) if !records.is_empty() => {
                Some((render_store_report(ticker, &records), labels::DATABASE_CACHE_SYNCED))
            }
            Ok(_) => {
                tracing::warn!(ticker, "Sync reported success but store is still empty");
                None
            }
            Err(e) => {
                tracing::warn!(ticker, error = %e, "Document store requery failed");
                None
            }
        }
    }

    /// Normalized ticker within the lookback window, then the raw ticker,
    /// then the normalized ticker with no time bound
    async fn query_store(
        &self,
        store: &Arc<dyn NewsStore>,
        ticker: &str,
        limit: usize,
    ) -> Result<Vec<NewsRecord>> {
        let store = Arc::clone(store);
        let clean = normalize_ticker(ticker);
        let raw = ticker.to_string();
        let since = TimeDelta::try_days(self.config.lookback_days)
            .and_then(|window| Utc::now().checked_sub_signed(window));
        if since.is_none() {
            tracing::warn!(lookback_days = self.config.lookback_days, "Lookback window out of range, querying unbounded");
        }

        tokio::task::spawn_blocking(move || {
            let mut queries = Vec::with_capacity(3);
            if let Some(since) = since {
                queries.push(NewsQuery::new(clean.clone(), limit).since(since));
                if raw != clean {
                    queries.push(NewsQuery::new(raw, limit).since(since));
                }
            }
            queries.push(NewsQuery::new(clean, limit));

            for query in &queries {
                let found = store.find_news(query)?;
                if !found.is_empty() {
                    tracing::debug!(?query, count = found.len(), "Document store hit");
                    return Ok(found);
                }
            }
            Ok(Vec::new())
        })
        .await?
    }

    /// Investor sentiment for `ticker` on `curr_date` (`YYYY-MM-DD`)
    pub async fn get_sentiment(&self, ticker: &str, curr_date: &str) -> SentimentEnvelope {
        let ticker = ticker.trim();
        let market = classify(ticker);
        tracing::info!(ticker, %market, curr_date, "Fetching unified sentiment");

        let pending = SentimentEnvelope::pending(ticker, market, curr_date);
        let outcome = if market.is_chinese_market() {
            self.forum_sentiment(ticker, market, curr_date, pending.clone()).await
        } else {
            self.social_sentiment(ticker, curr_date, pending.clone()).await
        };

        outcome.unwrap_or_else(|e| {
            tracing::error!(ticker, error = %e, "Sentiment analysis failed");
            pending.fail(e.to_string())
        })
    }

    async fn forum_sentiment(
        &self,
        ticker: &str,
        market: MarketClass,
        curr_date: &str,
        mut envelope: SentimentEnvelope,
    ) -> Result<SentimentEnvelope> {
        let search = self
            .discussion
            .as_ref()
            .ok_or_else(|| NewsError::ConfigError("SERPER_API_KEY not configured".to_string()))?;

        let code = normalize_ticker(ticker);
        let name = self.company_name(ticker, market).await;

        let query = discussion_query(&code, name.as_deref(), true);
        let mut hits = self.search_discussions(search.as_ref(), &query, true).await?;
        if hits.is_empty() {
            let relaxed = discussion_query(&code, name.as_deref(), false);
            tracing::warn!(ticker, query = %relaxed, "No recent discussions, relaxing query");
            hits = self.search_discussions(search.as_ref(), &relaxed, false).await?;
        }

        envelope.source = Some(DISCUSSION_SOURCE.to_string());

        if hits.is_empty() {
            tracing::warn!(ticker, "No discussions found, returning placeholder");
            envelope.summary = "[System notice] No investor discussions were found; this is a \
                                placeholder result and must not drive trading decisions."
                .to_string();
            envelope.content = sentiment_report(
                ticker,
                market,
                curr_date,
                "## Retail investor sentiment (discussion search)\n\nNo discussion posts found on Xueqiu or Guba.",
            );
            return Ok(envelope);
        }

        tracing::info!(ticker, hits = hits.len(), "Collected investor discussions");
        let section = discussion_section(ticker, name.as_deref(), curr_date, &hits);
        envelope.summary = format!(
            "Collected {} investor discussion posts; interpret sentiment from the content.",
            hits.len()
        );
        envelope.content = sentiment_report(ticker, market, curr_date, &section);
        envelope.status = EnvelopeStatus::Success;
        Ok(envelope)
    }

    async fn social_sentiment(
        &self,
        ticker: &str,
        curr_date: &str,
        mut envelope: SentimentEnvelope,
    ) -> Result<SentimentEnvelope> {
        let social = self.social.as_ref().ok_or_else(|| {
            NewsError::NotConfigured("social sentiment provider (FINNHUB_API_KEY)".to_string())
        })?;
        let date = NaiveDate::parse_from_str(curr_date, "%Y-%m-%d")
            .map_err(|e| NewsError::Other(format!("Invalid date '{curr_date}': {e}")))?;

        let text = social.social_sentiment(ticker, date).await?;
        let section = format!("## US social media sentiment\n\n{text}");

        envelope.summary = "Social media sentiment collected; interpret sentiment from the content.".to_string();
        envelope.content = sentiment_report(ticker, MarketClass::Us, curr_date, &section);
        envelope.source = Some(SOCIAL_SOURCE.to_string());
        envelope.status = EnvelopeStatus::Success;
        Ok(envelope)
    }

    /// Normalized company name, if a resolver is configured and knows it
    async fn company_name(&self, ticker: &str, market: MarketClass) -> Option<String> {
        let resolver = self.names.as_ref()?;
        let key = CacheKey::new(ticker, "company_name", market.store_tag());

        match self
            .cache
            .get_or_fetch(key, || resolver.company_name(ticker, market))
            .await
        {
            Ok(Some(name)) => {
                let name = normalize_company_name(&name);
                (!name.is_empty()).then_some(name)
            }
            Ok(None) => None,
            Err(e) => {
                tracing::debug!(ticker, error = %e, "Company name lookup failed");
                None
            }
        }
    }

    async fn search_discussions(
        &self,
        search: &dyn DiscussionSearch,
        query: &str,
        recent_only: bool,
    ) -> Result<Vec<DiscussionHit>> {
        tracing::info!(query, recent_only, "Searching investor discussions");
        let key = CacheKey::new(query, "discussions", recent_only);
        self.cache
            .get_or_fetch(key, || search.search_discussions(query, recent_only))
            .await
    }
}

impl std::fmt::Debug for UnifiedNewsAnalyzer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnifiedNewsAnalyzer")
            .field("sources", &self.sources)
            .field("store", &self.store.is_some())
            .field("syncer", &self.syncer)
            .field("discussion", &self.discussion.is_some())
            .field("social", &self.social.is_some())
            .field("names", &self.names.is_some())
            .finish_non_exhaustive()
    }
}

/// Builder for [`UnifiedNewsAnalyzer`]
pub struct UnifiedNewsAnalyzerBuilder {
    config: NewsConfig,
    store: Option<Arc<dyn NewsStore>>,
    sources: NewsSources,
    feed: Option<Arc<dyn NewsFeed>>,
    discussion: Option<Arc<dyn DiscussionSearch>>,
    social: Option<Arc<dyn SocialSentimentSource>>,
    names: Option<Arc<dyn CompanyNameResolver>>,
}

impl UnifiedNewsAnalyzerBuilder {
    pub fn new(config: NewsConfig) -> Self {
        Self {
            config,
            store: None,
            sources: NewsSources::new(),
            feed: None,
            discussion: None,
            social: None,
            names: None,
        }
    }

    pub fn store(mut self, store: Arc<dyn NewsStore>) -> Self {
        self.store = Some(store);
        self
    }

    pub fn sources(mut self, sources: NewsSources) -> Self {
        self.sources = sources;
        self
    }

    /// Remote feed used to populate the store on a miss
    pub fn feed(mut self, feed: Arc<dyn NewsFeed>) -> Self {
        self.feed = Some(feed);
        self
    }

    pub fn discussion(mut self, search: Arc<dyn DiscussionSearch>) -> Self {
        self.discussion = Some(search);
        self
    }

    pub fn social(mut self, social: Arc<dyn SocialSentimentSource>) -> Self {
        self.social = Some(social);
        self
    }

    pub fn name_resolver(mut self, names: Arc<dyn CompanyNameResolver>) -> Self {
        self.names = Some(names);
        self
    }

    /// Validate the configuration and assemble the analyzer
    pub fn build(self) -> Result<UnifiedNewsAnalyzer> {
        self.config.validate()?;

        let syncer = match (&self.feed, &self.store) {
            (Some(feed), Some(store)) => Some(NewsSyncer::new(
                Arc::clone(feed),
                Arc::clone(store),
                self.config.sync_timeout,
            )),
            _ => None,
        };

        Ok(UnifiedNewsAnalyzer {
            shaper: ContentShaper::new(self.config.shaper.clone()),
            cache: ResponseCache::new(self.config.cache_ttl_news),
            config: self.config,
            store: self.store,
            sources: self.sources,
            syncer,
            discussion: self.discussion,
            social: self.social,
            names: self.names,
        })
    }
}
