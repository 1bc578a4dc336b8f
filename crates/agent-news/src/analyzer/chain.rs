//! Ordered provider chains per market

use chrono::NaiveDate;

use crate::config::NewsConfig;
use crate::market::{MarketClass, normalize_ticker};
use crate::source::{SourceKind, SourceRequest};

/// Source labels shown in the shaped output
pub mod labels {
    pub const DATABASE_CACHE: &str = "Database cache";
    pub const DATABASE_CACHE_SYNCED: &str = "Database cache (freshly synced)";
    pub const EASTMONEY_REALTIME: &str = "EastMoney realtime news";
    pub const GOOGLE_NEWS: &str = "Google News";
    pub const OPENAI_GLOBAL: &str = "OpenAI global news";
    pub const GOOGLE_HK: &str = "Google HK-share news";
    pub const OPENAI_HK: &str = "OpenAI HK-share news";
    pub const REALTIME_HK: &str = "Realtime HK-share news";
    pub const OPENAI_US: &str = "OpenAI US-share news";
    pub const GOOGLE_US: &str = "Google US-share news";
    pub const FINNHUB_US: &str = "FinnHub US-share news";
}

/// One attempt in a provider chain
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainStep {
    pub kind: SourceKind,
    /// Label the accepted content is tagged with
    pub label: &'static str,
    /// Trimmed content must be strictly longer than this many characters
    pub min_len: usize,
    /// Request handed to the source; unused for the document store
    pub request: SourceRequest,
}

impl ChainStep {
    fn new(kind: SourceKind, label: &'static str, min_len: usize, request: SourceRequest) -> Self {
        Self {
            kind,
            label,
            min_len,
            request,
        }
    }

    /// Whether `content` passes this step's acceptance test
    pub fn accepts(&self, content: &str) -> bool {
        let trimmed = content.trim();
        !trimmed.is_empty() && trimmed.chars().count() > self.min_len
    }
}

/// Web search query for A-share news
pub fn china_a_query(code: &str) -> String {
    format!("{code} 股票 新闻 财报 业绩")
}

/// Web search query for Hong Kong news
pub fn hk_query(code: &str) -> String {
    format!("{code} 港股 香港股票 新闻")
}

/// Web search query for US news
pub fn us_query(code: &str) -> String {
    format!("{code} stock news earnings financial")
}

/// Build the ordered chain for `ticker` in `market`
pub fn chain_for(
    market: MarketClass,
    ticker: &str,
    max_items: usize,
    curr_date: NaiveDate,
    config: &NewsConfig,
) -> Vec<ChainStep> {
    let thresholds = &config.thresholds;

    match market {
        MarketClass::ChinaA => {
            let code = normalize_ticker(ticker);
            vec![
                ChainStep::new(
                    SourceKind::DocumentStore,
                    labels::DATABASE_CACHE,
                    0,
                    SourceRequest::for_ticker(&code, curr_date).with_max_results(max_items),
                ),
                ChainStep::new(
                    SourceKind::Realtime,
                    labels::EASTMONEY_REALTIME,
                    thresholds.realtime,
                    SourceRequest::for_ticker(ticker, curr_date).with_max_results(max_items),
                ),
                ChainStep::new(
                    SourceKind::WebSearch,
                    labels::GOOGLE_NEWS,
                    thresholds.search,
                    SourceRequest::for_query(china_a_query(&code), curr_date),
                ),
                ChainStep::new(
                    SourceKind::Llm,
                    labels::OPENAI_GLOBAL,
                    thresholds.search,
                    SourceRequest::for_ticker(ticker, curr_date),
                ),
            ]
        }
        MarketClass::HongKong => vec![
            ChainStep::new(
                SourceKind::WebSearch,
                labels::GOOGLE_HK,
                thresholds.search,
                SourceRequest::for_query(hk_query(ticker), curr_date),
            ),
            ChainStep::new(
                SourceKind::Llm,
                labels::OPENAI_HK,
                thresholds.search,
                SourceRequest::for_ticker(ticker, curr_date),
            ),
            ChainStep::new(
                SourceKind::Realtime,
                labels::REALTIME_HK,
                thresholds.realtime,
                SourceRequest::for_ticker(ticker, curr_date).with_max_results(max_items),
            ),
        ],
        MarketClass::Us => vec![
            ChainStep::new(
                SourceKind::Llm,
                labels::OPENAI_US,
                thresholds.us,
                SourceRequest::for_ticker(ticker, curr_date),
            ),
            ChainStep::new(
                SourceKind::WebSearch,
                labels::GOOGLE_US,
                thresholds.us,
                SourceRequest::for_query(us_query(ticker), curr_date),
            ),
            ChainStep::new(
                SourceKind::MarketApi,
                labels::FINNHUB_US,
                thresholds.us,
                SourceRequest::for_ticker(ticker, curr_date)
                    .with_max_results(max_items.min(config.market_api_max_results)),
            ),
        ],
    }
}

/// Message returned when every provider in the chain came up empty
pub fn exhaustion_message(market: MarketClass) -> String {
    format!("❌ No {} news: all sources unavailable", market.english_name())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 6, 3).unwrap()
    }

    fn kinds(steps: &[ChainStep]) -> Vec<SourceKind> {
        steps.iter().map(|s| s.kind).collect()
    }

    #[test]
    fn test_china_a_chain_order() {
        let steps = chain_for(MarketClass::ChinaA, "600519", 20, date(), &NewsConfig::default());
        assert_eq!(
            kinds(&steps),
            vec![SourceKind::DocumentStore, SourceKind::Realtime, SourceKind::WebSearch, SourceKind::Llm]
        );
        assert_eq!(steps[1].min_len, 100);
        assert_eq!(steps[2].min_len, 50);
        assert_eq!(steps[2].request.query.as_deref(), Some("600519 股票 新闻 财报 业绩"));
    }

    #[test]
    fn test_hk_chain_order() {
        let steps = chain_for(MarketClass::HongKong, "0700.HK", 20, date(), &NewsConfig::default());
        assert_eq!(
            kinds(&steps),
            vec![SourceKind::WebSearch, SourceKind::Llm, SourceKind::Realtime]
        );
        assert_eq!(steps[0].request.query.as_deref(), Some("0700.HK 港股 香港股票 新闻"));
        assert_eq!(steps[2].min_len, 100);
    }

    #[test]
    fn test_us_chain_caps_market_api_results() {
        let steps = chain_for(MarketClass::Us, "AAPL", 100, date(), &NewsConfig::default());
        assert_eq!(
            kinds(&steps),
            vec![SourceKind::Llm, SourceKind::WebSearch, SourceKind::MarketApi]
        );
        assert!(steps.iter().all(|s| s.min_len == 50));
        assert_eq!(steps[2].request.max_results, 50);

        let steps = chain_for(MarketClass::Us, "AAPL", 10, date(), &NewsConfig::default());
        assert_eq!(steps[2].request.max_results, 10);
    }

    #[test]
    fn test_acceptance_is_strict_and_trimmed() {
        let step = ChainStep::new(SourceKind::Llm, labels::OPENAI_US, 50, SourceRequest::for_date(date()));
        assert!(!step.accepts(""));
        assert!(!step.accepts(&"a".repeat(50)));
        assert!(!step.accepts(&format!("   {}   ", "a".repeat(50))));
        assert!(step.accepts(&"a".repeat(51)));
        // Characters, not bytes
        assert!(!step.accepts(&"新".repeat(50)));
    }

    #[test]
    fn test_exhaustion_messages_are_short() {
        for market in [MarketClass::ChinaA, MarketClass::HongKong, MarketClass::Us] {
            let message = exhaustion_message(market);
            assert!(message.chars().count() < 50, "{message}");
        }
        assert_eq!(
            exhaustion_message(MarketClass::HongKong),
            "❌ No HK-share news: all sources unavailable"
        );
    }
}
