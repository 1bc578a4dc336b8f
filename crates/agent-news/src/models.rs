//! News records and result envelopes

use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::market::MarketClass;

/// Timestamp format used throughout reports and envelopes
pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Current local time formatted for envelopes
pub fn now_timestamp() -> String {
    Local::now().format(TIMESTAMP_FORMAT).to_string()
}

/// Sentiment tag attached to a stored news item
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum NewsSentiment {
    Positive,
    Negative,
    #[default]
    Neutral,
}

impl NewsSentiment {
    /// Parse a stored tag; anything unknown is neutral
    pub fn parse(value: &str) -> Self {
        match value.trim().to_lowercase().as_str() {
            "positive" => Self::Positive,
            "negative" => Self::Negative,
            _ => Self::Neutral,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Positive => "positive",
            Self::Negative => "negative",
            Self::Neutral => "neutral",
        }
    }

    /// Icon shown in front of a headline
    pub fn icon(self) -> &'static str {
        match self {
            Self::Positive => "📈",
            Self::Negative => "📉",
            Self::Neutral => "➖",
        }
    }
}

impl fmt::Display for NewsSentiment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single news item as persisted by the document store
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsRecord {
    /// Store-assigned identifier
    #[serde(default)]
    pub id: String,
    /// Normalized ticker the item is filed under
    pub symbol: String,
    /// Additional tickers the item mentions
    #[serde(default)]
    pub symbols: Vec<String>,
    pub title: String,
    #[serde(default)]
    pub content: String,
    #[serde(default)]
    pub summary: String,
    #[serde(default)]
    pub source: String,
    #[serde(default)]
    pub url: String,
    pub publish_time: DateTime<Utc>,
    #[serde(default)]
    pub sentiment: NewsSentiment,
    /// Market tag set on sync (`CN`, `HK`, `US`)
    #[serde(default)]
    pub market: String,
    /// Feed the item was synced from
    #[serde(default)]
    pub data_source: String,
}

impl NewsRecord {
    /// Create a record with the required fields
    pub fn new(
        symbol: impl Into<String>,
        title: impl Into<String>,
        publish_time: DateTime<Utc>,
    ) -> Self {
        Self {
            id: String::new(),
            symbol: symbol.into(),
            symbols: Vec::new(),
            title: title.into(),
            content: String::new(),
            summary: String::new(),
            source: String::new(),
            url: String::new(),
            publish_time,
            sentiment: NewsSentiment::Neutral,
            market: String::new(),
            data_source: String::new(),
        }
    }

    pub fn with_content(mut self, content: impl Into<String>) -> Self {
        self.content = content.into();
        self
    }

    pub fn with_source(mut self, source: impl Into<String>) -> Self {
        self.source = source.into();
        self
    }

    pub fn with_sentiment(mut self, sentiment: NewsSentiment) -> Self {
        self.sentiment = sentiment;
        self
    }

    pub fn with_url(mut self, url: impl Into<String>) -> Self {
        self.url = url.into();
        self
    }

    /// Body text, falling back to the summary
    pub fn body(&self) -> &str {
        if self.content.is_empty() {
            &self.summary
        } else {
            &self.content
        }
    }

    /// Whether the record is filed under or mentions `symbol`
    pub fn mentions(&self, symbol: &str) -> bool {
        self.symbol == symbol || self.symbols.iter().any(|s| s == symbol)
    }
}

/// Outcome reported by an envelope
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EnvelopeStatus {
    Success,
    Warning,
    Error,
}

/// Result of a unified news request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewsResultEnvelope {
    pub status: EnvelopeStatus,
    pub content: String,
    pub stock_type: MarketClass,
    pub ticker: String,
    pub timestamp: String,
}

impl NewsResultEnvelope {
    /// Wrap content, deriving the status from its length
    ///
    /// Content longer than `min_len` characters is a success; anything
    /// shorter (including the exhaustion message) is a warning.
    pub fn from_content(
        content: String,
        stock_type: MarketClass,
        ticker: impl Into<String>,
        min_len: usize,
    ) -> Self {
        let status = if content.chars().count() > min_len {
            EnvelopeStatus::Success
        } else {
            EnvelopeStatus::Warning
        };
        Self {
            status,
            content,
            stock_type,
            ticker: ticker.into(),
            timestamp: now_timestamp(),
        }
    }
}

/// Result of a unified sentiment request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SentimentEnvelope {
    pub ticker: String,
    pub stock_type: MarketClass,
    pub date: String,
    /// Placeholder label; interpretation is left to the consumer model
    pub sentiment: String,
    /// Placeholder score; interpretation is left to the consumer model
    pub score: f64,
    pub summary: String,
    pub confidence: String,
    pub content: String,
    pub status: EnvelopeStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub source: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl SentimentEnvelope {
    /// Neutral placeholder envelope for a ticker
    pub fn pending(ticker: impl Into<String>, stock_type: MarketClass, date: impl Into<String>) -> Self {
        Self {
            ticker: ticker.into(),
            stock_type,
            date: date.into(),
            sentiment: "Neutral".to_string(),
            score: 0.5,
            summary: "Analysis pending; interpret sentiment from the content.".to_string(),
            confidence: "low".to_string(),
            content: String::new(),
            status: EnvelopeStatus::Warning,
            source: None,
            error: None,
        }
    }

    /// Mark the envelope as failed with `message`
    pub fn fail(mut self, message: impl Into<String>) -> Self {
        let message = message.into();
        self.summary = format!("[System notice] Sentiment analysis failed: {message}");
        self.content = format!("Unified sentiment analysis failed: {message}");
        self.status = EnvelopeStatus::Error;
        self.error = Some(message);
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sentiment_parse() {
        assert_eq!(NewsSentiment::parse("Positive"), NewsSentiment::Positive);
        assert_eq!(NewsSentiment::parse("negative "), NewsSentiment::Negative);
        assert_eq!(NewsSentiment::parse("bullish"), NewsSentiment::Neutral);
        assert_eq!(NewsSentiment::Negative.icon(), "📉");
    }

    #[test]
    fn test_record_body_and_mentions() {
        let mut record = NewsRecord::new("600519", "Title", Utc::now());
        record.summary = "summary".to_string();
        record.symbols = vec!["000858".to_string()];
        assert_eq!(record.body(), "summary");
        assert!(record.mentions("600519"));
        assert!(record.mentions("000858"));
        assert!(!record.mentions("000001"));

        let record = record.with_content("full text");
        assert_eq!(record.body(), "full text");
    }

    #[test]
    fn test_envelope_status_from_length() {
        let short = NewsResultEnvelope::from_content("x".repeat(50), MarketClass::Us, "AAPL", 50);
        assert_eq!(short.status, EnvelopeStatus::Warning);

        let long = NewsResultEnvelope::from_content("x".repeat(51), MarketClass::Us, "AAPL", 50);
        assert_eq!(long.status, EnvelopeStatus::Success);

        // Lengths count characters, not bytes
        let cjk = NewsResultEnvelope::from_content("新".repeat(30), MarketClass::ChinaA, "000001", 50);
        assert_eq!(cjk.status, EnvelopeStatus::Warning);
    }

    #[test]
    fn test_envelope_serialization() {
        let env = NewsResultEnvelope::from_content("content".into(), MarketClass::HongKong, "0700.HK", 50);
        let json = serde_json::to_value(&env).unwrap();
        assert_eq!(json["status"], "warning");
        assert_eq!(json["stock_type"], "港股");
        assert_eq!(json["ticker"], "0700.HK");
    }

    #[test]
    fn test_sentiment_envelope_fail() {
        let env = SentimentEnvelope::pending("AAPL", MarketClass::Us, "2024-01-02").fail("boom");
        assert_eq!(env.status, EnvelopeStatus::Error);
        assert_eq!(env.error.as_deref(), Some("boom"));
        assert!(env.content.contains("boom"));
        assert_eq!(env.sentiment, "Neutral");
        assert!((env.score - 0.5).abs() < f64::EPSILON);
    }
}
