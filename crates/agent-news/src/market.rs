//! Ticker classification and normalization

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::sync::LazyLock;

static CHINA_A_CODE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(00|30|60|68)\d{4}$").expect("valid regex"));
static CHINA_A_PREFIXED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(SZ|SH)\d{6}$").expect("valid regex"));
static HK_SUFFIXED: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^\d{4,5}\.HK$").expect("valid regex"));
static HK_BARE: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{4,5}$").expect("valid regex"));
static US_LETTERS: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^[A-Z]{1,5}$").expect("valid regex"));

/// Exchange suffixes removed by [`normalize_ticker`]
const MARKET_SUFFIXES: &[&str] = &[".XSHE", ".XSHG", ".SH", ".SZ", ".SS", ".HK"];

/// Market a ticker trades on, derived from its syntax
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MarketClass {
    /// Shanghai / Shenzhen listed A-shares (domestic equity)
    #[serde(rename = "A股")]
    ChinaA,
    /// Hong Kong listed equity
    #[serde(rename = "港股")]
    HongKong,
    /// US listed equity
    #[serde(rename = "美股")]
    Us,
}

impl MarketClass {
    /// Display label used in envelopes and reports
    pub fn label(self) -> &'static str {
        match self {
            Self::ChinaA => "A股",
            Self::HongKong => "港股",
            Self::Us => "美股",
        }
    }

    /// English name used in logs and failure messages
    pub fn english_name(self) -> &'static str {
        match self {
            Self::ChinaA => "A-share",
            Self::HongKong => "HK-share",
            Self::Us => "US-share",
        }
    }

    /// Market tag the document store records synced news under
    pub fn store_tag(self) -> &'static str {
        match self {
            Self::ChinaA => "CN",
            Self::HongKong => "HK",
            Self::Us => "US",
        }
    }

    /// Whether sentiment comes from Chinese discussion forums
    pub fn is_chinese_market(self) -> bool {
        matches!(self, Self::ChinaA | Self::HongKong)
    }
}

impl fmt::Display for MarketClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

/// Classify a ticker into its market
///
/// Rules are checked in order and the first match wins; anything that matches
/// no rule is treated as an A-share.
pub fn classify(ticker: &str) -> MarketClass {
    let code = ticker.trim().to_uppercase();

    if CHINA_A_CODE.is_match(&code) || CHINA_A_PREFIXED.is_match(&code) {
        MarketClass::ChinaA
    } else if HK_SUFFIXED.is_match(&code) || HK_BARE.is_match(&code) {
        MarketClass::HongKong
    } else if US_LETTERS.is_match(&code) || (code.contains('.') && !code.ends_with(".HK")) {
        MarketClass::Us
    } else {
        MarketClass::ChinaA
    }
}

/// Strip exchange suffixes (`.SH`, `.SZ`, `.SS`, `.XSHE`, `.XSHG`, `.HK`)
pub fn normalize_ticker(ticker: &str) -> String {
    let mut code = ticker.trim().to_string();
    for suffix in MARKET_SUFFIXES {
        code = code.replace(suffix, "");
    }
    code
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_china_a_codes() {
        for ticker in ["000001", "600519", "300750", "688981", "SZ000001", "SH600519"] {
            assert_eq!(classify(ticker), MarketClass::ChinaA, "{ticker}");
        }
    }

    #[test]
    fn test_hk_codes() {
        for ticker in ["0700.HK", "9988.HK", "09988.HK", "0700", "09988", "0700.hk"] {
            assert_eq!(classify(ticker), MarketClass::HongKong, "{ticker}");
        }
    }

    #[test]
    fn test_us_codes() {
        for ticker in ["AAPL", "TSLA", "F", "GOOGL", "aapl", "BRK.B"] {
            assert_eq!(classify(ticker), MarketClass::Us, "{ticker}");
        }
    }

    #[test]
    fn test_default_is_china_a() {
        // Six digits outside the A-share prefixes, too long for HK
        assert_eq!(classify("123456"), MarketClass::ChinaA);
        assert_eq!(classify("TOOLONGX"), MarketClass::ChinaA);
        assert_eq!(classify(""), MarketClass::ChinaA);
    }

    #[test]
    fn test_exchange_suffixed_a_share_is_us_by_syntax() {
        // Rule 3 fires on any dotted code that is not .HK
        assert_eq!(classify("600519.SH"), MarketClass::Us);
    }

    #[test]
    fn test_classify_is_idempotent() {
        for ticker in ["000001", "0700.HK", "AAPL", "weird-thing"] {
            assert_eq!(classify(ticker), classify(ticker));
        }
    }

    #[test]
    fn test_normalize_ticker() {
        assert_eq!(normalize_ticker("600519.SH"), "600519");
        assert_eq!(normalize_ticker("000001.SZ"), "000001");
        assert_eq!(normalize_ticker("600000.XSHG"), "600000");
        assert_eq!(normalize_ticker("000002.XSHE"), "000002");
        assert_eq!(normalize_ticker("0700.HK"), "0700");
        assert_eq!(normalize_ticker(" AAPL "), "AAPL");
    }

    #[test]
    fn test_labels() {
        assert_eq!(MarketClass::HongKong.to_string(), "港股");
        assert_eq!(MarketClass::ChinaA.store_tag(), "CN");
        assert!(MarketClass::HongKong.is_chinese_market());
        assert!(!MarketClass::Us.is_chinese_market());
    }
}
