//! Query building and report layout for investor-sentiment gathering

use regex::Regex;
use std::sync::LazyLock;

use crate::market::MarketClass;
use crate::source::DiscussionHit;

/// Forums searched for A-share and Hong Kong discussions
pub const DISCUSSION_SITES: &str = "site:xueqiu.com OR site:guba.eastmoney.com";

static CORPORATE_SUFFIX: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(集团|股份|有限公司|－.*|-.*|\(.*\)|（.*）)").expect("valid suffix regex")
});

/// Fold full-width ASCII variants and the ideographic space to ASCII
fn fold_full_width(text: &str) -> String {
    text.chars()
        .map(|c| match c {
            '\u{3000}' => ' ',
            '\u{FF01}'..='\u{FF5E}' => char::from_u32(c as u32 - 0xFEE0).unwrap_or(c),
            _ => c,
        })
        .collect()
}

/// Reduce a company display name to its searchable core
///
/// `"京东集团－SW"` becomes `"京东"`, `"港股腾讯控股"` becomes `"腾讯控股"`.
pub fn normalize_company_name(name: &str) -> String {
    let name = name.replace("港股", "").replace("A股", "");
    let name = fold_full_width(&name);
    CORPORATE_SUFFIX.replace_all(&name, "").trim().to_string()
}

/// Search query for discussions about `code`
///
/// The first attempt carries trend/opinion keywords; the relaxed retry drops
/// them.
pub fn discussion_query(code: &str, name: Option<&str>, with_keywords: bool) -> String {
    let mut query = format!("\"{code}\"");
    if let Some(name) = name.filter(|n| !n.is_empty() && *n != code) {
        query.push_str(&format!(" \"{name}\""));
    }
    if with_keywords {
        query.push_str(" 走势 观点");
    }
    format!("{query} {DISCUSSION_SITES}")
}

/// Forum a hit came from, judged by its link
pub fn platform_label(link: &str) -> &'static str {
    if link.contains("xueqiu.com") {
        "Xueqiu"
    } else if link.contains("eastmoney.com") {
        "Guba"
    } else {
        "Unknown"
    }
}

/// One bullet per hit
pub fn format_hits(hits: &[DiscussionHit]) -> String {
    hits.iter()
        .map(|hit| format!("- [{}] **{}**: {}", platform_label(&hit.link), hit.title, hit.snippet))
        .collect::<Vec<_>>()
        .join("\n")
}

/// Section summarizing forum discussions for the consumer model
pub fn discussion_section(ticker: &str, name: Option<&str>, date: &str, hits: &[DiscussionHit]) -> String {
    let subject = match name {
        Some(name) if !name.is_empty() => format!("{ticker} ({name})"),
        _ => ticker.to_string(),
    };
    format!(
        "## Retail investor sentiment (discussion search)\n\n\
         **Stock**: {subject}\n\
         **Date**: {date}\n\n\
         ### Discussion highlights\n{}\n\n\
         ### Sentiment overview\n\
         Summarize investor mood (bullish, bearish or neutral) and the main concerns from the posts above.",
        format_hits(hits)
    )
}

/// Full sentiment report around a single section
pub fn sentiment_report(ticker: &str, market: MarketClass, date: &str, section: &str) -> String {
    format!(
        "# {ticker} Sentiment Analysis\n\n\
         **Market**: {}\n\
         **Date**: {date}\n\n\
         {section}\n\n\
         ---\n\
         *Sources: discussion search (Xueqiu, Guba) / social media*\n",
        market.english_name()
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_company_name() {
        assert_eq!(normalize_company_name("京东集团-SW"), "京东");
        assert_eq!(normalize_company_name("京东集团－SW"), "京东");
        assert_eq!(normalize_company_name("港股腾讯控股"), "腾讯控股");
        assert_eq!(normalize_company_name("贵州茅台（A股）"), "贵州茅台");
        assert_eq!(normalize_company_name("平安银行股份有限公司"), "平安银行");
        assert_eq!(normalize_company_name("　美团(W)　"), "美团");
    }

    #[test]
    fn test_full_width_folding() {
        assert_eq!(fold_full_width("ＡＢＣ１２３"), "ABC123");
        assert_eq!(fold_full_width("中文"), "中文");
    }

    #[test]
    fn test_discussion_query() {
        assert_eq!(
            discussion_query("600519", Some("贵州茅台"), true),
            "\"600519\" \"贵州茅台\" 走势 观点 site:xueqiu.com OR site:guba.eastmoney.com"
        );
        assert_eq!(
            discussion_query("0700", None, false),
            "\"0700\" site:xueqiu.com OR site:guba.eastmoney.com"
        );
        // A name identical to the code adds nothing
        assert_eq!(
            discussion_query("0700", Some("0700"), false),
            "\"0700\" site:xueqiu.com OR site:guba.eastmoney.com"
        );
    }

    #[test]
    fn test_platform_labels() {
        assert_eq!(platform_label("https://xueqiu.com/S/SH600519"), "Xueqiu");
        assert_eq!(platform_label("https://guba.eastmoney.com/list,600519.html"), "Guba");
        assert_eq!(platform_label("https://weibo.com/x"), "Unknown");
    }

    #[test]
    fn test_format_hits() {
        let hits = vec![
            DiscussionHit {
                title: "茅台还能买吗".to_string(),
                snippet: "估值偏高".to_string(),
                link: "https://xueqiu.com/1".to_string(),
            },
            DiscussionHit {
                title: "今日走势".to_string(),
                snippet: "放量上涨".to_string(),
                link: "https://guba.eastmoney.com/2".to_string(),
            },
        ];
        assert_eq!(
            format_hits(&hits),
            "- [Xueqiu] **茅台还能买吗**: 估值偏高\n- [Guba] **今日走势**: 放量上涨"
        );

        let section = discussion_section("600519", Some("贵州茅台"), "2024-06-03", &hits);
        assert!(section.contains("**Stock**: 600519 (贵州茅台)"));
        assert!(section.contains("### Discussion highlights\n- [Xueqiu]"));

        let report = sentiment_report("600519", MarketClass::ChinaA, "2024-06-03", &section);
        assert!(report.starts_with("# 600519 Sentiment Analysis\n\n**Market**: A-share\n"));
        assert!(report.contains(&section));
    }
}
