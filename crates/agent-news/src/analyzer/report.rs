//! Markdown rendering of cached news records

use std::fmt::Write as _;

use crate::models::{NewsRecord, now_timestamp};

const PREVIEW_CHARS: usize = 500;

/// Render records from the document store as a news report
pub fn render_store_report(code: &str, records: &[NewsRecord]) -> String {
    render_store_report_at(code, records, &now_timestamp())
}

fn render_store_report_at(code: &str, records: &[NewsRecord], queried_at: &str) -> String {
    let mut report = format!("# {code} Latest News (database cache)\n\n");
    let _ = writeln!(report, "📅 Query time: {queried_at}");
    let _ = writeln!(report, "📊 News count: {}\n", records.len());

    for (i, record) in records.iter().enumerate() {
        let title = if record.title.is_empty() { "Untitled" } else { record.title.as_str() };
        let source = if record.source.is_empty() { "Unknown source" } else { record.source.as_str() };

        let _ = writeln!(report, "## {}. {} {title}\n", i + 1, record.sentiment.icon());
        let _ = writeln!(
            report,
            "**Source**: {source} | **Time**: {}",
            record.publish_time.format("%Y-%m-%d %H:%M")
        );
        let _ = writeln!(report, "**Sentiment**: {}\n", record.sentiment);

        let body = record.body();
        if !body.is_empty() {
            let _ = writeln!(report, "{}\n", preview(body));
        }
        report.push_str("---\n\n");
    }

    report
}

fn preview(body: &str) -> String {
    if body.chars().count() > PREVIEW_CHARS {
        body.chars().take(PREVIEW_CHARS).collect::<String>() + "..."
    } else {
        body.to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewsSentiment;
    use chrono::{TimeZone, Utc};

    #[test]
    fn test_report_layout() {
        let time = Utc.with_ymd_and_hms(2024, 5, 20, 9, 30, 0).unwrap();
        let records = vec![
            NewsRecord::new("600519", "Earnings beat", time)
                .with_source("Sina Finance")
                .with_content("Net profit rose 15%")
                .with_sentiment(NewsSentiment::Positive),
            NewsRecord::new("600519", "", time),
        ];

        let report = render_store_report_at("600519", &records, "2024-05-20 10:00:00");
        assert!(report.starts_with("# 600519 Latest News (database cache)\n\n📅 Query time: 2024-05-20 10:00:00\n📊 News count: 2\n"));
        assert!(report.contains("## 1. 📈 Earnings beat\n\n**Source**: Sina Finance | **Time**: 2024-05-20 09:30\n**Sentiment**: positive\n\nNet profit rose 15%\n\n---"));
        assert!(report.contains("## 2. ➖ Untitled"));
        assert!(report.contains("**Source**: Unknown source"));
        assert_eq!(report.matches("---\n").count(), 2);
    }

    #[test]
    fn test_long_body_is_previewed() {
        let time = Utc.with_ymd_and_hms(2024, 5, 20, 9, 30, 0).unwrap();
        let mut record = NewsRecord::new("600519", "Long", time);
        record.summary = "茅".repeat(800);

        let report = render_store_report_at("600519", &[record], "now");
        assert!(report.contains(&format!("{}...\n", "茅".repeat(500))));
        assert!(!report.contains(&"茅".repeat(501)));
    }
}
