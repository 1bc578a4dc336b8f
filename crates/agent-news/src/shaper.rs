//! Length budgeting and formatting of provider output
//!
//! Some consumer models degrade on long tool results. For those, content is
//! cut down to a character budget that keeps lines mentioning market terms
//! ahead of everything else. All lengths are counted in characters, never
//! bytes, so CJK text is never split mid-character.

use crate::config::ShaperConfig;
use crate::models::now_timestamp;

/// Appended when keyword-priority budgeting still had to cut the text
pub const SMART_TRUNCATION_MARKER: &str = "...(content truncated)";
/// Appended when no line carried a keyword and the raw text was cut
pub const FORCED_TRUNCATION_MARKER: &str = "...(content force-truncated)";
/// Appended by the final safety cut
pub const LENGTH_OPTIMIZED_MARKER: &str = "...(length optimized)";

fn char_len(text: &str) -> usize {
    text.chars().count()
}

fn take_chars(text: &str, n: usize) -> String {
    text.chars().take(n).collect()
}

/// Content after budgeting
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Budgeted {
    pub text: String,
    /// Character length before budgeting
    pub original_len: usize,
    /// Whether any cut was made
    pub applied: bool,
}

/// Formats provider output and applies length budgets
#[derive(Debug, Clone, Default)]
pub struct ContentShaper {
    config: ShaperConfig,
}

impl ContentShaper {
    pub fn new(config: ShaperConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ShaperConfig {
        &self.config
    }

    /// Whether the model hint names a length-sensitive consumer
    pub fn is_length_sensitive(&self, model_hint: &str) -> bool {
        let hint = model_hint.to_lowercase();
        self.config
            .sensitive_models
            .iter()
            .any(|keyword| hint.contains(keyword.as_str()))
    }

    fn is_important(&self, line: &str) -> bool {
        self.config
            .important_keywords
            .iter()
            .any(|keyword| line.contains(keyword.as_str()))
    }

    /// Apply the length budget for `model_hint` to `content`
    pub fn budget(&self, content: &str, model_hint: &str) -> Budgeted {
        let cfg = &self.config;
        let original_len = char_len(content);
        let sensitive = self.is_length_sensitive(model_hint);
        let mut text = content.to_string();
        let mut applied = false;

        if sensitive && original_len > cfg.trigger_len {
            tracing::warn!(
                original_len,
                target = cfg.target_len,
                "Content too long for length-sensitive model, budgeting"
            );
            let target = cfg.target_len;
            let minor_cap = target as f64 * cfg.minor_ratio;

            let mut kept: Vec<&str> = Vec::new();
            let mut count = 0usize;
            let mut found_important = false;

            for line in content.split('\n') {
                let line = line.trim();
                if line.is_empty() {
                    continue;
                }
                let len = char_len(line);
                let important = self.is_important(line);
                found_important |= important;

                if important && count + len < target {
                    kept.push(line);
                    count += len;
                } else if !important && ((count + len) as f64) < minor_cap {
                    kept.push(line);
                    count += len;
                }

                if count >= target {
                    break;
                }
            }

            if found_important && !kept.is_empty() {
                let joined = kept.join("\n");
                text = if char_len(&joined) > target {
                    take_chars(&joined, target) + SMART_TRUNCATION_MARKER
                } else {
                    joined
                };
                tracing::info!(original_len, budgeted_len = char_len(&text), "Budgeted by keyword priority");
            } else {
                text = take_chars(content, target) + FORCED_TRUNCATION_MARKER;
                tracing::info!(target, "No keyword lines, force-truncated");
            }
            applied = true;
        }

        let len = char_len(&text);
        if sensitive && len + cfg.template_overhead > cfg.max_total_len && len > cfg.max_content_len {
            text = take_chars(&text, cfg.max_content_len) + LENGTH_OPTIMIZED_MARKER;
            applied = true;
            tracing::info!(len = char_len(&text), "Final length optimization applied");
        }

        Budgeted {
            text,
            original_len,
            applied,
        }
    }

    /// Budget `content` and wrap it in the source envelope
    pub fn shape(&self, content: &str, source_name: &str, model_hint: &str) -> String {
        tracing::debug!(
            source = source_name,
            len = char_len(content),
            "Shaping news content"
        );
        let budgeted = self.budget(content, model_hint);
        render(&budgeted, source_name, model_hint, &now_timestamp())
    }
}

fn render(budgeted: &Budgeted, source_name: &str, model_hint: &str, timestamp: &str) -> String {
    let mut out = String::new();
    out.push_str(&format!("=== 📰 News source: {source_name} ===\n"));
    out.push_str(&format!("Fetched at: {timestamp}\n"));
    out.push_str(&format!("Content length: {} chars\n", char_len(&budgeted.text)));
    if !model_hint.is_empty() {
        out.push_str(&format!("Model: {model_hint}\n"));
    }
    if budgeted.applied {
        out.push_str(&format!(
            "🔧 Length control applied (original length: {} chars)\n",
            budgeted.original_len
        ));
    }
    out.push_str("\n=== 📋 News content ===\n");
    out.push_str(&budgeted.text);
    out.push_str("\n\n=== ✅ Data status ===\n");
    out.push_str("Status: fetched successfully\n");
    out.push_str(&format!("Source: {source_name}\n"));
    out.push_str(&format!("Timestamp: {timestamp}\n"));
    out.trim().to_string()
}
