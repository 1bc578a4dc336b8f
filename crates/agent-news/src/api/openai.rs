//! LLM-backed news summaries through an OpenAI-compatible chat endpoint

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use super::{SharedRateLimiter, ensure_success, http_client, rate_limiter};
use crate::error::{NewsError, Result};
use crate::market::classify;
use crate::source::{NewsSource, SourceRequest};

const REQUESTS_PER_MINUTE: u32 = 20;

const SYSTEM_PROMPT: &str = "You are a financial news researcher. Report only news you can attribute \
to a source and date. Use concise bullet points with headline, source, date and a one-line summary.";

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: String,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: ChatReply,
}

#[derive(Debug, Deserialize)]
struct ChatReply {
    #[serde(default)]
    content: Option<String>,
}

/// News source asking a chat model for recent coverage of a ticker
pub struct OpenAiNewsClient {
    client: Client,
    api_key: String,
    api_base: String,
    model: String,
    rate_limiter: SharedRateLimiter,
}

impl OpenAiNewsClient {
    pub fn new(
        api_key: impl Into<String>,
        api_base: impl Into<String>,
        model: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self> {
        Ok(Self {
            client: http_client(timeout)?,
            api_key: api_key.into(),
            api_base: api_base.into().trim_end_matches('/').to_string(),
            model: model.into(),
            rate_limiter: rate_limiter(REQUESTS_PER_MINUTE),
        })
    }

    pub fn model(&self) -> &str {
        &self.model
    }

    /// Send one system + user exchange and return the reply text
    #[tracing::instrument(skip(self, prompt), fields(model = %self.model, api_base = %self.api_base))]
    pub async fn complete(&self, prompt: String) -> Result<String> {
        self.rate_limiter.until_ready().await;

        let request = ChatRequest {
            model: &self.model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT.to_string(),
                },
                ChatMessage {
                    role: "user",
                    content: prompt,
                },
            ],
            temperature: 0.2,
        };

        let response = self
            .client
            .post(format!("{}/chat/completions", self.api_base))
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&request)
            .send()
            .await?;

        let reply: ChatResponse = ensure_success(response, "OpenAI")
            .await?
            .json()
            .await
            .map_err(|e| NewsError::ApiError(format!("Failed to parse OpenAI response: {e}")))?;

        reply
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| NewsError::ApiError("No choices in OpenAI response".to_string()))
    }
}

/// User prompt asking for news about `ticker` in the week before the date
pub fn news_prompt(ticker: &str, request: &SourceRequest) -> String {
    let market = classify(ticker);
    format!(
        "List the most important news about {ticker} ({}) published in the 7 days up to {}. \
         Cover earnings, guidance, analyst actions, regulatory events and major company announcements. \
         If you know of no relevant news, reply with an empty message.",
        market.english_name(),
        request.curr_date.format("%Y-%m-%d")
    )
}

#[async_trait]
impl NewsSource for OpenAiNewsClient {
    fn name(&self) -> &str {
        "openai"
    }

    async fn fetch(&self, request: &SourceRequest) -> Result<String> {
        let ticker = request
            .subject()
            .ok_or_else(|| NewsError::InvalidSymbol("LLM news needs a ticker".to_string()))?;
        let reply = self.complete(news_prompt(ticker, request)).await?;
        tracing::debug!(ticker, len = reply.chars().count(), "LLM news reply");
        Ok(reply)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    #[test]
    fn test_client_trims_base() {
        let client =
            OpenAiNewsClient::new("sk-test", "http://localhost:1234/v1/", "gpt-4o-mini", Duration::from_secs(5))
                .unwrap();
        assert_eq!(client.api_base, "http://localhost:1234/v1");
        assert_eq!(client.model(), "gpt-4o-mini");
    }

    #[test]
    fn test_client_is_rate_limited() {
        let client =
            OpenAiNewsClient::new("sk-test", "http://localhost:1234/v1", "gpt-4o-mini", Duration::from_secs(5))
                .unwrap();
        for _ in 0..REQUESTS_PER_MINUTE {
            assert!(client.rate_limiter.check().is_ok());
        }
        assert!(client.rate_limiter.check().is_err());
    }

    #[test]
    fn test_prompt_mentions_market_and_date() {
        let request = SourceRequest::for_ticker("0700.HK", NaiveDate::from_ymd_opt(2024, 6, 3).unwrap());
        let prompt = news_prompt("0700.HK", &request);
        assert!(prompt.contains("0700.HK (HK-share)"));
        assert!(prompt.contains("2024-06-03"));
    }

    #[test]
    fn test_request_and_reply_shapes() {
        let request = ChatRequest {
            model: "gpt-4o-mini",
            messages: vec![ChatMessage {
                role: "user",
                content: "hi".to_string(),
            }],
            temperature: 0.2,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][0]["role"], "user");

        let reply: ChatResponse = serde_json::from_str(
            r#"{"id":"x","choices":[{"index":0,"message":{"role":"assistant","content":"- Apple beats"},"finish_reason":"stop"}]}"#,
        )
        .unwrap();
        assert_eq!(
            reply.choices[0].message.content.as_deref(),
            Some("- Apple beats")
        );
    }
}
