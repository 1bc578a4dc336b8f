//! HTTP clients for news, search and sentiment providers

pub mod aktools;
pub mod cls;
pub mod finnhub;
pub mod openai;
pub mod serper;

use governor::clock::DefaultClock;
use governor::state::{InMemoryState, NotKeyed};
use governor::{Quota, RateLimiter};
use reqwest::{Client, Response};
use std::num::NonZeroU32;
use std::sync::Arc;
use std::time::Duration;

use crate::error::{NewsError, Result};

pub use aktools::AkToolsClient;
pub use cls::{TelegraphCategory, TelegraphClient, TelegraphItem, TelegraphMethod};
pub use finnhub::{FinnhubClient, FinnhubNewsArticle};
pub use openai::OpenAiNewsClient;
pub use serper::SerperClient;

pub(crate) type SharedRateLimiter = Arc<RateLimiter<NotKeyed, InMemoryState, DefaultClock>>;

const USER_AGENT: &str = concat!("agent-news/", env!("CARGO_PKG_VERSION"));

/// Direct limiter allowing `per_minute` requests, at least one
pub(crate) fn rate_limiter(per_minute: u32) -> SharedRateLimiter {
    let quota = Quota::per_minute(NonZeroU32::new(per_minute).unwrap_or(NonZeroU32::MIN));
    Arc::new(RateLimiter::direct(quota))
}

/// HTTP client with the configured request timeout
pub(crate) fn http_client(timeout: Duration) -> Result<Client> {
    Ok(Client::builder().timeout(timeout).user_agent(USER_AGENT).build()?)
}

/// Turn a non-success response into an `ApiError` carrying the body
pub(crate) async fn ensure_success(response: Response, provider: &str) -> Result<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }

    let body = response.text().await.unwrap_or_default();
    if status.as_u16() == 429 {
        return Err(NewsError::RateLimitExceeded {
            provider: provider.to_string(),
        });
    }
    Err(NewsError::ApiError(format!("{provider} API error {status}: {body}")))
}

/// First `max` characters of `text`, with an ellipsis when cut
pub(crate) fn clip(text: &str, max: usize) -> String {
    if text.chars().count() > max {
        text.chars().take(max).collect::<String>() + "..."
    } else {
        text.to_string()
    }
}
