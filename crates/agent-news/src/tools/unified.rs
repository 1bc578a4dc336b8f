//! Unified news and sentiment tools
//!
//! Both operations always return a string: either the literal empty-ticker
//! error or a pretty-printed JSON envelope. Nothing is raised to the caller.

use agent_core::Result as AgentResult;
use agent_tools::{Tool, ToolRegistry};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Value, json};
use std::sync::Arc;

use crate::analyzer::UnifiedNewsAnalyzer;

/// Returned verbatim when the ticker is empty
pub const EMPTY_TICKER_ERROR: &str = "❌ Error: no stock code provided";

fn to_json<T: Serialize>(value: &T) -> String {
    serde_json::to_string_pretty(value)
        .unwrap_or_else(|e| format!("❌ Error: failed to serialize result: {e}"))
}

/// String-returning facade over the analyzer
#[derive(Clone)]
pub struct UnifiedNewsTools {
    analyzer: Arc<UnifiedNewsAnalyzer>,
}

impl UnifiedNewsTools {
    pub fn new(analyzer: Arc<UnifiedNewsAnalyzer>) -> Self {
        Self { analyzer }
    }

    pub fn analyzer(&self) -> &UnifiedNewsAnalyzer {
        &self.analyzer
    }

    /// News for any A-share, Hong Kong or US ticker
    pub async fn get_stock_news_unified(&self, stock_code: &str, max_news: usize, model_info: &str) -> String {
        if stock_code.trim().is_empty() {
            tracing::warn!("Unified news called without a stock code");
            return EMPTY_TICKER_ERROR.to_string();
        }

        let envelope = self.analyzer.get_news(stock_code, max_news, model_info).await;
        tracing::info!(
            ticker = %envelope.ticker,
            status = ?envelope.status,
            len = envelope.content.chars().count(),
            "Unified news completed"
        );
        to_json(&envelope)
    }

    /// Investor sentiment for a ticker on `curr_date` (`YYYY-MM-DD`)
    pub async fn get_stock_sentiment_unified(&self, ticker: &str, curr_date: &str) -> String {
        if ticker.trim().is_empty() {
            tracing::warn!("Unified sentiment called without a ticker");
            return EMPTY_TICKER_ERROR.to_string();
        }

        let envelope = self.analyzer.get_sentiment(ticker, curr_date).await;
        tracing::info!(
            ticker = %envelope.ticker,
            status = ?envelope.status,
            len = envelope.content.chars().count(),
            "Unified sentiment completed"
        );
        to_json(&envelope)
    }
}

#[derive(Debug, Deserialize)]
struct NewsParams {
    #[serde(default)]
    stock_code: String,
    #[serde(default)]
    max_news: Option<usize>,
    #[serde(default)]
    model_info: String,
}

#[derive(Debug, Deserialize)]
struct SentimentParams {
    #[serde(default)]
    ticker: String,
    #[serde(default)]
    curr_date: String,
}

/// Tool wrapper for [`UnifiedNewsTools::get_stock_news_unified`]
pub struct UnifiedNewsTool {
    tools: UnifiedNewsTools,
}

impl UnifiedNewsTool {
    pub fn new(tools: UnifiedNewsTools) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl Tool for UnifiedNewsTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let params: NewsParams = serde_json::from_value(params)
            .map_err(|e| agent_core::Error::InvalidInput(format!("Invalid parameters: {e}")))?;

        let max_news = params
            .max_news
            .unwrap_or(self.tools.analyzer().config().default_max_news);
        let result = self
            .tools
            .get_stock_news_unified(&params.stock_code, max_news, &params.model_info)
            .await;
        Ok(Value::String(result))
    }

    fn name(&self) -> &str {
        "get_stock_news_unified"
    }

    fn description(&self) -> &str {
        "Fetch the latest news for an A-share, Hong Kong or US stock. The market is detected \
         from the code and sources are tried in a fixed order until one returns enough content."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "stock_code": {
                    "type": "string",
                    "description": "Stock code, e.g. 000001, 0700.HK or AAPL"
                },
                "max_news": {
                    "type": "integer",
                    "description": "Maximum number of news items",
                    "default": self.tools.analyzer().config().default_max_news
                },
                "model_info": {
                    "type": "string",
                    "description": "Name of the consuming model, used for length control",
                    "default": ""
                }
            },
            "required": ["stock_code"]
        })
    }
}

/// Tool wrapper for [`UnifiedNewsTools::get_stock_sentiment_unified`]
pub struct UnifiedSentimentTool {
    tools: UnifiedNewsTools,
}

impl UnifiedSentimentTool {
    pub fn new(tools: UnifiedNewsTools) -> Self {
        Self { tools }
    }
}

#[async_trait]
impl Tool for UnifiedSentimentTool {
    async fn execute(&self, params: Value) -> AgentResult<Value> {
        let params: SentimentParams = serde_json::from_value(params)
            .map_err(|e| agent_core::Error::InvalidInput(format!("Invalid parameters: {e}")))?;

        let result = self
            .tools
            .get_stock_sentiment_unified(&params.ticker, &params.curr_date)
            .await;
        Ok(Value::String(result))
    }

    fn name(&self) -> &str {
        "get_stock_sentiment_unified"
    }

    fn description(&self) -> &str {
        "Collect investor sentiment for a stock. A-share and Hong Kong tickers use Xueqiu and \
         Guba discussions; US tickers use social-media sentiment. Scores are left to the reader."
    }

    fn input_schema(&self) -> Value {
        json!({
            "type": "object",
            "properties": {
                "ticker": {
                    "type": "string",
                    "description": "Stock code, e.g. 600519, 0700.HK or TSLA"
                },
                "curr_date": {
                    "type": "string",
                    "description": "Analysis date in YYYY-MM-DD format"
                }
            },
            "required": ["ticker", "curr_date"]
        })
    }
}

/// Register both unified tools in `registry`
pub fn register_unified_tools(registry: &ToolRegistry, analyzer: Arc<UnifiedNewsAnalyzer>) {
    let tools = UnifiedNewsTools::new(analyzer);
    registry.register(Arc::new(UnifiedNewsTool::new(tools.clone())));
    registry.register(Arc::new(UnifiedSentimentTool::new(tools)));
}
