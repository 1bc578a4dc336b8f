//! Command-line interface for unified stock news and sentiment

use agent_news::api::{AkToolsClient, TelegraphCategory, TelegraphClient, TelegraphMethod, cls::format_telegraph};
use agent_news::{
    MemoryNewsStore, NewsConfig, NewsQuery, NewsStore, NewsSyncer, SqliteNewsStore, UnifiedNewsAnalyzer,
    UnifiedNewsTools, classify, normalize_ticker,
};
use agent_tools::ToolRegistry;
use agent_utils::AppConfig;
use anyhow::Context;
use clap::{Parser, Subcommand};
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

#[derive(Parser, Debug)]
#[command(name = "news-cli")]
#[command(about = "Multi-source stock news and sentiment", long_about = None)]
struct Args {
    /// SQLite news database (overrides NEWS_DB_PATH)
    #[arg(long, global = true)]
    db: Option<PathBuf>,

    /// Log level when RUST_LOG is not set (overrides LOG_LEVEL)
    #[arg(long, global = true)]
    log_level: Option<String>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Fetch news for a ticker through its market's provider chain
    News {
        /// Stock code, e.g. 600519, 0700.HK or AAPL
        stock_code: String,
        /// Maximum number of news items, defaults to the configured value
        #[arg(long)]
        max_news: Option<usize>,
        /// Consuming model name, enables length control for sensitive models
        #[arg(long, default_value = "")]
        model: String,
    },
    /// Collect investor sentiment for a ticker
    Sentiment {
        ticker: String,
        /// Analysis date (YYYY-MM-DD), defaults to today
        #[arg(long)]
        date: Option<String>,
    },
    /// Show the market each ticker is classified into
    Classify {
        #[arg(required = true)]
        tickers: Vec<String>,
    },
    /// Populate the news database from the East Money feed
    Sync {
        stock_code: String,
        #[arg(long, default_value_t = 50)]
        limit: usize,
    },
    /// Latest CaiLianPress news
    Telegraph {
        #[arg(long, default_value_t = 20)]
        limit: usize,
        /// Feed to read: telegraph, depth or hot
        #[arg(long, default_value = "telegraph")]
        category: TelegraphCategory,
        /// Access route: rsshub (falls back to the CLS API) or api
        #[arg(long, default_value = "rsshub")]
        method: TelegraphMethod,
    },
    /// List the registered agent tools
    Tools,
}

fn load_config(db: Option<PathBuf>) -> anyhow::Result<NewsConfig> {
    let mut builder = NewsConfig::builder().with_env_keys();
    if let Some(path) = db {
        builder = builder.db_path(path);
    }
    builder.build().context("Invalid news configuration")
}

fn open_store(config: &NewsConfig) -> anyhow::Result<Arc<dyn NewsStore>> {
    Ok(match &config.db_path {
        Some(path) => Arc::new(
            SqliteNewsStore::open(path).with_context(|| format!("Failed to open {}", path.display()))?,
        ),
        None => {
            tracing::warn!("NEWS_DB_PATH not set, synced news will not outlive this process");
            Arc::new(MemoryNewsStore::new())
        }
    })
}

async fn run_sync(config: &NewsConfig, stock_code: &str, limit: usize) -> anyhow::Result<()> {
    let base_url = config
        .aktools_base_url
        .as_deref()
        .context("AKTOOLS_BASE_URL is required for sync")?;
    let feed = Arc::new(AkToolsClient::new(base_url, config.request_timeout)?);
    let store = open_store(config)?;
    let syncer = NewsSyncer::new(feed, Arc::clone(&store), config.sync_timeout);

    if !syncer.sync(stock_code, limit).await {
        anyhow::bail!("Sync for {stock_code} failed or returned no news");
    }

    let symbol = normalize_ticker(stock_code);
    let cached = tokio::task::spawn_blocking(move || store.find_news(&NewsQuery::new(symbol, limit))).await??;
    println!("Synced {stock_code}: {} records cached", cached.len());
    for record in cached.iter().take(5) {
        println!("  {} {}", record.publish_time.format("%Y-%m-%d %H:%M"), record.title);
    }
    Ok(())
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let args = Args::parse();

    let mut app = AppConfig::from_env().with_app_name("news-cli");
    if let Some(level) = args.log_level.clone() {
        app.log_level = level;
    }
    agent_utils::init_tracing_with(&app);
    info!(app = %app.app_name, environment = %app.environment, production = app.is_production(), "Starting");

    let config = load_config(args.db)?;

    match args.command {
        Command::News {
            stock_code,
            max_news,
            model,
        } => {
            let max_news = max_news.unwrap_or(config.default_max_news);
            let tools = UnifiedNewsTools::new(Arc::new(UnifiedNewsAnalyzer::from_config(config)?));
            println!("{}", tools.get_stock_news_unified(&stock_code, max_news, &model).await);
        }
        Command::Sentiment { ticker, date } => {
            let date = date.unwrap_or_else(|| chrono::Local::now().format("%Y-%m-%d").to_string());
            let tools = UnifiedNewsTools::new(Arc::new(UnifiedNewsAnalyzer::from_config(config)?));
            println!("{}", tools.get_stock_sentiment_unified(&ticker, &date).await);
        }
        Command::Classify { tickers } => {
            for ticker in tickers {
                let market = classify(&ticker);
                println!(
                    "{ticker:<12} {:<10} {}",
                    market.english_name(),
                    normalize_ticker(&ticker)
                );
            }
        }
        Command::Sync { stock_code, limit } => run_sync(&config, &stock_code, limit).await?,
        Command::Telegraph {
            limit,
            category,
            method,
        } => {
            let client = TelegraphClient::new(config.request_timeout)?;
            let items = client.fetch(method, category, limit).await?;
            println!("{}", format_telegraph(&items));
        }
        Command::Tools => {
            let registry = ToolRegistry::new();
            agent_news::tools::register_unified_tools(
                &registry,
                Arc::new(UnifiedNewsAnalyzer::from_config(config)?),
            );
            println!("{}", serde_json::to_string_pretty(&registry.definitions())?);
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_news_defaults() {
        let args = Args::try_parse_from(["news-cli", "news", "600519"]).unwrap();
        match args.command {
            Command::News {
                stock_code,
                max_news,
                model,
            } => {
                assert_eq!(stock_code, "600519");
                assert_eq!(max_news, None);
                assert!(model.is_empty());
            }
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn test_parse_global_db_after_subcommand() {
        let args = Args::try_parse_from(["news-cli", "sync", "000001", "--db", "/tmp/news.db"]).unwrap();
        assert_eq!(args.db, Some(PathBuf::from("/tmp/news.db")));
    }

    #[test]
    fn test_parse_telegraph_options() {
        let args = Args::try_parse_from(["news-cli", "telegraph"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Telegraph {
                limit: 20,
                category: TelegraphCategory::Telegraph,
                method: TelegraphMethod::RssHub,
            }
        ));

        let args =
            Args::try_parse_from(["news-cli", "telegraph", "--category", "hot", "--method", "api"]).unwrap();
        assert!(matches!(
            args.command,
            Command::Telegraph {
                category: TelegraphCategory::HotRanking,
                method: TelegraphMethod::Api,
                ..
            }
        ));
        assert!(Args::try_parse_from(["news-cli", "telegraph", "--category", "sports"]).is_err());
    }

    #[test]
    fn test_classify_requires_ticker() {
        assert!(Args::try_parse_from(["news-cli", "classify"]).is_err());
    }
}
