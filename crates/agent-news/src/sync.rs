//! Populating the document store from the remote market-data feed
//!
//! The feed is async but the store write path is synchronous, and the caller
//! may already be running inside a runtime. Each sync attempt therefore runs
//! on its own OS thread driving a private current-thread runtime. The caller
//! waits for the outcome with a hard timeout; a worker that overruns is left
//! to finish on its own and its result is dropped.

use std::sync::Arc;
use std::time::Duration;
use tokio::sync::oneshot;

use crate::error::{NewsError, Result};
use crate::market::{MarketClass, normalize_ticker};
use crate::source::NewsFeed;
use crate::store::NewsStore;

/// Data-source tag written on records synced from the feed
pub const SYNC_DATA_SOURCE: &str = "akshare";

/// Fetch-and-persist bridge for A-share news
#[derive(Clone)]
pub struct NewsSyncer {
    feed: Arc<dyn NewsFeed>,
    store: Arc<dyn NewsStore>,
    timeout: Duration,
}

impl NewsSyncer {
    pub fn new(feed: Arc<dyn NewsFeed>, store: Arc<dyn NewsStore>, timeout: Duration) -> Self {
        Self {
            feed,
            store,
            timeout,
        }
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Fetch up to `limit` items for `ticker` and save them
    ///
    /// Returns `true` only when at least one record was written. Timeouts,
    /// feed errors, store errors and worker panics all yield `false`.
    pub async fn sync(&self, ticker: &str, limit: usize) -> bool {
        let symbol = normalize_ticker(ticker);
        tracing::info!(symbol = %symbol, limit, "Syncing news from remote feed");

        let rx = match self.spawn_worker(symbol.clone(), limit) {
            Ok(rx) => rx,
            Err(e) => {
                tracing::warn!(symbol = %symbol, error = %e, "Failed to start sync worker");
                return false;
            }
        };

        match tokio::time::timeout(self.timeout, rx).await {
            Ok(Ok(Ok(saved))) if saved > 0 => {
                tracing::info!(symbol = %symbol, saved, "News sync completed");
                true
            }
            Ok(Ok(Ok(_))) => {
                tracing::warn!(symbol = %symbol, "News sync returned no records");
                false
            }
            Ok(Ok(Err(e))) => {
                tracing::warn!(symbol = %symbol, error = %e, "News sync failed");
                false
            }
            Ok(Err(_)) => {
                tracing::error!(symbol = %symbol, "News sync worker exited without a result");
                false
            }
            Err(_) => {
                tracing::warn!(
                    symbol = %symbol,
                    timeout_secs = self.timeout.as_secs_f64(),
                    "News sync timed out, abandoning worker"
                );
                false
            }
        }
    }

    fn spawn_worker(&self, symbol: String, limit: usize) -> Result<oneshot::Receiver<Result<usize>>> {
        let (tx, rx) = oneshot::channel();
        let feed = Arc::clone(&self.feed);
        let store = Arc::clone(&self.store);

        // Thread names cannot hold interior NULs, so the ticker stays out of it
        std::thread::Builder::new()
            .name("news-sync".to_string())
            .spawn(move || {
                let outcome = run_sync(feed.as_ref(), store.as_ref(), &symbol, limit);
                // The caller may have timed out and dropped the receiver
                let _ = tx.send(outcome);
            })
            .map_err(|e| NewsError::SyncError(format!("Failed to spawn sync thread: {e}")))?;

        Ok(rx)
    }
}

fn run_sync(feed: &dyn NewsFeed, store: &dyn NewsStore, symbol: &str, limit: usize) -> Result<usize> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .map_err(|e| NewsError::SyncError(format!("Failed to build sync runtime: {e}")))?;

    let records = runtime.block_on(feed.fetch_stock_news(symbol, limit))?;
    if records.is_empty() {
        return Ok(0);
    }

    store.save_news(&records, SYNC_DATA_SOURCE, MarketClass::ChinaA.store_tag())
}

impl std::fmt::Debug for NewsSyncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("NewsSyncer")
            .field("timeout", &self.timeout)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::NewsRecord;
    use crate::store::{MemoryNewsStore, NewsQuery};
    use async_trait::async_trait;
    use chrono::Utc;

    enum FeedBehavior {
        Records(usize),
        Fail,
        Slow(Duration),
        Panic,
    }

    struct FakeFeed(FeedBehavior);

    #[async_trait]
    impl NewsFeed for FakeFeed {
        async fn fetch_stock_news(&self, symbol: &str, limit: usize) -> Result<Vec<NewsRecord>> {
            match &self.0 {
                FeedBehavior::Records(n) => Ok((0..(*n).min(limit))
                    .map(|i| NewsRecord::new(symbol, format!("headline {i}"), Utc::now()))
                    .collect()),
                FeedBehavior::Fail => Err(NewsError::ApiError("feed down".to_string())),
                FeedBehavior::Slow(delay) => {
                    tokio::time::sleep(*delay).await;
                    Ok(vec![NewsRecord::new(symbol, "late", Utc::now())])
                }
                FeedBehavior::Panic => panic!("feed exploded"),
            }
        }
    }

    fn syncer(behavior: FeedBehavior, store: Arc<MemoryNewsStore>, timeout: Duration) -> NewsSyncer {
        NewsSyncer::new(Arc::new(FakeFeed(behavior)), store, timeout)
    }

    #[tokio::test]
    async fn test_sync_saves_records() {
        let store = Arc::new(MemoryNewsStore::new());
        let syncer = syncer(FeedBehavior::Records(3), Arc::clone(&store), Duration::from_secs(5));

        assert!(syncer.sync("600519", 10).await);

        let found = store.find_news(&NewsQuery::new("600519", 10)).unwrap();
        assert_eq!(found.len(), 3);
        assert!(found.iter().all(|r| r.market == "CN" && r.data_source == SYNC_DATA_SOURCE));
    }

    #[tokio::test]
    async fn test_sync_normalizes_symbol() {
        let store = Arc::new(MemoryNewsStore::new());
        let syncer = syncer(FeedBehavior::Records(1), Arc::clone(&store), Duration::from_secs(5));

        assert!(syncer.sync("000001.SZ", 5).await);
        assert_eq!(store.find_news(&NewsQuery::new("000001", 5)).unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_sync_failures_are_false() {
        let store = Arc::new(MemoryNewsStore::new());

        assert!(!syncer(FeedBehavior::Fail, Arc::clone(&store), Duration::from_secs(5)).sync("600519", 10).await);
        assert!(!syncer(FeedBehavior::Records(0), Arc::clone(&store), Duration::from_secs(5)).sync("600519", 10).await);
        assert!(!syncer(FeedBehavior::Panic, Arc::clone(&store), Duration::from_secs(5)).sync("600519", 10).await);
        assert!(store.is_empty());
    }

    #[tokio::test]
    async fn test_sync_timeout_abandons_worker() {
        let store = Arc::new(MemoryNewsStore::new());
        let syncer = syncer(
            FeedBehavior::Slow(Duration::from_secs(2)),
            Arc::clone(&store),
            Duration::from_millis(50),
        );

        let started = std::time::Instant::now();
        assert!(!syncer.sync("600519", 10).await);
        assert!(started.elapsed() < Duration::from_secs(2));
    }

    #[tokio::test]
    async fn test_sync_ticker_with_nul_byte() {
        let store = Arc::new(MemoryNewsStore::new());
        let syncer = syncer(FeedBehavior::Records(1), Arc::clone(&store), Duration::from_secs(5));

        assert!(syncer.sync("600\u{0}519", 5).await);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn test_sync_from_plain_thread() {
        // Callers outside any runtime can drive the bridge with a fresh one
        let store = Arc::new(MemoryNewsStore::new());
        let syncer = syncer(FeedBehavior::Records(2), Arc::clone(&store), Duration::from_secs(5));
        let runtime = tokio::runtime::Runtime::new().unwrap();

        assert!(runtime.block_on(syncer.sync("600519", 10)));
        assert_eq!(store.len(), 2);
    }
}
