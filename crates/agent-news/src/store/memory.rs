//! In-process news store

use std::sync::{PoisonError, RwLock};

use super::{NewsQuery, NewsStore};
use crate::error::Result;
use crate::models::NewsRecord;

/// News store kept in memory, useful for tests and one-shot CLI runs
#[derive(Debug, Default)]
pub struct MemoryNewsStore {
    records: RwLock<Vec<NewsRecord>>,
}

impl MemoryNewsStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store pre-populated with `records`, kept as given
    pub fn with_records(records: Vec<NewsRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }

    /// Number of records held
    pub fn len(&self) -> usize {
        self.records.read().unwrap_or_else(PoisonError::into_inner).len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl NewsStore for MemoryNewsStore {
    fn find_news(&self, query: &NewsQuery) -> Result<Vec<NewsRecord>> {
        let records = self.records.read().unwrap_or_else(PoisonError::into_inner);
        let mut found: Vec<NewsRecord> = records
            .iter()
            .filter(|r| r.mentions(&query.symbol))
            .filter(|r| query.since.is_none_or(|since| r.publish_time >= since))
            .cloned()
            .collect();
        found.sort_by(|a, b| b.publish_time.cmp(&a.publish_time));
        found.truncate(query.limit);
        Ok(found)
    }

    fn save_news(&self, records: &[NewsRecord], data_source: &str, market: &str) -> Result<usize> {
        let mut stored = self.records.write().unwrap_or_else(PoisonError::into_inner);
        for record in records {
            let mut record = record.clone();
            if record.id.is_empty() {
                record.id = uuid::Uuid::new_v4().to_string();
            }
            record.data_source = data_source.to_string();
            record.market = market.to_string();

            let existing = stored.iter_mut().find(|r| {
                r.symbol == record.symbol
                    && r.title == record.title
                    && r.publish_time == record.publish_time
            });
            match existing {
                Some(slot) => {
                    record.id = slot.id.clone();
                    *slot = record;
                }
                None => stored.push(record),
            }
        }
        Ok(records.len())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, Utc};

    fn record(symbol: &str, title: &str, days_ago: i64) -> NewsRecord {
        NewsRecord::new(symbol, title, Utc::now() - Duration::days(days_ago))
    }

    #[test]
    fn test_find_sorted_and_limited() {
        let store = MemoryNewsStore::new();
        store
            .save_news(
                &[
                    record("600519", "old", 10),
                    record("600519", "new", 1),
                    record("600519", "mid", 5),
                    record("000001", "other", 1),
                ],
                "akshare",
                "CN",
            )
            .unwrap();

        let found = store.find_news(&NewsQuery::new("600519", 2)).unwrap();
        let titles: Vec<_> = found.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["new", "mid"]);
        assert!(found.iter().all(|r| r.market == "CN" && r.data_source == "akshare"));
        assert!(found.iter().all(|r| !r.id.is_empty()));
    }

    #[test]
    fn test_find_respects_since_and_symbols() {
        let mut mentioned = record("000858", "sector piece", 2);
        mentioned.symbols = vec!["600519".to_string()];
        let store = MemoryNewsStore::new();
        store
            .save_news(&[record("600519", "stale", 40), mentioned], "akshare", "CN")
            .unwrap();

        let query = NewsQuery::new("600519", 10).since(Utc::now() - Duration::days(30));
        let found = store.find_news(&query).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "sector piece");
    }

    #[test]
    fn test_save_is_upsert() {
        let store = MemoryNewsStore::new();
        let item = record("600519", "same", 1);
        store.save_news(&[item.clone()], "akshare", "CN").unwrap();
        store
            .save_news(&[item.with_content("updated")], "akshare", "CN")
            .unwrap();

        assert_eq!(store.len(), 1);
        let found = store.find_news(&NewsQuery::new("600519", 10)).unwrap();
        assert_eq!(found[0].content, "updated");
    }
}
