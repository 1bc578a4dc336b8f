//! SQLite-backed news store

use chrono::{DateTime, SecondsFormat, Utc};
use rusqlite::{Connection, params};
use std::path::Path;
use std::sync::Mutex;

use super::{NewsQuery, NewsStore};
use crate::error::{NewsError, Result};
use crate::models::{NewsRecord, NewsSentiment};

const SELECT_COLS: &str = "id, symbol, symbols, title, content, summary, source, url, \
                           publish_time, sentiment, market, data_source";

fn run_migrations(conn: &Connection) -> Result<()> {
    conn.execute_batch(
        "
        CREATE TABLE IF NOT EXISTS stock_news (
            id TEXT PRIMARY KEY,
            symbol TEXT NOT NULL,
            symbols TEXT NOT NULL DEFAULT '[]',
            title TEXT NOT NULL,
            content TEXT NOT NULL DEFAULT '',
            summary TEXT NOT NULL DEFAULT '',
            source TEXT NOT NULL DEFAULT '',
            url TEXT NOT NULL DEFAULT '',
            publish_time TEXT NOT NULL,
            sentiment TEXT NOT NULL DEFAULT 'neutral',
            market TEXT NOT NULL DEFAULT '',
            data_source TEXT NOT NULL DEFAULT '',
            UNIQUE(symbol, title, publish_time)
        );

        CREATE INDEX IF NOT EXISTS idx_stock_news_symbol ON stock_news(symbol, publish_time);
        ",
    )
    .map_err(|e| NewsError::StoreError(format!("Migration failed: {e}")))
}

/// Publish times are stored as fixed-width UTC strings so they sort lexically
fn time_key(time: &DateTime<Utc>) -> String {
    time.to_rfc3339_opts(SecondsFormat::Secs, true)
}

/// News store persisted in a SQLite database
pub struct SqliteNewsStore {
    conn: Mutex<Connection>,
}

impl SqliteNewsStore {
    /// Wrap an open connection, creating the schema if needed
    pub fn new(conn: Connection) -> Result<Self> {
        run_migrations(&conn)?;
        Ok(Self {
            conn: Mutex::new(conn),
        })
    }

    /// Open (or create) a database file
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        let conn = Connection::open(path)?;
        Self::new(conn)
    }

    /// Private in-memory database
    pub fn in_memory() -> Result<Self> {
        Self::new(Connection::open_in_memory()?)
    }

    fn row_to_record(row: &rusqlite::Row) -> std::result::Result<NewsRecord, rusqlite::Error> {
        let symbols: String = row.get(2)?;
        let publish_time: String = row.get(8)?;
        let sentiment: String = row.get(9)?;

        Ok(NewsRecord {
            id: row.get(0)?,
            symbol: row.get(1)?,
            symbols: serde_json::from_str(&symbols).unwrap_or_default(),
            title: row.get(3)?,
            content: row.get(4)?,
            summary: row.get(5)?,
            source: row.get(6)?,
            url: row.get(7)?,
            publish_time: DateTime::parse_from_rfc3339(&publish_time)
                .map(|dt| dt.with_timezone(&Utc))
                .unwrap_or_else(|_| Utc::now()),
            sentiment: NewsSentiment::parse(&sentiment),
            market: row.get(10)?,
            data_source: row.get(11)?,
        })
    }
}

impl NewsStore for SqliteNewsStore {
    fn find_news(&self, query: &NewsQuery) -> Result<Vec<NewsRecord>> {
        let conn = self
            .conn
            .lock()
            .map_err(|e| NewsError::StoreError(e.to_string()))?;

        let mut sql = format!(
            "SELECT {SELECT_COLS} FROM stock_news \
             WHERE (symbol = ?1 OR EXISTS (SELECT 1 FROM json_each(stock_news.symbols) WHERE value = ?1))"
        );
        let mut values: Vec<Box<dyn rusqlite::types::ToSql>> = vec![Box::new(query.symbol.clone())];

        if let Some(since) = &query.since {
            sql.push_str(&format!(" AND publish_time >= ?{}", values.len() + 1));
            values.push(Box::new(time_key(since)));
        }
        sql.push_str(&format!(" ORDER BY publish_time DESC LIMIT ?{}", values.len() + 1));
        values.push(Box::new(i64::try_from(query.limit).unwrap_or(i64::MAX)));

        let mut stmt = conn.prepare(&sql)?;
        let refs: Vec<&dyn rusqlite::types::ToSql> = values.iter().map(AsRef::as_ref).collect();
        let rows = stmt.query_map(refs.as_slice(), Self::row_to_record)?;
        rows.collect::<std::result::Result<Vec<_>, _>>()
            .map_err(NewsError::from)
    }

    fn save_news(&self, records: &[NewsRecord], data_source: &str, market: &str) -> Result<usize> {
        let mut conn = self
            .conn
            .lock()
            .map_err(|e| NewsError::StoreError(e.to_string()))?;
        let tx = conn.transaction()?;

        let mut saved = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO stock_news (id, symbol, symbols, title, content, summary, source, url,
                                         publish_time, sentiment, market, data_source)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)
                 ON CONFLICT(symbol, title, publish_time) DO UPDATE SET
                     symbols = excluded.symbols,
                     content = excluded.content,
                     summary = excluded.summary,
                     source = excluded.source,
                     url = excluded.url,
                     sentiment = excluded.sentiment,
                     market = excluded.market,
                     data_source = excluded.data_source",
            )?;

            for record in records {
                let id = if record.id.is_empty() {
                    uuid::Uuid::new_v4().to_string()
                } else {
                    record.id.clone()
                };
                saved += stmt.execute(params![
                    id,
                    record.symbol,
                    serde_json::to_string(&record.symbols)?,
                    record.title,
                    record.content,
                    record.summary,
                    record.source,
                    record.url,
                    time_key(&record.publish_time),
                    record.sentiment.as_str(),
                    market,
                    data_source,
                ])?;
            }
        }

        tx.commit()?;
        tracing::debug!(saved, data_source, market, "Saved news records");
        Ok(saved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::Duration;

    fn record(symbol: &str, title: &str, days_ago: i64) -> NewsRecord {
        NewsRecord::new(symbol, title, Utc::now() - Duration::days(days_ago))
            .with_content(format!("{title} body"))
            .with_sentiment(NewsSentiment::Positive)
    }

    #[test]
    fn test_save_and_find() {
        let store = SqliteNewsStore::in_memory().unwrap();
        let saved = store
            .save_news(
                &[record("600519", "a", 3), record("600519", "b", 1), record("000001", "c", 1)],
                "akshare",
                "CN",
            )
            .unwrap();
        assert_eq!(saved, 3);

        let found = store.find_news(&NewsQuery::new("600519", 10)).unwrap();
        let titles: Vec<_> = found.iter().map(|r| r.title.as_str()).collect();
        assert_eq!(titles, vec!["b", "a"]);
        assert_eq!(found[0].sentiment, NewsSentiment::Positive);
        assert_eq!(found[0].market, "CN");
        assert_eq!(found[0].data_source, "akshare");
        assert_eq!(found[0].content, "b body");
    }

    #[test]
    fn test_since_and_limit() {
        let store = SqliteNewsStore::in_memory().unwrap();
        store
            .save_news(
                &[record("600519", "old", 45), record("600519", "x", 2), record("600519", "y", 1)],
                "akshare",
                "CN",
            )
            .unwrap();

        let query = NewsQuery::new("600519", 10).since(Utc::now() - Duration::days(30));
        assert_eq!(store.find_news(&query).unwrap().len(), 2);

        let query = NewsQuery::new("600519", 1);
        let found = store.find_news(&query).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].title, "y");
    }

    #[test]
    fn test_symbols_array_match() {
        let store = SqliteNewsStore::in_memory().unwrap();
        let mut item = record("000858", "liquor sector", 1);
        item.symbols = vec!["600519".to_string(), "000858".to_string()];
        store.save_news(&[item], "akshare", "CN").unwrap();

        let found = store.find_news(&NewsQuery::new("600519", 10)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].symbols.len(), 2);
    }

    #[test]
    fn test_upsert_and_file_persistence() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("news.db");
        let item = record("600519", "same", 1);

        {
            let store = SqliteNewsStore::open(&path).unwrap();
            store.save_news(&[item.clone()], "akshare", "CN").unwrap();
            store
                .save_news(&[item.with_content("revised")], "akshare", "CN")
                .unwrap();
        }

        let store = SqliteNewsStore::open(&path).unwrap();
        let found = store.find_news(&NewsQuery::new("600519", 10)).unwrap();
        assert_eq!(found.len(), 1);
        assert_eq!(found[0].content, "revised");
    }
}
