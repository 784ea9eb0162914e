//! Cache entry reads, writes and housekeeping.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use tokio_rusqlite::{params, rusqlite};

use super::connection::CacheDb;
use super::hash::CacheKey;
use super::ResponseCache;
use crate::Error;
use crate::output::{Panel, Render, Style};

/// Entry counts reported by `cache stats`.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct CacheStats {
    pub entries: u64,
    pub fresh: u64,
    pub stale: u64,
    pub ttl_secs: u64,
}

impl CacheDb {
    fn now_ms(&self) -> i64 {
        self.clock.now().timestamp_millis()
    }

    fn ttl_ms(&self) -> i64 {
        i64::try_from(self.ttl.as_millis()).unwrap_or(i64::MAX)
    }

    /// Fetch a fresh entry. Absent and stale entries both yield `None`.
    pub async fn get_entry(&self, key: &CacheKey) -> Result<Option<Value>, Error> {
        let key_hash = key.as_str().to_string();
        let row = self
            .conn
            .call(move |conn| -> Result<Option<(String, i64)>, Error> {
                let mut stmt =
                    conn.prepare("SELECT value_json, fetched_at_ms FROM response_cache WHERE cache_key = ?1")?;

                let result = stmt.query_row(params![key_hash], |row| Ok((row.get(0)?, row.get(1)?)));

                match result {
                    Ok(row) => Ok(Some(row)),
                    Err(rusqlite::Error::QueryReturnedNoRows) => Ok(None),
                    Err(e) => Err(e.into()),
                }
            })
            .await
            .map_err(Error::from)?;

        let Some((value_json, fetched_at_ms)) = row else {
            tracing::debug!(endpoint = key.endpoint(), "cache miss");
            return Ok(None);
        };

        let age_ms = self.now_ms() - fetched_at_ms;
        if age_ms >= self.ttl_ms() {
            tracing::debug!(endpoint = key.endpoint(), age_ms, "cache entry stale");
            return Ok(None);
        }

        tracing::debug!(endpoint = key.endpoint(), age_ms, "cache hit");
        Ok(Some(serde_json::from_str(&value_json)?))
    }

    /// Insert or replace an entry, stamped with the clock's current time.
    pub async fn put_entry(&self, key: &CacheKey, value: &Value) -> Result<(), Error> {
        let key_hash = key.as_str().to_string();
        let endpoint = key.endpoint().to_string();
        let value_json = serde_json::to_string(value)?;
        let fetched_at_ms = self.now_ms();

        self.conn
            .call(move |conn| -> Result<(), Error> {
                conn.execute(
                    "INSERT INTO response_cache (cache_key, endpoint, value_json, fetched_at_ms)
                    VALUES (?1, ?2, ?3, ?4)
                    ON CONFLICT(cache_key) DO UPDATE SET
                        endpoint = excluded.endpoint,
                        value_json = excluded.value_json,
                        fetched_at_ms = excluded.fetched_at_ms",
                    params![key_hash, endpoint, value_json, fetched_at_ms],
                )?;
                Ok(())
            })
            .await
            .map_err(Error::from)
    }

    /// Delete entries older than the TTL.
    ///
    /// Returns the number of deleted entries.
    pub async fn purge_expired(&self) -> Result<u64, Error> {
        let cutoff = self.now_ms().saturating_sub(self.ttl_ms());
        let deleted = self
            .conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM response_cache WHERE fetched_at_ms <= ?1", params![cutoff])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)?;
        if deleted > 0 {
            tracing::debug!(deleted, "purged stale cache entries");
        }
        Ok(deleted)
    }

    /// Delete every entry.
    ///
    /// Returns the number of deleted entries.
    pub async fn clear(&self) -> Result<u64, Error> {
        self.conn
            .call(move |conn| -> Result<u64, Error> {
                let count = conn.execute("DELETE FROM response_cache", [])?;
                Ok(count as u64)
            })
            .await
            .map_err(Error::from)
    }

    pub async fn stats(&self) -> Result<CacheStats, Error> {
        let cutoff = self.now_ms().saturating_sub(self.ttl_ms());
        let (entries, fresh) = self
            .conn
            .call(move |conn| -> Result<(i64, i64), Error> {
                let row = conn.query_row(
                    "SELECT COUNT(*), COALESCE(SUM(CASE WHEN fetched_at_ms > ?1 THEN 1 ELSE 0 END), 0)
                    FROM response_cache",
                    params![cutoff],
                    |row| Ok((row.get(0)?, row.get(1)?)),
                )?;
                Ok(row)
            })
            .await
            .map_err(Error::from)?;

        let entries = entries.max(0) as u64;
        let fresh = fresh.max(0) as u64;
        Ok(CacheStats { entries, fresh, stale: entries - fresh, ttl_secs: self.ttl.as_secs() })
    }
}

#[async_trait]
impl ResponseCache for CacheDb {
    async fn get(&self, key: &CacheKey) -> Result<Option<Value>, Error> {
        self.get_entry(key).await
    }

    async fn put(&self, key: &CacheKey, value: &Value) -> Result<(), Error> {
        self.put_entry(key, value).await
    }
}

impl Render for CacheStats {
    fn render(&self, style: &Style) -> String {
        Panel::new("Cache")
            .field("Entries", self.entries.to_string())
            .field("Fresh", self.fresh.to_string())
            .field("Stale", self.stale.to_string())
            .field("TTL", format!("{} s", self.ttl_secs))
            .render(style)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::time::Duration;

    use chrono::Utc;
    use serde_json::json;

    use super::*;
    use crate::cache::ManualClock;

    const TTL: Duration = Duration::from_secs(300);

    async fn db_with_clock() -> (CacheDb, ManualClock) {
        let clock = ManualClock::new(Utc::now());
        let db = CacheDb::open_in_memory(TTL).await.unwrap().with_clock(Arc::new(clock.clone()));
        (db, clock)
    }

    fn london() -> CacheKey {
        CacheKey::new("weather", [("q", "London"), ("units", "metric")])
    }

    #[tokio::test]
    async fn test_put_then_get_returns_value() {
        let (db, _clock) = db_with_clock().await;
        let value = json!({"temperature": 12.5, "condition": "Light rain"});

        db.put(&london(), &value).await.unwrap();

        assert_eq!(db.get(&london()).await.unwrap(), Some(value));
    }

    #[tokio::test]
    async fn test_get_missing() {
        let (db, _clock) = db_with_clock().await;
        assert!(db.get(&london()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_entry_fresh_just_before_ttl() {
        let (db, clock) = db_with_clock().await;
        db.put(&london(), &json!(1)).await.unwrap();
        clock.advance(chrono::Duration::seconds(299));
        assert!(db.get(&london()).await.unwrap().is_some());
    }

    #[tokio::test]
    async fn test_entry_stale_after_ttl() {
        let (db, clock) = db_with_clock().await;
        db.put(&london(), &json!(1)).await.unwrap();
        clock.advance(chrono::Duration::seconds(300));
        assert!(db.get(&london()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_put_refreshes_timestamp() {
        let (db, clock) = db_with_clock().await;
        db.put(&london(), &json!({"v": 1})).await.unwrap();
        clock.advance(chrono::Duration::seconds(200));
        db.put(&london(), &json!({"v": 2})).await.unwrap();
        clock.advance(chrono::Duration::seconds(200));

        assert_eq!(db.get(&london()).await.unwrap(), Some(json!({"v": 2})));
    }

    #[tokio::test]
    async fn test_purge_expired() {
        let (db, clock) = db_with_clock().await;
        let old = CacheKey::new("weather", [("q", "Paris")]);
        db.put(&old, &json!("old")).await.unwrap();
        clock.advance(chrono::Duration::seconds(400));
        db.put(&london(), &json!("new")).await.unwrap();

        let deleted = db.purge_expired().await.unwrap();
        assert_eq!(deleted, 1);
        assert!(db.get(&london()).await.unwrap().is_some());

        let stats = db.stats().await.unwrap();
        assert_eq!(stats, CacheStats { entries: 1, fresh: 1, stale: 0, ttl_secs: 300 });
    }

    #[tokio::test]
    async fn test_stats_and_clear() {
        let (db, clock) = db_with_clock().await;
        db.put(&CacheKey::new("weather", [("q", "Oslo")]), &json!(1)).await.unwrap();
        clock.advance(chrono::Duration::seconds(301));
        db.put(&london(), &json!(2)).await.unwrap();

        let stats = db.stats().await.unwrap();
        assert_eq!(stats.entries, 2);
        assert_eq!(stats.fresh, 1);
        assert_eq!(stats.stale, 1);

        assert_eq!(db.clear().await.unwrap(), 2);
        assert_eq!(db.stats().await.unwrap().entries, 0);
    }
}
