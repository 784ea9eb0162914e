//! Opening the cache database.

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use tokio_rusqlite::Connection;

use super::migrations;
use crate::Error;
use crate::clock::{Clock, SystemClock};

const PRAGMAS: &str = "PRAGMA journal_mode=WAL;
     PRAGMA synchronous=NORMAL;
     PRAGMA temp_store=MEMORY;";

/// Handle to the cache database plus the freshness window and the clock
/// that judges it. Queries run on tokio-rusqlite's background thread.
#[derive(Clone, Debug)]
pub struct CacheDb {
    pub(crate) conn: Connection,
    pub(crate) ttl: Duration,
    pub(crate) clock: Arc<dyn Clock>,
}

impl CacheDb {
    /// Open or create `path` and migrate it. The parent directory must exist.
    pub async fn open(path: impl AsRef<Path>, ttl: Duration) -> Result<Self, Error> {
        let conn = Connection::open(path).await.map_err(|e| Error::Database(e.into()))?;
        Self::init(conn, ttl).await
    }

    /// Throwaway database, used by tests.
    pub async fn open_in_memory(ttl: Duration) -> Result<Self, Error> {
        let conn = Connection::open_in_memory()
            .await
            .map_err(|e| Error::Database(e.into()))?;
        Self::init(conn, ttl).await
    }

    async fn init(conn: Connection, ttl: Duration) -> Result<Self, Error> {
        conn.call(|conn| {
            conn.execute_batch(PRAGMAS)?;
            Ok(())
        })
        .await
        .map_err(Error::Database)?;

        migrations::run(&conn).await?;

        Ok(Self { conn, ttl, clock: Arc::new(SystemClock) })
    }

    /// Replace the time source used for freshness checks.
    pub fn with_clock(mut self, clock: Arc<dyn Clock>) -> Self {
        self.clock = clock;
        self
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
