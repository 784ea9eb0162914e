//! SQLite-backed response cache with a fixed time-to-live.
//!
//! This module provides a persistent key-value cache using SQLite
//! with async access via tokio-rusqlite. It supports:
//!
//! - Keys derived from SHA-256 of (endpoint, sorted query parameters)
//! - Time-based staleness only; no size limit or LRU eviction
//! - Automatic schema migrations
//! - An injectable [`Clock`] so staleness can be tested without sleeping

use std::fmt::Debug;

use async_trait::async_trait;
use serde_json::Value;

pub mod connection;
pub mod entries;
pub mod hash;
pub mod migrations;

pub use crate::Error;

pub use crate::clock::{Clock, ManualClock, SystemClock};
pub use connection::CacheDb;
pub use entries::CacheStats;
pub use hash::CacheKey;

/// Lookup/store interface for cached provider responses.
///
/// `get` reports a miss for absent and for stale entries alike.
#[async_trait]
pub trait ResponseCache: Send + Sync + Debug {
    async fn get(&self, key: &CacheKey) -> Result<Option<Value>, Error>;

    async fn put(&self, key: &CacheKey, value: &Value) -> Result<(), Error>;
}
