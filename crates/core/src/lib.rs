//! Shared building blocks for the toolbelt command-line tools.
//!
//! This crate provides:
//! - Per-tool context and layered configuration
//! - Response cache with SQLite backend and fixed TTL
//! - Named conversation sessions
//! - JSON / human output formatting
//! - Unified error types

pub mod cache;
pub mod clock;
pub mod config;
pub mod error;
pub mod output;
pub mod session;

pub use cache::{CacheDb, CacheKey, ResponseCache};
pub use clock::{Clock, ManualClock, SystemClock};
pub use config::{ConfigError, ToolConfig, ToolContext, ToolSpec};
pub use error::Error;
pub use output::{OutputMode, Render, Style};
pub use session::{Message, Role, SessionStore};
