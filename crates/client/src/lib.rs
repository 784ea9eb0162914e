//! Provider clients for the toolbelt command-line tools.
//!
//! This crate provides the HTTP client wrapper with authentication and
//! retry/backoff, plus one typed client per provider:
//! OpenWeatherMap, xAI Grok and Airtable.

pub mod airtable;
pub mod grok;
pub mod http;
pub mod retry;
pub mod weather;

pub use http::{ApiClient, ApiError, ApiRequest, Auth, ClientConfig};
pub use retry::{RecordingSleeper, RetryPolicy, Sleeper, TokioSleeper};
