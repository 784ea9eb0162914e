//! Retry with exponential backoff for rate-limited and failing providers.
//!
//! Only HTTP 429 and 5xx responses are retried (see [`ApiError::is_retryable`]).
//! The default schedule waits 1s, 2s and 4s before giving up after the fourth
//! attempt. A `Retry-After` header replaces the computed delay, still capped at
//! `max_delay`.

use std::fmt::Debug;
use std::future::Future;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use rand::Rng;

use crate::http::ApiError;

/// Default number of retries after the first attempt.
pub const DEFAULT_MAX_RETRIES: u32 = 3;

const DEFAULT_INITIAL_DELAY: Duration = Duration::from_secs(1);
const DEFAULT_MULTIPLIER: f64 = 2.0;
const DEFAULT_MAX_DELAY: Duration = Duration::from_secs(30);

/// Backoff schedule shared by every tool.
#[derive(Debug, Clone, PartialEq)]
pub struct RetryPolicy {
    /// Retries after the first attempt.
    pub max_retries: u32,
    /// Delay before the first retry.
    pub initial_delay: Duration,
    /// Growth factor between consecutive delays.
    pub multiplier: f64,
    /// Upper bound for any single delay, including `Retry-After`.
    pub max_delay: Duration,
    /// Fraction of each delay added or removed at random (0 disables).
    pub jitter: f64,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: DEFAULT_MAX_RETRIES,
            initial_delay: DEFAULT_INITIAL_DELAY,
            multiplier: DEFAULT_MULTIPLIER,
            max_delay: DEFAULT_MAX_DELAY,
            jitter: 0.0,
        }
    }
}

impl RetryPolicy {
    /// A policy that never retries.
    pub fn none() -> Self {
        Self { max_retries: 0, ..Self::default() }
    }

    pub fn with_max_retries(mut self, max_retries: u32) -> Self {
        self.max_retries = max_retries;
        self
    }

    pub fn with_jitter(mut self, jitter: f64) -> Self {
        self.jitter = jitter.clamp(0.0, 1.0);
        self
    }

    /// Computed delay before retry number `retry` (0-based), without jitter.
    pub fn delay_for(&self, retry: u32) -> Duration {
        let exponent = i32::try_from(retry).unwrap_or(i32::MAX);
        let secs = self.initial_delay.as_secs_f64() * self.multiplier.powi(exponent);
        if !secs.is_finite() || secs >= self.max_delay.as_secs_f64() {
            return self.max_delay;
        }
        Duration::from_secs_f64(secs.max(0.0))
    }

    fn wait_before(&self, retry: u32, err: &ApiError) -> Duration {
        if let Some(retry_after) = err.retry_after() {
            return retry_after.min(self.max_delay);
        }
        let base = self.delay_for(retry);
        if self.jitter <= 0.0 {
            return base;
        }
        let factor = 1.0 + rand::rng().random_range(-self.jitter..=self.jitter);
        base.mul_f64(factor.max(0.0)).min(self.max_delay)
    }

    /// Run `operation` until it succeeds, fails with a non-retryable error,
    /// or the retries are used up. The last error is returned.
    pub async fn run<T, F, Fut>(&self, sleeper: &dyn Sleeper, mut operation: F) -> Result<T, ApiError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ApiError>>,
    {
        let mut retry = 0;
        loop {
            match operation().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_retryable() && retry < self.max_retries => {
                    let wait = self.wait_before(retry, &err);
                    tracing::warn!(
                        attempt = retry + 1,
                        max_retries = self.max_retries,
                        wait_ms = wait.as_millis() as u64,
                        error = %err,
                        "retrying request"
                    );
                    sleeper.sleep(wait).await;
                    retry += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }
}

/// Waits between attempts.
#[async_trait]
pub trait Sleeper: Send + Sync + Debug {
    async fn sleep(&self, duration: Duration);
}

/// Sleeps on the tokio timer.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioSleeper;

#[async_trait]
impl Sleeper for TokioSleeper {
    async fn sleep(&self, duration: Duration) {
        tokio::time::sleep(duration).await;
    }
}

/// Records requested waits and returns immediately.
#[derive(Debug, Clone, Default)]
pub struct RecordingSleeper {
    waits: Arc<Mutex<Vec<Duration>>>,
}

impl RecordingSleeper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn waits(&self) -> Vec<Duration> {
        self.waits.lock().map(|w| w.clone()).unwrap_or_default()
    }

    pub fn total(&self) -> Duration {
        self.waits().iter().sum()
    }
}

#[async_trait]
impl Sleeper for RecordingSleeper {
    async fn sleep(&self, duration: Duration) {
        if let Ok(mut waits) = self.waits.lock() {
            waits.push(duration);
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn rate_limited() -> ApiError {
        ApiError::RateLimited { retry_after: None }
    }

    #[test]
    fn test_default_schedule() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(0), Duration::from_secs(1));
        assert_eq!(policy.delay_for(1), Duration::from_secs(2));
        assert_eq!(policy.delay_for(2), Duration::from_secs(4));
    }

    #[test]
    fn test_delay_capped() {
        let policy = RetryPolicy::default();
        assert_eq!(policy.delay_for(10), Duration::from_secs(30));
        assert_eq!(policy.delay_for(u32::MAX), Duration::from_secs(30));
    }

    #[test]
    fn test_jitter_stays_in_bounds() {
        let policy = RetryPolicy::default().with_jitter(0.1);
        for _ in 0..50 {
            let wait = policy.wait_before(1, &rate_limited());
            assert!(wait >= Duration::from_millis(1799) && wait <= Duration::from_millis(2201), "{wait:?}");
        }
    }

    #[test]
    fn test_retry_after_overrides_and_is_capped() {
        let policy = RetryPolicy::default();
        let err = ApiError::RateLimited { retry_after: Some(Duration::from_secs(5)) };
        assert_eq!(policy.wait_before(0, &err), Duration::from_secs(5));

        let err = ApiError::RateLimited { retry_after: Some(Duration::from_secs(600)) };
        assert_eq!(policy.wait_before(0, &err), Duration::from_secs(30));
    }

    #[tokio::test]
    async fn test_succeeds_after_transient_failures() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);

        let result = RetryPolicy::default()
            .run(&sleeper, || async {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 { Err(rate_limited()) } else { Ok("ok") }
            })
            .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
        assert_eq!(sleeper.waits(), [Duration::from_secs(1), Duration::from_secs(2)]);
    }

    #[tokio::test]
    async fn test_exhausted_returns_last_error() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = RetryPolicy::default()
            .run(&sleeper, || async {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::Server { status: 500 + n as u16, message: format!("attempt {n}") })
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 4);
        match result {
            Err(ApiError::Server { status, message }) => {
                assert_eq!(status, 503);
                assert_eq!(message, "attempt 3");
            }
            other => panic!("unexpected result: {other:?}"),
        }
        assert_eq!(sleeper.total(), Duration::from_secs(7));
    }

    #[tokio::test]
    async fn test_non_retryable_fails_immediately() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);

        let result: Result<(), _> = RetryPolicy::default()
            .run(&sleeper, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(ApiError::Provider { status: 400, message: "bad request".into() })
            })
            .await;

        assert!(matches!(result, Err(ApiError::Provider { status: 400, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(sleeper.waits().is_empty());
    }

    #[tokio::test]
    async fn test_none_policy_does_not_retry() {
        let sleeper = RecordingSleeper::new();
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = RetryPolicy::none()
            .run(&sleeper, || async {
                calls.fetch_add(1, Ordering::SeqCst);
                Err(rate_limited())
            })
            .await;
        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
