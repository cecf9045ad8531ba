//! Fixed-interval retry of transient failures
//!
//! A transient failure (connection error, or HTTP 500/503/504 from the
//! service) is attempted again after a fixed interval, once by default.
//! Timeouts and payload statuses are returned from the first attempt.
//!
//! # Example
//!
//! ```rust,ignore
//! use integration_distance_matrix::retry::{RetryConfig, with_retry};
//!
//! let outcome = with_retry(&RetryConfig::default(), || async {
//!     transport.send(request.clone()).await
//! })
//! .await;
//! let response = outcome.into_result()?;
//! ```

use std::fmt::Display;
use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::time::Instant;
use tracing::{debug, warn};

use crate::error::DistanceMatrixError;

/// How transient failures are re-attempted
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Pause before a re-attempt, in milliseconds (default: 500ms)
    #[serde(default = "default_interval_ms")]
    pub interval_ms: u64,

    /// Re-attempts allowed after the first attempt (default: 1)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
}

const fn default_interval_ms() -> u64 {
    500
}

const fn default_max_retries() -> u32 {
    1
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            interval_ms: default_interval_ms(),
            max_retries: default_max_retries(),
        }
    }
}

impl RetryConfig {
    /// Default retry count with a custom interval
    #[must_use]
    pub const fn with_interval_ms(interval_ms: u64) -> Self {
        Self {
            interval_ms,
            max_retries: default_max_retries(),
        }
    }

    /// Single attempt, no retry
    #[must_use]
    pub const fn disabled() -> Self {
        Self {
            interval_ms: 0,
            max_retries: 0,
        }
    }

    /// Pause before a re-attempt
    #[must_use]
    pub const fn interval(&self) -> Duration {
        Duration::from_millis(self.interval_ms)
    }
}

/// Errors that know whether another attempt could succeed
pub trait Retryable {
    /// Whether the failed operation may be attempted again
    fn is_retryable(&self) -> bool;
}

impl Retryable for DistanceMatrixError {
    fn is_retryable(&self) -> bool {
        self.is_transient()
    }
}

/// Final result of a retried operation with attempt bookkeeping
#[derive(Debug)]
pub struct RetryOutcome<T, E> {
    /// Result of the last attempt
    pub result: Result<T, E>,
    /// Attempts made, including the first
    pub attempts: u32,
    /// Time from the first attempt to the final result
    pub elapsed: Duration,
}

impl<T, E> RetryOutcome<T, E> {
    /// Whether the last attempt succeeded
    #[must_use]
    pub const fn is_ok(&self) -> bool {
        self.result.is_ok()
    }

    /// Drop the bookkeeping
    pub fn into_result(self) -> Result<T, E> {
        self.result
    }
}

/// Run `operation`, re-attempting retryable failures
///
/// Makes at most `1 + config.max_retries` attempts, pausing
/// `config.interval()` before each re-attempt.
pub async fn with_retry<F, Fut, T, E>(config: &RetryConfig, mut operation: F) -> RetryOutcome<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: Retryable + Display,
{
    let start = Instant::now();
    let mut attempts = 0u32;

    let result = loop {
        attempts += 1;

        match operation().await {
            Ok(value) => break Ok(value),
            Err(err) if err.is_retryable() && attempts <= config.max_retries => {
                warn!(
                    attempt = attempts,
                    delay_ms = config.interval_ms,
                    error = %err,
                    "Transient failure, retrying"
                );
                tokio::time::sleep(config.interval()).await;
            },
            Err(err) => {
                debug!(attempts, error = %err, "Giving up");
                break Err(err);
            },
        }
    };

    if attempts > 1 && result.is_ok() {
        debug!(attempts, "Succeeded after retry");
    }

    RetryOutcome {
        result,
        attempts,
        elapsed: start.elapsed(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use super::*;

    fn unavailable() -> DistanceMatrixError {
        DistanceMatrixError::ServiceUnavailable { status: 503 }
    }

    /// Operation that fails with `make_err` for the first `failures` calls
    fn failing_then_ok(
        failures: u32,
        make_err: fn() -> DistanceMatrixError,
    ) -> (
        Arc<AtomicU32>,
        impl FnMut() -> std::future::Ready<Result<u32, DistanceMatrixError>>,
    ) {
        let calls = Arc::new(AtomicU32::new(0));
        let counter = Arc::clone(&calls);
        let operation = move || {
            let call = counter.fetch_add(1, Ordering::SeqCst) + 1;
            std::future::ready(if call <= failures { Err(make_err()) } else { Ok(call) })
        };
        (calls, operation)
    }

    #[test]
    fn test_default_config() {
        let config = RetryConfig::default();
        assert_eq!(config.interval_ms, 500);
        assert_eq!(config.max_retries, 1);
        assert_eq!(config.interval(), Duration::from_millis(500));
    }

    #[test]
    fn test_partial_config_fills_defaults() {
        let config: RetryConfig = serde_json::from_str(r#"{"interval_ms":200}"#).unwrap();
        assert_eq!(config, RetryConfig::with_interval_ms(200));
    }

    #[tokio::test]
    async fn test_first_attempt_success() {
        let (calls, operation) = failing_then_ok(0, unavailable);
        let outcome = with_retry(&RetryConfig::default(), operation).await;

        assert!(outcome.is_ok());
        assert_eq!(outcome.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test(start_paused = true)]
    async fn test_transient_failure_retried_after_interval() {
        let (_, operation) = failing_then_ok(1, unavailable);
        let outcome = with_retry(&RetryConfig::default(), operation).await;

        assert_eq!(outcome.attempts, 2);
        assert!(outcome.elapsed >= Duration::from_millis(500));
        assert_eq!(outcome.into_result().unwrap(), 2);
    }

    #[tokio::test(start_paused = true)]
    async fn test_second_transient_failure_is_returned() {
        let (calls, operation) = failing_then_ok(u32::MAX, unavailable);
        let outcome = with_retry(&RetryConfig::default(), operation).await;

        assert_eq!(outcome.attempts, 2);
        assert_eq!(calls.load(Ordering::SeqCst), 2);
        assert!(matches!(
            outcome.into_result(),
            Err(DistanceMatrixError::ServiceUnavailable { status: 503 })
        ));
    }

    #[tokio::test]
    async fn test_timeout_not_retried() {
        let (calls, operation) =
            failing_then_ok(u32::MAX, || DistanceMatrixError::Timeout { timeout_ms: 100 });
        let outcome = with_retry(&RetryConfig::default(), operation).await;

        assert_eq!(outcome.attempts, 1);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_disabled_makes_single_attempt() {
        let (calls, operation) = failing_then_ok(u32::MAX, unavailable);
        let outcome = with_retry(&RetryConfig::disabled(), operation).await;

        assert!(!outcome.is_ok());
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
