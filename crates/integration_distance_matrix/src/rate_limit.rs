//! Request admission limiter
//!
//! Sliding-window limiter shared by every submission of a client. At most
//! `limit` requests are admitted in any `period`. Requests over the limit wait
//! for capacity instead of failing; waiters are admitted in arrival order.

use std::collections::VecDeque;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::Mutex;
use tokio::time::Instant;
use tracing::debug;

/// Rate limit configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    /// Maximum requests per period (default: 50)
    #[serde(default = "default_limit")]
    pub limit: u32,

    /// Period length in milliseconds (default: 1000ms)
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
}

const fn default_limit() -> u32 {
    50
}

const fn default_period_ms() -> u64 {
    1000
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            limit: default_limit(),
            period_ms: default_period_ms(),
        }
    }
}

impl RateLimitConfig {
    /// Create a rate limit configuration
    #[must_use]
    pub const fn new(limit: u32, period_ms: u64) -> Self {
        Self { limit, period_ms }
    }

    /// Period as a duration
    #[must_use]
    pub const fn period(&self) -> Duration {
        Duration::from_millis(self.period_ms)
    }
}

/// Shared admission state
#[derive(Debug)]
pub struct RateLimiter {
    admitted: Mutex<VecDeque<Instant>>,
    limit: usize,
    period: Duration,
}

impl RateLimiter {
    /// Create a limiter from configuration
    ///
    /// A limit of zero is treated as one.
    #[must_use]
    pub fn new(config: &RateLimitConfig) -> Self {
        let limit = usize::try_from(config.limit.max(1)).unwrap_or(usize::MAX);
        Self {
            admitted: Mutex::new(VecDeque::with_capacity(limit)),
            limit,
            period: config.period(),
        }
    }

    /// Wait until a request may be sent, then record its admission
    ///
    /// The internal lock is held while waiting so that admission decisions
    /// are serialized and queued callers are admitted first-come first-served.
    /// Dropping the returned future before it completes admits nothing.
    pub async fn acquire(&self) {
        let mut admitted = self.admitted.lock().await;

        loop {
            let now = Instant::now();
            while admitted
                .front()
                .is_some_and(|t| now.duration_since(*t) >= self.period)
            {
                admitted.pop_front();
            }

            let Some(&oldest) = admitted.front() else {
                admitted.push_back(now);
                return;
            };

            if admitted.len() < self.limit {
                admitted.push_back(now);
                return;
            }

            let ready_at = oldest + self.period;
            debug!(
                wait_ms = u64::try_from(ready_at.duration_since(now).as_millis()).unwrap_or(u64::MAX),
                "Rate limit reached, deferring request"
            );
            tokio::time::sleep_until(ready_at).await;
        }
    }

    /// Number of admissions still available in the current window
    pub async fn available(&self) -> usize {
        let admitted = self.admitted.lock().await;
        let now = Instant::now();
        let in_window = admitted
            .iter()
            .filter(|t| now.duration_since(**t) < self.period)
            .count();
        self.limit.saturating_sub(in_window)
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;

    #[test]
    fn test_default_config() {
        let config = RateLimitConfig::default();
        assert_eq!(config.limit, 50);
        assert_eq!(config.period_ms, 1000);
        assert_eq!(config.period(), Duration::from_secs(1));
    }

    #[tokio::test(start_paused = true)]
    async fn test_admits_up_to_limit_immediately() {
        let limiter = RateLimiter::new(&RateLimitConfig::new(3, 1000));
        let start = Instant::now();

        for _ in 0..3 {
            limiter.acquire().await;
        }

        assert_eq!(start.elapsed(), Duration::ZERO);
        assert_eq!(limiter.available().await, 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_defers_request_over_limit_until_period_elapses() {
        let limiter = RateLimiter::new(&RateLimitConfig::new(2, 1000));
        let start = Instant::now();

        limiter.acquire().await;
        limiter.acquire().await;
        limiter.acquire().await;

        assert!(start.elapsed() >= Duration::from_millis(1000));
        assert!(start.elapsed() < Duration::from_millis(1100));
    }

    #[tokio::test(start_paused = true)]
    async fn test_window_slides() {
        let limiter = RateLimiter::new(&RateLimitConfig::new(2, 1000));
        limiter.acquire().await;
        tokio::time::sleep(Duration::from_millis(600)).await;
        limiter.acquire().await;

        // First admission expires at t=1000, second at t=1600
        let start = Instant::now();
        limiter.acquire().await;
        assert!(start.elapsed() >= Duration::from_millis(400));
        assert!(start.elapsed() < Duration::from_millis(1000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_concurrent_waiters_are_all_admitted() {
        let limiter = Arc::new(RateLimiter::new(&RateLimitConfig::new(2, 1000)));
        let start = Instant::now();

        let handles: Vec<_> = (0..5)
            .map(|_| {
                let limiter = Arc::clone(&limiter);
                tokio::spawn(async move {
                    limiter.acquire().await;
                    Instant::now()
                })
            })
            .collect();

        let mut admitted_at = Vec::new();
        for handle in handles {
            admitted_at.push(handle.await.unwrap().duration_since(start));
        }
        admitted_at.sort();

        assert_eq!(admitted_at.len(), 5);
        assert!(admitted_at[1] < Duration::from_millis(1000));
        assert!(admitted_at[2] >= Duration::from_millis(1000));
        assert!(admitted_at[4] >= Duration::from_millis(2000));
    }

    #[tokio::test(start_paused = true)]
    async fn test_dropped_waiter_does_not_consume_capacity() {
        let limiter = RateLimiter::new(&RateLimitConfig::new(1, 1000));
        limiter.acquire().await;

        let waited = tokio::time::timeout(Duration::from_millis(100), limiter.acquire()).await;
        assert!(waited.is_err());

        tokio::time::sleep(Duration::from_millis(1000)).await;
        assert_eq!(limiter.available().await, 1);
    }

    #[test]
    fn test_zero_limit_is_clamped() {
        let limiter = RateLimiter::new(&RateLimitConfig::new(0, 1000));
        assert_eq!(limiter.limit, 1);
    }
}
