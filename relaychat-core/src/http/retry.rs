//! Retry policy for establishing upstream responses
//!
//! Only the part of a call up to the provider's status line is retried.
//! Once a streamed body has started flowing, failures go straight to the
//! consumer.

use crate::error::{RelayError, RelayResult};
use rand::Rng;
use serde::{Deserialize, Serialize};
use std::future::Future;
use std::time::{Duration, Instant};
use tracing::{debug, warn};

/// Backoff settings for opening an upstream response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,

    pub initial_delay_ms: u64,

    pub max_delay_ms: u64,

    /// Growth factor between consecutive delays
    pub multiplier: f64,

    /// Fraction of each delay randomised in both directions, 0.0 to 1.0
    pub jitter: f64,

    /// Stop retrying once the next attempt would start after this many
    /// milliseconds
    pub budget_ms: Option<u64>,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 2,
            initial_delay_ms: 200,
            max_delay_ms: 5_000,
            multiplier: 2.0,
            jitter: 0.1,
            budget_ms: Some(20_000),
        }
    }
}

impl RetryPolicy {
    pub fn new(max_retries: u32) -> Self {
        Self {
            max_retries,
            ..Default::default()
        }
    }

    /// A single attempt, no retries
    pub fn no_retry() -> Self {
        Self::new(0)
    }

    /// Delay before retry number `attempt` (0 for the first retry)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let growth = self.multiplier.powi(attempt.min(32) as i32);
        let capped = (self.initial_delay_ms as f64 * growth).min(self.max_delay_ms as f64);

        let spread = capped * self.jitter.clamp(0.0, 1.0);
        let delay = if spread > 0.0 {
            capped + rand::thread_rng().gen_range(-spread..=spread)
        } else {
            capped
        };

        Duration::from_millis(delay.max(0.0).round() as u64)
    }

    /// Whether `error` on attempt `attempt` may be followed by another try
    pub fn allows(&self, error: &RelayError, attempt: u32) -> bool {
        attempt < self.max_retries && error.is_retryable()
    }
}

/// Runs an upstream call under a `RetryPolicy`
#[derive(Debug, Clone)]
pub struct RetryExecutor {
    policy: RetryPolicy,
}

impl RetryExecutor {
    pub fn new(policy: RetryPolicy) -> Self {
        Self { policy }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.policy
    }

    /// Call `operation` until it succeeds, fails with a non-retryable error,
    /// or the policy runs out of attempts or budget
    pub async fn execute<F, T, Fut>(&self, mut operation: F) -> RelayResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = RelayResult<T>>,
    {
        let deadline = self
            .policy
            .budget_ms
            .map(|ms| Instant::now() + Duration::from_millis(ms));
        let mut attempt = 0;

        loop {
            let error = match operation().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!("Upstream call succeeded after {} retries", attempt);
                    }
                    return Ok(value);
                }
                Err(error) => error,
            };

            if !self.policy.allows(&error, attempt) {
                return Err(error);
            }

            let delay = self.policy.delay_for(attempt);
            if deadline.is_some_and(|deadline| Instant::now() + delay > deadline) {
                warn!("Retry budget exhausted after {} attempts: {}", attempt + 1, error);
                return Err(error);
            }

            warn!(
                "Upstream attempt {} failed, retrying in {:?}: {}",
                attempt + 1,
                delay,
                error
            );
            tokio::time::sleep(delay).await;
            attempt += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    fn no_jitter(max_retries: u32, initial_delay_ms: u64, max_delay_ms: u64) -> RetryPolicy {
        RetryPolicy {
            max_retries,
            initial_delay_ms,
            max_delay_ms,
            jitter: 0.0,
            budget_ms: None,
            ..RetryPolicy::default()
        }
    }

    /// Operation failing with `error` for the first `failures` calls
    fn flaky(
        calls: Arc<AtomicU32>,
        failures: u32,
        error: RelayError,
    ) -> impl FnMut() -> std::future::Ready<RelayResult<&'static str>> {
        move || {
            let call = calls.fetch_add(1, Ordering::SeqCst);
            std::future::ready(if call < failures {
                Err(error.clone())
            } else {
                Ok("ok")
            })
        }
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        let policy = no_jitter(3, 100, 1000);
        let delays: Vec<u128> = (0..5).map(|n| policy.delay_for(n).as_millis()).collect();
        assert_eq!(delays, vec![100, 200, 400, 800, 1000]);
    }

    #[test]
    fn test_jitter_stays_in_range() {
        let policy = RetryPolicy {
            jitter: 0.5,
            ..no_jitter(3, 100, 1000)
        };
        for _ in 0..50 {
            let delay = policy.delay_for(1).as_millis();
            assert!((100..=300).contains(&delay), "delay {}", delay);
        }
    }

    #[test]
    fn test_allows() {
        let policy = RetryPolicy::new(2);

        let timeout = RelayError::Timeout { seconds: 1 };
        assert!(policy.allows(&timeout, 0));
        assert!(policy.allows(&timeout, 1));
        assert!(!policy.allows(&timeout, 2));

        let auth = RelayError::UpstreamStatus {
            status: 401,
            message: "bad key".to_string(),
        };
        assert!(!policy.allows(&auth, 0));
        assert!(!RetryPolicy::no_retry().allows(&timeout, 0));
    }

    #[tokio::test]
    async fn test_retries_until_success() {
        let calls = Arc::new(AtomicU32::new(0));
        let reset = RelayError::Network {
            message: "connection reset".to_string(),
        };

        let result = RetryExecutor::new(no_jitter(3, 1, 5))
            .execute(flaky(calls.clone(), 2, reset))
            .await;

        assert_eq!(result.unwrap(), "ok");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let unavailable = RelayError::UpstreamStatus {
            status: 503,
            message: "overloaded".to_string(),
        };

        let result = RetryExecutor::new(no_jitter(2, 1, 5))
            .execute(flaky(calls.clone(), 10, unavailable))
            .await;

        assert!(matches!(result, Err(RelayError::UpstreamStatus { status: 503, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_non_retryable_fails_immediately() {
        let calls = Arc::new(AtomicU32::new(0));
        let bad_request = RelayError::UpstreamStatus {
            status: 400,
            message: "bad request".to_string(),
        };

        let result = RetryExecutor::new(no_jitter(3, 1, 5))
            .execute(flaky(calls.clone(), 1, bad_request))
            .await;

        assert!(matches!(result, Err(RelayError::UpstreamStatus { status: 400, .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_budget_stops_retries() {
        let calls = Arc::new(AtomicU32::new(0));
        let policy = RetryPolicy {
            budget_ms: Some(10),
            ..no_jitter(5, 50, 50)
        };

        let result = RetryExecutor::new(policy)
            .execute(flaky(calls.clone(), 10, RelayError::Timeout { seconds: 1 }))
            .await;

        assert!(matches!(result, Err(RelayError::Timeout { .. })));
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }
}
