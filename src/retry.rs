//! Resilient invoker: bounded retry with exponential backoff and jitter.
//!
//! Wraps a single provider request in a retry loop. Only outcomes the
//! provider boundary classified as transient (rate limit, connection
//! failure) are retried; authentication and all other failures propagate
//! on first occurrence. After the final attempt the last transient error is
//! returned unchanged, so callers can still map it to its original category.
//!
//! The delay before retry `i` (0-indexed) is
//! `min(max_delay, base_delay * 2^i)` plus a uniform random jitter drawn
//! independently on every attempt, so concurrent requests do not retry in
//! lockstep. Sleeps block only the invoking task.

use rand::Rng;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

use crate::config::RetryConfig;
use crate::provider::ProviderError;

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay: Duration,
    max_delay: Duration,
    jitter: Duration,
}

impl RetryPolicy {
    pub fn new(config: &RetryConfig) -> Self {
        Self {
            max_attempts: config.max_attempts.max(1),
            base_delay: config.base_delay(),
            max_delay: config.max_delay(),
            jitter: config.jitter(),
        }
    }

    /// Run `op`, retrying transient failures up to the configured attempt
    /// budget. `op` must wrap exactly one provider request; the invoker does
    /// no parsing or validation of the result.
    pub async fn invoke<T, F, Fut>(&self, mut op: F) -> Result<T, ProviderError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, ProviderError>>,
    {
        let mut attempt = 0u32;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(err) if err.is_transient() && attempt + 1 < self.max_attempts => {
                    let delay = self.backoff_delay(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max_attempts = self.max_attempts,
                        delay_ms = delay.as_millis() as u64,
                        error = %err,
                        "transient provider error, backing off before retry"
                    );
                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
                Err(err) => return Err(err),
            }
        }
    }

    fn backoff_delay(&self, attempt: u32) -> Duration {
        let exponential = self.base_delay.as_secs_f64() * 2f64.powi(attempt.min(30) as i32);
        let capped = exponential.min(self.max_delay.as_secs_f64());
        let jitter = if self.jitter.is_zero() {
            0.0
        } else {
            rand::rng().random_range(0.0..self.jitter.as_secs_f64())
        };
        Duration::from_secs_f64(capped + jitter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::time::Instant;

    fn fast_policy() -> RetryPolicy {
        RetryPolicy::new(&RetryConfig {
            max_attempts: 3,
            base_delay_ms: 10,
            max_delay_ms: 80,
            jitter_ms: 5,
        })
    }

    #[test]
    fn test_backoff_doubles_then_caps() {
        let policy = RetryPolicy::new(&RetryConfig {
            max_attempts: 3,
            base_delay_ms: 600,
            max_delay_ms: 8_000,
            jitter_ms: 0,
        });
        assert_eq!(policy.backoff_delay(0), Duration::from_millis(600));
        assert_eq!(policy.backoff_delay(1), Duration::from_millis(1_200));
        assert_eq!(policy.backoff_delay(4), Duration::from_millis(8_000));
        assert_eq!(policy.backoff_delay(20), Duration::from_millis(8_000));
    }

    #[test]
    fn test_jitter_stays_within_bound() {
        let policy = fast_policy();
        for _ in 0..100 {
            let delay = policy.backoff_delay(0);
            assert!(delay >= Duration::from_millis(10));
            assert!(delay < Duration::from_millis(15));
        }
    }

    #[tokio::test]
    async fn test_always_transient_attempts_exactly_three_times() {
        let calls = AtomicU32::new(0);
        let started = Instant::now();
        let result: Result<(), _> = fast_policy()
            .invoke(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ProviderError::RateLimited("slow down".into())) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 3);
        let err = result.unwrap_err();
        assert!(matches!(err, ProviderError::RateLimited(_)));
        // Two backoff sleeps: >= 10ms + 20ms.
        assert!(started.elapsed() >= Duration::from_millis(30));
    }

    #[tokio::test]
    async fn test_auth_failure_short_circuits() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy()
            .invoke(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async { Err(ProviderError::Auth("bad key".into())) }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result.unwrap_err(), ProviderError::Auth(_)));
    }

    #[tokio::test]
    async fn test_fatal_api_error_short_circuits() {
        let calls = AtomicU32::new(0);
        let result: Result<(), _> = fast_policy()
            .invoke(|| {
                calls.fetch_add(1, Ordering::SeqCst);
                async {
                    Err(ProviderError::Api {
                        status: 500,
                        body: "boom".into(),
                    })
                }
            })
            .await;

        assert_eq!(calls.load(Ordering::SeqCst), 1);
        assert!(matches!(result.unwrap_err(), ProviderError::Api { .. }));
    }

    #[tokio::test]
    async fn test_recovers_after_transient_failures() {
        let calls = AtomicU32::new(0);
        let result = fast_policy()
            .invoke(|| {
                let n = calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if n < 2 {
                        Err(ProviderError::Connection("reset".into()))
                    } else {
                        Ok(42)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
