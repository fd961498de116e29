//! Backoff helpers: exponential retry for one-shot async operations
//! (credential refresh, store calls) and the linear formula the upstream
//! session uses for reconnection.

use std::future::Future;
use std::time::Duration;
use tracing::warn;

#[derive(Debug, Clone)]
pub struct RetryConfig {
    pub max_retries: u32,
    pub initial_delay_ms: u64,
    pub max_delay_ms: u64,
    pub backoff_multiplier: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            initial_delay_ms: 200,
            max_delay_ms: 5_000,
            backoff_multiplier: 2.0,
        }
    }
}

/// Retry an async operation with exponential backoff until it succeeds or
/// `max_retries` is exhausted, returning the last error.
pub async fn retry_with_backoff<T, E, F, Fut>(config: &RetryConfig, op_name: &str, mut f: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: std::fmt::Display,
{
    let mut delay_ms = config.initial_delay_ms;
    let mut attempt = 0;

    loop {
        match f().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                attempt += 1;
                if attempt > config.max_retries {
                    return Err(err);
                }
                warn!(
                    "{op_name} failed (attempt {attempt}/{}): {err}; retrying in {delay_ms}ms",
                    config.max_retries
                );
                tokio::time::sleep(Duration::from_millis(delay_ms)).await;
                delay_ms = ((delay_ms as f64) * config.backoff_multiplier).min(config.max_delay_ms as f64) as u64;
            }
        }
    }
}

/// `reconnectIntervalMs * attempt`, capped. Attempt is 1-based.
pub fn linear_backoff_delay(base_ms: u64, attempt: u32, cap_ms: u64) -> Duration {
    Duration::from_millis((base_ms * attempt as u64).min(cap_ms))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicU32, Ordering};

    #[test]
    fn linear_backoff_scales_with_attempt_and_caps() {
        assert_eq!(linear_backoff_delay(1000, 1, 30_000), Duration::from_millis(1000));
        assert_eq!(linear_backoff_delay(1000, 5, 30_000), Duration::from_millis(5000));
        assert_eq!(linear_backoff_delay(1000, 100, 30_000), Duration::from_millis(30_000));
    }

    #[tokio::test]
    async fn retry_with_backoff_gives_up_after_max_retries() {
        let calls = AtomicU32::new(0);
        let config = RetryConfig {
            max_retries: 2,
            initial_delay_ms: 1,
            max_delay_ms: 4,
            backoff_multiplier: 2.0,
        };

        let result: Result<(), &str> = retry_with_backoff(&config, "test-op", || {
            calls.fetch_add(1, Ordering::SeqCst);
            async { Err("always fails") }
        })
        .await;

        assert!(result.is_err());
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }
}
