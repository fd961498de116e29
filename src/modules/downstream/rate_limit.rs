//! Sliding-window rate limiter for downstream client commands.
//!
//! The naive approach keys each request by `${type}_${now}`; two requests
//! landing in the same millisecond collide and one is silently dropped from
//! the window, undercounting. Keying by a monotonic counter instead means
//! every request gets a distinct slot regardless of wall-clock resolution.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::{Duration, Instant};
use tokio::sync::Mutex;

#[derive(Debug, Clone)]
pub struct RateLimiterConfig {
    pub max_requests: usize,
    pub window: Duration,
}

pub struct RateLimiter {
    config: RateLimiterConfig,
    sequence: AtomicU64,
    window: Mutex<VecDeque<(u64, Instant)>>,
}

impl RateLimiter {
    pub fn new(config: RateLimiterConfig) -> Self {
        Self {
            config,
            sequence: AtomicU64::new(0),
            window: Mutex::new(VecDeque::new()),
        }
    }

    /// Record one request and report whether it's within the limit. Always
    /// records, even when rejecting, so the window reflects every attempt.
    pub async fn check(&self) -> bool {
        let seq = self.sequence.fetch_add(1, Ordering::Relaxed);
        let now = Instant::now();
        let mut window = self.window.lock().await;

        while let Some(&(_, oldest)) = window.front() {
            if now.duration_since(oldest) > self.config.window {
                window.pop_front();
            } else {
                break;
            }
        }

        window.push_back((seq, now));
        window.len() <= self.config.max_requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn allows_up_to_the_configured_burst() {
        let limiter = RateLimiter::new(RateLimiterConfig {
            max_requests: 3,
            window: Duration::from_millis(500),
        });

        assert!(limiter.check().await);
        assert!(limiter.check().await);
        assert!(limiter.check().await);
        assert!(!limiter.check().await);
    }

    #[tokio::test]
    async fn concurrent_requests_in_the_same_instant_each_count() {
        let limiter = std::sync::Arc::new(RateLimiter::new(RateLimiterConfig {
            max_requests: 50,
            window: Duration::from_millis(500),
        }));

        let mut handles = Vec::new();
        for _ in 0..50 {
            let limiter = limiter.clone();
            handles.push(tokio::spawn(async move { limiter.check().await }));
        }

        let mut allowed = 0;
        for handle in handles {
            if handle.await.unwrap() {
                allowed += 1;
            }
        }
        assert_eq!(allowed, 50);
    }
}
