//! Confirms the downstream rate limiter's window holds every request made
//! inside the same instant, rather than losing requests to a string-keyed
//! collision.

use ctrader_gateway::modules::downstream::{RateLimiter, RateLimiterConfig};
use std::sync::Arc;
use std::time::Duration;

#[tokio::test]
async fn burst_of_concurrent_requests_each_count_toward_the_window() {
    let limiter = Arc::new(RateLimiter::new(RateLimiterConfig {
        max_requests: 20,
        window: Duration::from_millis(200),
    }));

    let mut handles = Vec::new();
    for _ in 0..20 {
        let limiter = limiter.clone();
        handles.push(tokio::spawn(async move { limiter.check().await }));
    }

    let mut allowed = 0;
    for handle in handles {
        if handle.await.unwrap() {
            allowed += 1;
        }
    }

    assert_eq!(allowed, 20, "every request within the burst should have counted individually");
}

#[tokio::test]
async fn requests_beyond_the_window_are_rejected_until_it_slides() {
    let limiter = RateLimiter::new(RateLimiterConfig {
        max_requests: 2,
        window: Duration::from_millis(50),
    });

    assert!(limiter.check().await);
    assert!(limiter.check().await);
    assert!(!limiter.check().await);

    tokio::time::sleep(Duration::from_millis(60)).await;
    assert!(limiter.check().await);
}
