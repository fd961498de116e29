//! Small shared utilities: backoff/retry helpers.

pub mod backoff;

pub use backoff::{retry_with_backoff, linear_backoff_delay, RetryConfig};
