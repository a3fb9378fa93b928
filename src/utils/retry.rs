//! Bounded retry with backoff
//!
//! Each failed attempt waits `interval`, then the next wait grows by 1.5x.
//! With the defaults an operation gets 5 attempts and waits
//! 500 + 750 + 1125 + 1687.5 ms in total before the last error surfaces.

use crate::error::BridgeResult;
use std::future::Future;
use std::time::Duration;

const BACKOFF_FACTOR: f64 = 1.5;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RetryOptions {
    /// Total attempts, including the first one
    pub retries: u32,
    /// Wait before the second attempt
    pub interval: Duration,
}

impl Default for RetryOptions {
    fn default() -> Self {
        Self {
            retries: 5,
            interval: Duration::from_millis(500),
        }
    }
}

impl RetryOptions {
    pub fn new(retries: u32, interval: Duration) -> Self {
        Self { retries, interval }
    }

    /// A single attempt, no waiting
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO)
    }
}

/// Run `op` until it succeeds, attempts run out, or it fails with an error
/// that is not retryable.
pub async fn retry<T, F, Fut>(mut op: F, opts: RetryOptions) -> BridgeResult<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = BridgeResult<T>>,
{
    let mut remaining = opts.retries.max(1);
    let mut interval = opts.interval;

    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(err) if remaining <= 1 || !err.is_retryable() => return Err(err),
            Err(err) => {
                crate::log_debug!(
                    "retry",
                    "Attempt failed, backing off",
                    error = err,
                    remaining = remaining - 1,
                    wait_ms = interval.as_millis(),
                );
                tokio::time::sleep(interval).await;
                remaining -= 1;
                interval = interval.mul_f64(BACKOFF_FACTOR);
            }
        }
    }
}
