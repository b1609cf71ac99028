//! Retry logic with exponential backoff
//!
//! This module provides the generic retry loop behind the HTTP client's
//! transport-resilience tier. Errors classify themselves as retryable or not
//! via [`IsRetryable`]; retryable failures are re-attempted with exponential
//! backoff and optional jitter to prevent thundering herd.

use crate::config::BackoffConfig;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Trait for errors that can be classified as retryable or not
///
/// Transient failures (server busy, rate limited) should return `true`.
/// Failures that a repeat of the same request cannot fix should return `false`.
pub trait IsRetryable {
    /// Returns true if the error is transient and the operation should be retried
    fn is_retryable(&self) -> bool;
}

/// Execute an async operation with exponential backoff retry logic
///
/// Retries only errors whose [`IsRetryable::is_retryable`] returns `true`,
/// up to `config.max_attempts` total attempts. Delays grow by
/// `config.multiplier` per retry, capped at `config.max_delay`, with uniform
/// jitter added when `config.jitter` is set.
///
/// Returns the successful result, or the last error once attempts are
/// exhausted or a non-retryable error occurs.
pub async fn retry_with_backoff<F, Fut, T, E>(config: &BackoffConfig, mut operation: F) -> Result<T, E>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, E>>,
    E: IsRetryable + std::fmt::Display,
{
    let mut attempt = 1;
    let mut delay = config.initial_delay;

    loop {
        match operation().await {
            Ok(result) => {
                if attempt > 1 {
                    tracing::debug!(attempts = attempt, "Operation succeeded after retry");
                }
                return Ok(result);
            }
            Err(e) if e.is_retryable() && attempt < config.max_attempts => {
                tracing::warn!(
                    error = %e,
                    attempt = attempt,
                    max_attempts = config.max_attempts,
                    delay_ms = delay.as_millis(),
                    "Operation failed, retrying"
                );

                let jittered_delay = if config.jitter { add_jitter(delay) } else { delay };
                tokio::time::sleep(jittered_delay).await;

                attempt += 1;
                let next_delay = Duration::from_secs_f64(delay.as_secs_f64() * config.multiplier);
                delay = next_delay.min(config.max_delay);
            }
            Err(e) => {
                if e.is_retryable() {
                    tracing::debug!(
                        error = %e,
                        attempts = attempt,
                        "Operation failed after all backoff attempts exhausted"
                    );
                }
                return Err(e);
            }
        }
    }
}

/// Add random jitter to a delay to prevent thundering herd
///
/// Jitter is uniformly distributed between 0% and 100% of the delay, so the
/// actual delay falls between `delay` and `2 * delay`.
fn add_jitter(delay: Duration) -> Duration {
    let mut rng = rand::thread_rng();
    let jitter_factor: f64 = rng.gen_range(0.0..=1.0);
    let jittered_secs = delay.as_secs_f64() * (1.0 + jitter_factor);
    Duration::from_secs_f64(jittered_secs)
}
