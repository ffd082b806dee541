//! Bounded retry for whole pipeline steps
//!
//! The HTTP client retries individual requests; this wraps larger units of
//! work (a full download, an object upload) that can fail part way through.

use crate::error::Result;
use crate::types::BackoffType;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// How many times to retry a step and how long to wait in between
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Retries after the first attempt
    pub max_retries: u32,
    /// Type of backoff between attempts
    pub backoff_type: BackoffType,
    /// Delay before the first retry
    pub initial_delay: Duration,
    /// Upper bound for any single delay
    pub max_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            backoff_type: BackoffType::Exponential,
            initial_delay: Duration::from_millis(500),
            max_delay: Duration::from_secs(60),
        }
    }
}

impl RetryPolicy {
    /// Fixed delay between attempts
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            backoff_type: BackoffType::Constant,
            initial_delay: delay,
            max_delay: delay,
        }
    }

    /// Never retry
    pub fn none() -> Self {
        Self::fixed(0, Duration::ZERO)
    }

    /// Calculate backoff delay for a given attempt (0-based)
    pub fn delay_for(&self, attempt: u32) -> Duration {
        let delay = match self.backoff_type {
            BackoffType::Constant => self.initial_delay,
            BackoffType::Linear => self.initial_delay * (attempt + 1),
            BackoffType::Exponential => {
                let factor = 2u32.saturating_pow(attempt);
                self.initial_delay.saturating_mul(factor)
            }
        };

        std::cmp::min(delay, self.max_delay)
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// policy's retries are used up. The last error is returned.
pub async fn retry_async<T, F, Fut>(policy: &RetryPolicy, op_name: &str, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if e.is_retryable() && attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "{op_name} failed: {e}, attempt {}/{}, retrying in {:?}",
                    attempt + 1,
                    policy.max_retries + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) if e.is_retryable() => {
                warn!("{op_name} failed after {} attempts: {e}", attempt + 1);
                return Err(e);
            }
            Err(e) => return Err(e),
        }
    }
}

/// Same as [`retry_async`] but retries every error, not only transient ones.
pub async fn retry_any<T, F, Fut>(policy: &RetryPolicy, op_name: &str, mut op: F) -> Result<T>
where
    F: FnMut(u32) -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op(attempt).await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_retries => {
                let delay = policy.delay_for(attempt);
                warn!(
                    "{op_name} failed: {e}, attempt {}/{}, retrying in {:?}",
                    attempt + 1,
                    policy.max_retries + 1,
                    delay
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => {
                warn!("{op_name} failed after {} attempts: {e}", attempt + 1);
                return Err(e);
            }
        }
    }
}
