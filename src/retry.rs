//! Exponential backoff for backend calls.
//!
//! Backoff: `base × 2^attempt`, with the exponent capped at 5 (1s, 2s, 4s,
//! 8s, 16s, 32s, 32s, … for the default 1s base).

use std::future::Future;
use std::time::Duration;

use docqa_core::{Error, Result};

use crate::config::{EmbeddingConfig, GenerationConfig};

/// Which failures are worth another attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryOn {
    /// Only [`Error::RateLimit`].
    RateLimit,
    /// Rate limiting plus an unavailable backend (5xx, refused connection,
    /// timeout). Rejected requests and malformed replies fail at once.
    Transient,
}

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub base_delay: Duration,
    pub retry_on: RetryOn,
}

impl RetryPolicy {
    /// Embedding retries transient failures: one document can issue many calls.
    pub fn for_embedding(config: &EmbeddingConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_ms),
            retry_on: RetryOn::Transient,
        }
    }

    /// Generation retries rate limiting only, and only when configured.
    pub fn for_generation(config: &GenerationConfig) -> Self {
        Self {
            max_retries: config.max_retries,
            base_delay: Duration::from_millis(config.retry_base_ms),
            retry_on: RetryOn::RateLimit,
        }
    }

    pub fn should_retry(&self, err: &Error) -> bool {
        match self.retry_on {
            RetryOn::RateLimit => err.is_retryable(),
            RetryOn::Transient => err.is_transient(),
        }
    }

    /// Delay before retry number `attempt + 1`.
    pub fn delay(&self, attempt: u32) -> Duration {
        self.base_delay * (1u32 << attempt.min(5))
    }
}

/// Run `op` until it succeeds, fails with a non-retryable error, or the
/// retry budget is spent. The last error is returned unchanged.
pub async fn with_retry<T, F, Fut>(policy: &RetryPolicy, what: &str, mut op: F) -> Result<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T>>,
{
    let mut attempt = 0;
    loop {
        match op().await {
            Ok(value) => return Ok(value),
            Err(e) if attempt < policy.max_retries && policy.should_retry(&e) => {
                let delay = policy.delay(attempt);
                tracing::warn!(
                    what,
                    attempt = attempt + 1,
                    max_retries = policy.max_retries,
                    delay_ms = delay.as_millis() as u64,
                    error = %e,
                    "retrying after backend failure"
                );
                tokio::time::sleep(delay).await;
                attempt += 1;
            }
            Err(e) => return Err(e),
        }
    }
}
