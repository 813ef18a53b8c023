//! Retry logic.
//!
//! # Responsibilities
//! - Decide whether a classified failure is worth another attempt
//! - Execute retries with exponential backoff
//! - Honour server-provided `Retry-After` on 429 responses
//!
//! # Design Decisions
//! - Only the final outcome of the whole sequence is visible to callers
//! - Timeouts are never retried; repeating a slow call rarely helps
//! - The circuit breaker sees one outcome per logical call, not per attempt

use std::future::Future;
use std::time::Duration;

use crate::client::error::ClassifiedError;
use crate::config::RetryConfig;
use crate::observability::metrics;
use crate::resilience::backoff::calculate_backoff;

/// Bounded retry with exponential backoff.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    max_attempts: u32,
    base_delay_ms: u64,
    max_delay_ms: u64,
    jitter: bool,
}

impl RetryPolicy {
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        Self {
            max_attempts: max_attempts.max(1),
            base_delay_ms: base_delay.as_millis() as u64,
            max_delay_ms: max_delay.as_millis() as u64,
            jitter: false,
        }
    }

    pub fn with_jitter(mut self, jitter: bool) -> Self {
        self.jitter = jitter;
        self
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        Self::new(
            config.max_attempts,
            Duration::from_millis(config.base_delay_ms),
            Duration::from_millis(config.max_delay_ms),
        )
        .with_jitter(config.jitter)
    }

    /// A policy that makes exactly one attempt.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    /// Longest wait this policy will ever schedule.
    pub fn max_delay(&self) -> Duration {
        Duration::from_millis(self.max_delay_ms)
    }

    /// Delay scheduled after failed attempt `attempt` (1-based).
    pub fn delay_for(&self, attempt: u32, err: &ClassifiedError) -> Duration {
        match err.retry_after() {
            Some(wait) => wait.min(self.max_delay()),
            None => calculate_backoff(attempt, self.base_delay_ms, self.max_delay_ms, self.jitter),
        }
    }

    /// Run `op` until it succeeds, fails permanently, or attempts run out.
    ///
    /// `op` receives the 1-based attempt number.
    pub async fn execute<F, Fut, T>(&self, mut op: F) -> Result<T, ClassifiedError>
    where
        F: FnMut(u32) -> Fut,
        Fut: Future<Output = Result<T, ClassifiedError>>,
    {
        let mut attempt = 1;

        loop {
            match op(attempt).await {
                Ok(value) => return Ok(value),
                Err(err) => {
                    if !err.is_retryable() || attempt >= self.max_attempts {
                        if attempt > 1 {
                            tracing::debug!(
                                attempts = attempt,
                                error = %err,
                                "Giving up after retries"
                            );
                        }
                        return Err(err);
                    }

                    let delay = self.delay_for(attempt, &err);
                    tracing::info!(
                        attempt,
                        delay = ?delay,
                        kind = err.kind().as_str(),
                        error = %err,
                        "Retrying request"
                    );
                    metrics::record_retry(err.kind());

                    tokio::time::sleep(delay).await;
                    attempt += 1;
                }
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::from_config(&RetryConfig::default())
    }
}
