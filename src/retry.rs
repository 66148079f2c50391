//! Retry with exponential backoff and jitter around fallible async operations.
//!
//! [`RetryPolicy`] is a plain value: build it once from configuration and
//! hand it the operation to run. Only errors whose [`ErrorKind`] is in the
//! policy's retryable set are retried; everything else propagates on the
//! first occurrence without any delay.
//!
//! # Backoff Strategy
//!
//! ```text
//! delay(i) = min(base_delay * backoff_multiplier^i, max_delay) + random_jitter(0..=max_jitter)
//! ```
//!
//! where `i` is the zero-based index of the attempt that just failed.

use crate::config::RetryConfig;
use crate::error::{ErrorKind, NewsError};
use rand::{Rng, rng};
use std::collections::HashSet;
use std::future::Future;
use std::time::{Duration as StdDuration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Total attempts, including the first one. Never below 1.
    max_attempts: u32,
    base_delay: StdDuration,
    backoff_multiplier: f64,
    /// Optional ceiling on the pre-jitter delay.
    max_delay: Option<StdDuration>,
    max_jitter: StdDuration,
    retryable: HashSet<ErrorKind>,
}

impl RetryPolicy {
    /// A policy retrying the network error kinds, with 250ms of jitter and no delay ceiling.
    ///
    /// A multiplier below 1.0 (or NaN) is treated as 1.0, a constant delay.
    pub fn new(max_attempts: u32, base_delay: StdDuration, backoff_multiplier: f64) -> Self {
        let backoff_multiplier = if backoff_multiplier >= 1.0 { backoff_multiplier } else { 1.0 };
        Self {
            max_attempts: max_attempts.max(1),
            base_delay,
            backoff_multiplier,
            max_delay: None,
            max_jitter: StdDuration::from_millis(250),
            retryable: ErrorKind::NETWORK.into_iter().collect(),
        }
    }

    pub fn from_config(config: &RetryConfig) -> Self {
        let mut policy = Self::new(
            config.max_attempts,
            StdDuration::from_millis(config.base_delay_ms),
            config.backoff_multiplier,
        )
        .with_jitter(StdDuration::from_millis(config.jitter_ms));
        if let Some(ms) = config.max_delay_ms {
            policy = policy.with_max_delay(StdDuration::from_millis(ms));
        }
        policy
    }

    pub fn with_max_delay(mut self, max_delay: StdDuration) -> Self {
        self.max_delay = Some(max_delay);
        self
    }

    pub fn with_jitter(mut self, max_jitter: StdDuration) -> Self {
        self.max_jitter = max_jitter;
        self
    }

    /// Replace the set of error kinds that trigger a retry.
    pub fn retry_on(mut self, kinds: impl IntoIterator<Item = ErrorKind>) -> Self {
        self.retryable = kinds.into_iter().collect();
        self
    }

    pub fn max_attempts(&self) -> u32 {
        self.max_attempts
    }

    pub fn is_retryable(&self, err: &NewsError) -> bool {
        self.retryable.contains(&err.kind())
    }

    /// Pre-jitter delay after the attempt with zero-based index `attempt`.
    pub fn delay_for(&self, attempt: u32) -> StdDuration {
        let factor = self.backoff_multiplier.powi(attempt as i32);
        let secs = self.base_delay.as_secs_f64() * factor;
        let delay = StdDuration::try_from_secs_f64(secs).unwrap_or(StdDuration::MAX);
        match self.max_delay {
            Some(cap) => delay.min(cap),
            None => delay,
        }
    }

    /// Delay actually slept after `attempt`: backoff plus jitter, saturating.
    fn backoff(&self, attempt: u32) -> StdDuration {
        self.delay_for(attempt).saturating_add(self.jitter())
    }

    fn jitter(&self) -> StdDuration {
        let max_ms = self.max_jitter.as_millis() as u64;
        if max_ms == 0 {
            return StdDuration::ZERO;
        }
        StdDuration::from_millis(rng().random_range(0..=max_ms))
    }

    /// Run `op` until it succeeds, fails with a non-retryable error, or
    /// attempts run out. The last error is returned unchanged.
    #[instrument(level = "info", skip_all, fields(max_attempts = self.max_attempts))]
    pub async fn run<T, F, Fut>(&self, mut op: F) -> Result<T, NewsError>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T, NewsError>>,
    {
        let total_t0 = Instant::now();
        let mut attempt = 0u32;

        loop {
            let attempt_t0 = Instant::now();
            match op().await {
                Ok(value) => {
                    if attempt > 0 {
                        debug!(attempts = attempt + 1, "operation succeeded after retry");
                    }
                    return Ok(value);
                }
                Err(e) if !self.is_retryable(&e) => {
                    debug!(kind = ?e.kind(), error = %e, "non-retryable error; not retrying");
                    return Err(e);
                }
                Err(e) => {
                    let attempt_dt = attempt_t0.elapsed();
                    let total_dt = total_t0.elapsed();

                    if attempt + 1 >= self.max_attempts {
                        error!(
                            attempt = attempt + 1,
                            max = self.max_attempts,
                            elapsed_ms_attempt = attempt_dt.as_millis(),
                            elapsed_ms_total = total_dt.as_millis(),
                            error = %e,
                            "operation exhausted retries"
                        );
                        return Err(e);
                    }

                    let delay = self.backoff(attempt);
                    warn!(
                        attempt = attempt + 1,
                        max = self.max_attempts,
                        elapsed_ms_attempt = attempt_dt.as_millis(),
                        elapsed_ms_total = total_dt.as_millis(),
                        ?delay,
                        error = %e,
                        "attempt failed; backing off"
                    );
                    sleep(delay).await;
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
