//! Retry with fixed or exponential back-off for page fetches.
//!
//! [`retry_with_backoff`] wraps any fallible async operation and retries on
//! transient errors (see [`ScraperError::is_transient`]). Everything else is
//! returned on the first failure.

use std::future::Future;
use std::time::Duration;

use crate::error::ScraperError;

/// Exponential delays never exceed this.
const MAX_DELAY_MS: u64 = 60_000;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    /// Additional attempts after the first failure.
    pub max_retries: u32,
    pub base_delay_ms: u64,
    /// Double the delay on every retry (with jitter) instead of waiting
    /// `base_delay_ms` each time.
    pub exponential: bool,
}

impl RetryPolicy {
    #[must_use]
    pub fn none() -> Self {
        Self {
            max_retries: 0,
            base_delay_ms: 0,
            exponential: false,
        }
    }

    /// Delay before retry number `attempt` (1-based).
    ///
    /// | Attempt | fixed        | exponential                   |
    /// |---------|--------------|-------------------------------|
    /// | 1       | base         | base × 2⁰ ± 25 % jitter       |
    /// | 2       | base         | base × 2¹ ± 25 % jitter       |
    /// | 3       | base         | base × 2² ± 25 % jitter       |
    #[must_use]
    pub fn delay_for(&self, attempt: u32) -> Duration {
        if !self.exponential {
            return Duration::from_millis(self.base_delay_ms);
        }

        let computed = self
            .base_delay_ms
            .saturating_mul(1u64 << attempt.saturating_sub(1).min(10));
        let capped = computed.min(MAX_DELAY_MS);
        #[allow(
            clippy::cast_possible_truncation,
            clippy::cast_sign_loss,
            clippy::cast_precision_loss
        )]
        let delay_ms = (capped as f64 * (rand::random::<f64>() * 0.5 + 0.75)) as u64;
        Duration::from_millis(delay_ms)
    }
}

/// Runs `operation` with up to `policy.max_retries` additional attempts on
/// transient errors. The last error is returned once retries run out.
pub(crate) async fn retry_with_backoff<T, F, Fut>(
    policy: RetryPolicy,
    mut operation: F,
) -> Result<T, ScraperError>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Result<T, ScraperError>>,
{
    let mut attempt = 0u32;
    loop {
        match operation().await {
            Ok(value) => return Ok(value),
            Err(err) => {
                if !err.is_transient() || attempt >= policy.max_retries {
                    return Err(err);
                }
                attempt += 1;
                let delay = policy.delay_for(attempt);
                tracing::warn!(
                    attempt,
                    max_retries = policy.max_retries,
                    delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX),
                    error = %err,
                    "transient fetch error, retrying"
                );
                tokio::time::sleep(delay).await;
            }
        }
    }
}
