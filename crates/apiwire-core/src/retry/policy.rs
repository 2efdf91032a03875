use std::time::Duration;

use crate::error::ApiError;
use crate::retry::Outcome;

/// Decision returned by the retry policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryDecision {
    /// Do not retry this outcome.
    NoRetry,
    /// Retry after the given delay.
    RetryAfter(Duration),
}

/// Bounded exponential backoff.
///
/// A call makes at most `max_retries + 1` attempts. The delay before attempt
/// `i` (`i >= 1`) is `min(min_retry_delay * 2^(i-1), max_retry_delay)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    max_retries: u32,
    min_retry_delay: Duration,
    max_retry_delay: Duration,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_retry_delay: Duration::from_secs(1),
            max_retry_delay: Duration::from_secs(30),
        }
    }
}

impl RetryPolicy {
    /// Build a policy; rejects `min_retry_delay > max_retry_delay`.
    pub fn new(
        max_retries: u32,
        min_retry_delay: Duration,
        max_retry_delay: Duration,
    ) -> Result<Self, ApiError> {
        if min_retry_delay > max_retry_delay {
            return Err(ApiError::config(format!(
                "min retry delay {:?} exceeds max retry delay {:?}",
                min_retry_delay, max_retry_delay
            )));
        }
        Ok(Self {
            max_retries,
            min_retry_delay,
            max_retry_delay,
        })
    }

    /// Policy that never retries.
    pub fn no_retries() -> Self {
        Self {
            max_retries: 0,
            ..Self::default()
        }
    }

    pub fn max_retries(&self) -> u32 {
        self.max_retries
    }

    pub fn min_retry_delay(&self) -> Duration {
        self.min_retry_delay
    }

    pub fn max_retry_delay(&self) -> Duration {
        self.max_retry_delay
    }

    /// Total attempts a call may make.
    pub fn max_attempts(&self) -> u32 {
        self.max_retries.saturating_add(1)
    }

    /// Delay to wait before attempt `attempt` (0-based). Zero for the first attempt.
    pub fn backoff(&self, attempt: u32) -> Duration {
        if attempt == 0 {
            return Duration::ZERO;
        }
        // Shift capped at 31 to stay within u32.
        let exp = 1u32 << (attempt - 1).min(31);
        self.min_retry_delay
            .saturating_mul(exp)
            .min(self.max_retry_delay)
    }

    /// Decide what to do after attempt `attempt` (0-based) ended with `outcome`.
    pub fn decide(&self, attempt: u32, outcome: Outcome) -> RetryDecision {
        if !outcome.is_retryable() || attempt >= self.max_retries {
            return RetryDecision::NoRetry;
        }
        RetryDecision::RetryAfter(self.backoff(attempt + 1))
    }
}
