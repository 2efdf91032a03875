//! Client-wide token bucket.
//!
//! Every attempt, retries included, takes one token before it is sent. The
//! bucket is a `governor` direct limiter, so concurrent callers on different
//! threads share it without extra locking.

use governor::clock::Clock;
use governor::{DefaultDirectRateLimiter, Quota};
use std::num::NonZeroU32;
use std::time::Duration;

use crate::cancel::{CancelToken, Cancelled};
use crate::error::ApiError;

/// Default steady-state rate: 1200 requests per 5 minutes.
pub const DEFAULT_REQUESTS_PER_SECOND: f64 = 4.0;
/// Default burst: one token, i.e. no bursting.
pub const DEFAULT_BURST: u32 = 1;

/// Upper bound for a single sleep inside `wait`, so cancellation is noticed promptly.
const MAX_WAIT_SLICE: Duration = Duration::from_millis(50);

pub struct RateLimiter {
    limiter: DefaultDirectRateLimiter,
    requests_per_second: f64,
    burst: u32,
}

impl RateLimiter {
    /// Build a bucket refilling at `requests_per_second` (fractional rates allowed)
    /// and holding at most `burst` tokens.
    pub fn new(requests_per_second: f64, burst: u32) -> Result<Self, ApiError> {
        if !requests_per_second.is_finite() || requests_per_second <= 0.0 {
            return Err(ApiError::config(format!(
                "requests per second must be a positive number, got {}",
                requests_per_second
            )));
        }
        let burst_nz = NonZeroU32::new(burst)
            .ok_or_else(|| ApiError::config("rate limit burst must be at least 1"))?;
        let period = Duration::try_from_secs_f64(1.0 / requests_per_second)
            .map_err(|_| ApiError::config("requests per second is too low"))?;
        let quota = Quota::with_period(period)
            .ok_or_else(|| ApiError::config("requests per second is too high"))?
            .allow_burst(burst_nz);
        Ok(Self {
            limiter: governor::RateLimiter::direct(quota),
            requests_per_second,
            burst,
        })
    }

    pub fn requests_per_second(&self) -> f64 {
        self.requests_per_second
    }

    pub fn burst(&self) -> u32 {
        self.burst
    }

    /// Take a token without blocking. Returns the time to wait if none is available.
    pub fn try_acquire(&self) -> Result<(), Duration> {
        self.limiter
            .check()
            .map_err(|not_until| not_until.wait_time_from(self.limiter.clock().now()))
    }

    /// Block until a token is available or `cancel` fires.
    pub fn wait(&self, cancel: &CancelToken) -> Result<(), Cancelled> {
        loop {
            cancel.check()?;
            match self.try_acquire() {
                Ok(()) => return Ok(()),
                Err(wait) => {
                    let slice = wait.min(MAX_WAIT_SLICE);
                    tracing::trace!(wait_ms = wait.as_millis() as u64, "rate limiter: waiting");
                    cancel.sleep(slice)?;
                }
            }
        }
    }
}

impl Default for RateLimiter {
    fn default() -> Self {
        let quota = Quota::with_period(Duration::from_millis(250))
            .map(|q| q.allow_burst(NonZeroU32::MIN))
            .unwrap_or_else(|| Quota::per_second(NonZeroU32::MIN));
        Self {
            limiter: governor::RateLimiter::direct(quota),
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            burst: DEFAULT_BURST,
        }
    }
}

impl std::fmt::Debug for RateLimiter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RateLimiter")
            .field("requests_per_second", &self.requests_per_second)
            .field("burst", &self.burst)
            .finish()
    }
}
