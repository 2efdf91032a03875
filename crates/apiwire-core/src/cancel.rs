//! Caller-side cancellation: a shared abort flag plus an optional deadline.
//!
//! Every blocking point of a call (limiter wait, backoff sleep, in-flight
//! transfer) polls the token and stops once it is cancelled or past its
//! deadline.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

/// Granularity of cancellable sleeps.
const POLL_INTERVAL: Duration = Duration::from_millis(20);

/// Error returned when a call is stopped by its token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Cancelled {
    /// `cancel()` was called.
    Aborted,
    /// The deadline passed.
    DeadlineExceeded,
}

impl std::fmt::Display for Cancelled {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Cancelled::Aborted => write!(f, "call cancelled by caller"),
            Cancelled::DeadlineExceeded => write!(f, "call deadline exceeded"),
        }
    }
}

impl std::error::Error for Cancelled {}

/// Cloneable cancellation handle. Clones share the same flag; the deadline
/// is fixed per handle.
#[derive(Debug, Clone, Default)]
pub struct CancelToken {
    flag: Arc<AtomicBool>,
    deadline: Option<Instant>,
}

impl CancelToken {
    /// Token that is never cancelled unless `cancel()` is called.
    pub fn new() -> Self {
        Self::default()
    }

    /// Token that expires `timeout` from now. A timeout too large to represent means no deadline.
    pub fn with_timeout(timeout: Duration) -> Self {
        match Instant::now().checked_add(timeout) {
            Some(deadline) => Self::new().deadline_at(deadline),
            None => Self::new(),
        }
    }

    /// Same flag, with the given deadline (the earlier one wins if one is already set).
    pub fn deadline_at(mut self, deadline: Instant) -> Self {
        self.deadline = Some(match self.deadline {
            Some(existing) => existing.min(deadline),
            None => deadline,
        });
        self
    }

    pub fn cancel(&self) {
        self.flag.store(true, Ordering::Relaxed);
    }

    pub fn deadline(&self) -> Option<Instant> {
        self.deadline
    }

    /// Time left until the deadline, if one is set (zero once it has passed).
    pub fn remaining(&self) -> Option<Duration> {
        self.deadline
            .map(|d| d.saturating_duration_since(Instant::now()))
    }

    pub fn check(&self) -> Result<(), Cancelled> {
        if self.flag.load(Ordering::Relaxed) {
            return Err(Cancelled::Aborted);
        }
        match self.deadline {
            Some(d) if Instant::now() >= d => Err(Cancelled::DeadlineExceeded),
            _ => Ok(()),
        }
    }

    pub fn is_cancelled(&self) -> bool {
        self.check().is_err()
    }

    /// Sleep for `duration`, waking early with an error if the token fires.
    pub fn sleep(&self, duration: Duration) -> Result<(), Cancelled> {
        // None: the end is past what `Instant` can hold, so only the token can stop the sleep.
        let until = Instant::now().checked_add(duration);
        loop {
            self.check()?;
            let now = Instant::now();
            let slice = match until {
                Some(until) if now >= until => return Ok(()),
                Some(until) => (until - now).min(POLL_INTERVAL),
                None => POLL_INTERVAL,
            };
            std::thread::sleep(slice);
        }
    }
}
