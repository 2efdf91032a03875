//! Classify HTTP status codes and transport failures into retry outcomes.
//!
//! This is the only place that decides whether a status is worth another
//! attempt.

/// Why an attempt may be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RetryReason {
    /// No response at all (connect, DNS, timeout, reset).
    Transport,
    /// Server asked us to slow down (429).
    Throttled,
    /// Server-side trouble: any 5xx, including the 522-524 edge codes.
    ServiceUnavailable(u16),
}

/// Why an attempt must not be retried.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FatalReason {
    /// 401.
    InvalidCredentials,
    /// 403.
    Forbidden,
    /// Any other non-2xx status.
    Status(u16),
}

/// Verdict for a completed attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Success,
    Retryable(RetryReason),
    Fatal(FatalReason),
}

impl Outcome {
    pub fn is_success(&self) -> bool {
        matches!(self, Outcome::Success)
    }

    pub fn is_retryable(&self) -> bool {
        matches!(self, Outcome::Retryable(_))
    }
}

/// Classify an HTTP status code. Arms are evaluated in priority order.
pub fn classify_status(code: u16) -> Outcome {
    match code {
        200..=299 => Outcome::Success,
        401 => Outcome::Fatal(FatalReason::InvalidCredentials),
        403 => Outcome::Fatal(FatalReason::Forbidden),
        429 => Outcome::Retryable(RetryReason::Throttled),
        500..=599 => Outcome::Retryable(RetryReason::ServiceUnavailable(code)),
        _ => Outcome::Fatal(FatalReason::Status(code)),
    }
}

/// Classify a transfer that produced no response. Always retryable; a
/// cancelled transfer never reaches the classifier.
pub fn classify_transport_failure() -> Outcome {
    Outcome::Retryable(RetryReason::Transport)
}
