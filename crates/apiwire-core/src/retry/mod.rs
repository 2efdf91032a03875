//! Retry and backoff policy.
//!
//! This module holds the single response classifier (success / retryable /
//! fatal) and the exponential backoff policy, so the executor and anything
//! layered on top of it (pagination) share one consistent decision.

mod classify;
mod policy;

pub use classify::{
    classify_status, classify_transport_failure, FatalReason, Outcome, RetryReason,
};
pub use policy::{RetryDecision, RetryPolicy};
