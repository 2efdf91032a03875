//! Retry loop: rate-limit, send, classify, back off, until success or the
//! policy says stop.

use super::Client;
use crate::cancel::CancelToken;
use crate::error::{ApiError, HttpFailure};
use crate::request::{Request, Response};
use crate::retry::{
    classify_status, classify_transport_failure, FatalReason, Outcome, RetryDecision,
};
use crate::transport::TransportError;

impl Client {
    /// Send `request`, retrying transient failures with exponential backoff.
    ///
    /// Every attempt takes a token from the client's rate limiter first. At
    /// most `max_retries + 1` attempts are made. The returned response is
    /// always a 2xx with its body fully read.
    pub fn execute(&self, cancel: &CancelToken, request: &Request) -> Result<Response, ApiError> {
        let operation = request.operation_name();
        let outbound = self.render(request)?;
        let policy = &self.inner.retry;
        let cancelled = |reason| ApiError::cancelled(operation.as_str(), reason);

        let mut attempt = 0u32;
        loop {
            self.inner.limiter.wait(cancel).map_err(cancelled)?;

            tracing::debug!(
                operation = %operation,
                attempt,
                method = outbound.method.as_str(),
                url = %outbound.url,
                "sending request"
            );
            let result = self.inner.transport.send(&outbound, cancel);
            let outcome = match &result {
                Ok(response) => classify_status(response.status),
                Err(TransportError::Cancelled(reason)) => return Err(cancelled(*reason)),
                Err(_) => classify_transport_failure(),
            };

            let result = match result {
                Ok(response) if outcome.is_success() => return Ok(response),
                other => other,
            };

            match policy.decide(attempt, outcome) {
                RetryDecision::NoRetry => {
                    return Err(terminal_error(&operation, outcome, result, attempt + 1));
                }
                RetryDecision::RetryAfter(delay) => {
                    match &result {
                        Ok(response) => tracing::warn!(
                            operation = %operation,
                            attempt,
                            status = response.status,
                            delay_ms = delay.as_millis() as u64,
                            "retryable response, backing off"
                        ),
                        Err(e) => tracing::warn!(
                            operation = %operation,
                            attempt,
                            error = %e,
                            delay_ms = delay.as_millis() as u64,
                            "transport failure, backing off"
                        ),
                    }
                    cancel.sleep(delay).map_err(cancelled)?;
                    attempt += 1;
                }
            }
        }
    }
}

fn transport_exhausted(operation: &str, e: &TransportError, attempts: u32) -> ApiError {
    ApiError::Transport {
        operation: operation.to_string(),
        message: e.to_string(),
        attempts,
    }
}

/// Error for an attempt that will not be retried.
fn terminal_error(
    operation: &str,
    outcome: Outcome,
    result: Result<Response, TransportError>,
    attempts: u32,
) -> ApiError {
    let response = match result {
        Ok(response) => response,
        Err(e) => return transport_exhausted(operation, &e, attempts),
    };
    let failure = HttpFailure::from_response(operation, &response);
    tracing::debug!(
        operation = %operation,
        status = failure.status,
        attempts,
        body = %failure.body_text(),
        "request failed"
    );
    match outcome {
        Outcome::Fatal(FatalReason::InvalidCredentials | FatalReason::Forbidden) => {
            ApiError::Auth(failure)
        }
        Outcome::Retryable(_) => ApiError::RateLimitedOrService { failure, attempts },
        Outcome::Fatal(FatalReason::Status(_)) | Outcome::Success => ApiError::Client(failure),
    }
}
