//! Error taxonomy returned by the execution engine.
//!
//! HTTP-derived errors keep the raw body and the status code as fields, plus
//! whatever structured details the response envelope carried, so callers can
//! branch on them without parsing the message text.

use std::fmt;

use thiserror::Error;

use crate::cancel::Cancelled;
use crate::envelope::{self, ErrorDetail};
use crate::request::Response;

/// Response header carrying the edge request id.
pub const RAY_ID_HEADER: &str = "cf-ray";

/// Coarse category of an `ApiError`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    /// No response was obtained (DNS, connect, timeout).
    Transport,
    /// 401 / 403.
    Auth,
    /// 429 or any 5xx after the retry budget ran out.
    RateLimitedOrService,
    /// Any other non-2xx status.
    Client,
    /// The body did not have the expected shape.
    Decode,
    /// The caller's token fired.
    Cancelled,
    /// Invalid client configuration.
    Config,
}

/// A non-2xx response, captured for diagnostics.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HttpFailure {
    pub operation: String,
    pub status: u16,
    /// Raw response body, verbatim.
    pub body: Vec<u8>,
    /// Structured errors from the response envelope, if it decoded.
    pub errors: Vec<ErrorDetail>,
    pub ray_id: Option<String>,
}

impl HttpFailure {
    pub fn from_response(operation: impl Into<String>, response: &Response) -> Self {
        Self {
            operation: operation.into(),
            status: response.status,
            body: response.body.clone(),
            errors: envelope::error_details(&response.body),
            ray_id: response.headers.get(RAY_ID_HEADER).map(str::to_string),
        }
    }

    pub fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }
}

impl fmt::Display for HttpFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: HTTP {}", self.operation, self.status)?;
        if !self.errors.is_empty() {
            let msgs: Vec<String> = self.errors.iter().map(ErrorDetail::to_string).collect();
            write!(f, ": {}", msgs.join("; "))?;
        }
        if let Some(ray) = &self.ray_id {
            write!(f, " (ray id {})", ray)?;
        }
        Ok(())
    }
}

#[derive(Debug, Error)]
pub enum ApiError {
    /// Every attempt failed before a response arrived.
    #[error("{operation}: transport error after {attempts} attempt(s): {message}")]
    Transport {
        operation: String,
        message: String,
        attempts: u32,
    },

    #[error("{0} (invalid credentials or insufficient permissions)")]
    Auth(HttpFailure),

    #[error("{failure} after {attempts} attempt(s)")]
    RateLimitedOrService { failure: HttpFailure, attempts: u32 },

    #[error("{0}")]
    Client(HttpFailure),

    #[error("{operation}: could not decode response: {message}")]
    Decode {
        operation: String,
        message: String,
        body: Vec<u8>,
    },

    #[error("{operation}: {reason}")]
    Cancelled { operation: String, reason: Cancelled },

    #[error("invalid client configuration: {message}")]
    Config { message: String },
}

impl ApiError {
    pub(crate) fn config(message: impl Into<String>) -> Self {
        ApiError::Config {
            message: message.into(),
        }
    }

    pub(crate) fn decode(operation: impl Into<String>, err: impl fmt::Display, body: &[u8]) -> Self {
        ApiError::Decode {
            operation: operation.into(),
            message: err.to_string(),
            body: body.to_vec(),
        }
    }

    pub(crate) fn cancelled(operation: impl Into<String>, reason: Cancelled) -> Self {
        ApiError::Cancelled {
            operation: operation.into(),
            reason,
        }
    }

    pub fn category(&self) -> ErrorCategory {
        match self {
            ApiError::Transport { .. } => ErrorCategory::Transport,
            ApiError::Auth(_) => ErrorCategory::Auth,
            ApiError::RateLimitedOrService { .. } => ErrorCategory::RateLimitedOrService,
            ApiError::Client(_) => ErrorCategory::Client,
            ApiError::Decode { .. } => ErrorCategory::Decode,
            ApiError::Cancelled { .. } => ErrorCategory::Cancelled,
            ApiError::Config { .. } => ErrorCategory::Config,
        }
    }

    /// The failed HTTP exchange, for status-derived errors.
    pub fn http(&self) -> Option<&HttpFailure> {
        match self {
            ApiError::Auth(f) | ApiError::Client(f) => Some(f),
            ApiError::RateLimitedOrService { failure, .. } => Some(failure),
            _ => None,
        }
    }

    pub fn status(&self) -> Option<u16> {
        self.http().map(|f| f.status)
    }

    /// Raw response body for HTTP-derived and decode errors.
    pub fn body(&self) -> Option<&[u8]> {
        match self {
            ApiError::Decode { body, .. } => Some(body),
            _ => self.http().map(|f| f.body.as_slice()),
        }
    }

    /// Numeric codes from the response envelope's `errors` array.
    pub fn error_codes(&self) -> Vec<i64> {
        self.http()
            .map(|f| f.errors.iter().map(|e| e.code).collect())
            .unwrap_or_default()
    }

    pub fn operation(&self) -> Option<&str> {
        match self {
            ApiError::Transport { operation, .. }
            | ApiError::Decode { operation, .. }
            | ApiError::Cancelled { operation, .. } => Some(operation),
            ApiError::Config { .. } => None,
            _ => self.http().map(|f| f.operation.as_str()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::request::Headers;

    fn response(status: u16, body: &str) -> Response {
        let mut headers = Headers::new();
        headers.insert("CF-RAY", "8a1b2c3d4e-AMS");
        Response {
            status,
            headers,
            body: body.as_bytes().to_vec(),
        }
    }

    #[test]
    fn failure_keeps_body_and_parses_envelope_errors() {
        let body = r#"{"success":false,"errors":[{"code":1003,"message":"Invalid or missing zone id."}],"messages":[],"result":null}"#;
        let f = HttpFailure::from_response("get zone", &response(400, body));
        assert_eq!(f.status, 400);
        assert_eq!(f.body_text(), body);
        assert_eq!(f.errors.len(), 1);
        assert_eq!(f.errors[0].code, 1003);
        assert_eq!(f.ray_id.as_deref(), Some("8a1b2c3d4e-AMS"));
        let msg = f.to_string();
        assert!(msg.contains("get zone: HTTP 400"));
        assert!(msg.contains("Invalid or missing zone id."));
    }

    #[test]
    fn non_json_body_is_still_captured() {
        let f = HttpFailure::from_response("op", &response(418, "I'm a teapot"));
        assert!(f.errors.is_empty());
        let err = ApiError::Client(f);
        assert_eq!(err.category(), ErrorCategory::Client);
        assert_eq!(err.status(), Some(418));
        assert_eq!(err.body(), Some(&b"I'm a teapot"[..]));
        assert_eq!(err.operation(), Some("op"));
    }

    #[test]
    fn error_codes_from_envelope() {
        let body = r#"{"success":false,"errors":[{"code":10000,"message":"Authentication error"},{"code":9109,"message":"Invalid access token"}]}"#;
        let err = ApiError::Auth(HttpFailure::from_response("op", &response(403, body)));
        assert_eq!(err.error_codes(), vec![10000, 9109]);
        assert_eq!(err.category(), ErrorCategory::Auth);
    }

    #[test]
    fn config_error_has_no_operation() {
        let err = ApiError::config("bad");
        assert_eq!(err.category(), ErrorCategory::Config);
        assert!(err.operation().is_none());
        assert!(err.status().is_none());
    }
}
