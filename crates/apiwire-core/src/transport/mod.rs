//! Single-attempt HTTP transport.
//!
//! The executor renders each attempt into an `OutboundRequest` and hands it to
//! a `Transport`. The transport reads the whole body before returning, so a
//! `Response` always represents a fully drained exchange.

mod easy;

pub use easy::{CurlTransport, CurlTransportOptions};

use thiserror::Error;

use crate::cancel::{CancelToken, Cancelled};
use crate::request::{Headers, Method, Response};

/// One fully rendered attempt: absolute URL, final headers, body.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundRequest {
    pub method: Method,
    pub url: String,
    pub headers: Headers,
    pub body: Option<Vec<u8>>,
}

/// Why an attempt produced no response.
#[derive(Debug, Error)]
pub enum TransportError {
    /// libcurl failed (connect, DNS, timeout, reset, ...).
    #[error("{0}")]
    Curl(#[from] curl::Error),
    /// Any other transport failure.
    #[error("{0}")]
    Failed(String),
    /// The caller's token fired before or during the transfer.
    #[error(transparent)]
    Cancelled(#[from] Cancelled),
}

/// Sends one attempt and returns the complete response.
pub trait Transport: Send + Sync {
    fn send(
        &self,
        request: &OutboundRequest,
        cancel: &CancelToken,
    ) -> Result<Response, TransportError>;
}
