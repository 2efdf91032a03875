//! libcurl transport with a pool of reusable `Easy2` handles.
//!
//! A handle goes back into the pool only after a transfer completed and its
//! body was read to the end; libcurl then keeps the connection alive for the
//! next attempt. Handles from failed or cancelled transfers are dropped.

use std::str;
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use curl::easy::{Easy2, Handler, List, WriteError};

use super::{OutboundRequest, Transport, TransportError};
use crate::cancel::{CancelToken, Cancelled};
use crate::request::{Headers, Method, Response};

/// Timeouts and pool size for `CurlTransport`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CurlTransportOptions {
    pub connect_timeout: Duration,
    /// Hard limit for one attempt, headers and body included.
    pub request_timeout: Duration,
    /// Idle handles kept for reuse; extra handles are dropped on return.
    pub max_idle_handles: usize,
}

impl Default for CurlTransportOptions {
    fn default() -> Self {
        Self {
            connect_timeout: Duration::from_secs(15),
            request_timeout: Duration::from_secs(60),
            max_idle_handles: 8,
        }
    }
}

/// Collects status-block headers and the body of one transfer, and aborts it
/// from the progress callback once the caller's token fires.
#[derive(Default)]
struct Collector {
    header_lines: Vec<String>,
    body: Vec<u8>,
    cancel: Option<CancelToken>,
}

impl Collector {
    fn start(&mut self, cancel: &CancelToken) {
        self.header_lines.clear();
        self.body.clear();
        self.cancel = Some(cancel.clone());
    }

    fn finish(&mut self) -> (Vec<String>, Vec<u8>) {
        self.cancel = None;
        (
            std::mem::take(&mut self.header_lines),
            std::mem::take(&mut self.body),
        )
    }
}

impl Handler for Collector {
    fn header(&mut self, data: &[u8]) -> bool {
        if let Ok(s) = str::from_utf8(data) {
            let line = s.trim_end();
            // A new status line (100-continue, proxy CONNECT) starts a new header block.
            if line.starts_with("HTTP/") {
                self.header_lines.clear();
            }
            self.header_lines.push(line.to_string());
        }
        true
    }

    fn write(&mut self, data: &[u8]) -> Result<usize, WriteError> {
        self.body.extend_from_slice(data);
        Ok(data.len())
    }

    fn progress(&mut self, _dltotal: f64, _dlnow: f64, _ultotal: f64, _ulnow: f64) -> bool {
        self.cancel
            .as_ref()
            .map(|c| !c.is_cancelled())
            .unwrap_or(true)
    }
}

/// Blocking transport built on libcurl.
pub struct CurlTransport {
    idle: Mutex<Vec<Easy2<Collector>>>,
    options: CurlTransportOptions,
}

impl CurlTransport {
    pub fn new(options: CurlTransportOptions) -> Self {
        Self {
            idle: Mutex::new(Vec::new()),
            options,
        }
    }

    pub fn options(&self) -> &CurlTransportOptions {
        &self.options
    }

    /// Number of handles currently parked for reuse.
    pub fn idle_handles(&self) -> usize {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner).len()
    }

    fn checkout(&self) -> Easy2<Collector> {
        self.idle
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .pop()
            .unwrap_or_else(|| Easy2::new(Collector::default()))
    }

    fn checkin(&self, easy: Easy2<Collector>) {
        let mut idle = self.idle.lock().unwrap_or_else(PoisonError::into_inner);
        if idle.len() < self.options.max_idle_handles {
            idle.push(easy);
        }
    }

    fn configure(
        &self,
        easy: &mut Easy2<Collector>,
        request: &OutboundRequest,
        cancel: &CancelToken,
    ) -> Result<(), TransportError> {
        // reset() clears options but keeps the connection cache.
        easy.reset();
        easy.url(&request.url)?;
        easy.connect_timeout(self.options.connect_timeout)?;
        let timeout = match cancel.remaining() {
            Some(left) if left.is_zero() => {
                return Err(TransportError::Cancelled(Cancelled::DeadlineExceeded))
            }
            Some(left) => left.min(self.options.request_timeout),
            None => self.options.request_timeout,
        };
        easy.timeout(timeout)?;
        easy.progress(true)?;

        match (request.method, &request.body) {
            (Method::Get, None) => easy.get(true)?,
            (Method::Post, None) => {
                easy.post(true)?;
                easy.post_field_size(0)?;
            }
            (method, Some(body)) => {
                easy.post_fields_copy(body)?;
                if method != Method::Post {
                    easy.custom_request(method.as_str())?;
                }
            }
            (method, None) => easy.custom_request(method.as_str())?,
        }

        let mut list = List::new();
        for (name, value) in request.headers.iter() {
            list.append(&format!("{}: {}", name.trim(), value.trim()))?;
        }
        // Suppress libcurl's default "Expect: 100-continue" on larger bodies.
        list.append("Expect:")?;
        easy.http_headers(list)?;

        easy.get_mut().start(cancel);
        Ok(())
    }
}

impl Default for CurlTransport {
    fn default() -> Self {
        Self::new(CurlTransportOptions::default())
    }
}

impl Transport for CurlTransport {
    fn send(
        &self,
        request: &OutboundRequest,
        cancel: &CancelToken,
    ) -> Result<Response, TransportError> {
        cancel.check()?;
        let mut easy = self.checkout();
        self.configure(&mut easy, request, cancel)?;

        let started = Instant::now();
        if let Err(e) = easy.perform() {
            // The handle is dropped here: its connection is in an unknown state.
            if let Err(reason) = cancel.check() {
                return Err(TransportError::Cancelled(reason));
            }
            tracing::debug!(
                method = request.method.as_str(),
                url = %request.url,
                error = %e,
                "transfer failed"
            );
            return Err(TransportError::Curl(e));
        }

        let status = easy.response_code()? as u16;
        let (lines, body) = easy.get_mut().finish();
        tracing::debug!(
            method = request.method.as_str(),
            url = %request.url,
            status,
            bytes = body.len(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "transfer complete"
        );
        self.checkin(easy);

        Ok(Response {
            status,
            headers: Headers::from_lines(&lines),
            body,
        })
    }
}
