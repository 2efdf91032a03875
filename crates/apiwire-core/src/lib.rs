pub mod config;
pub mod logging;

pub mod auth;
pub mod cancel;
pub mod client;
pub mod envelope;
pub mod error;
pub mod pagination;
pub mod rate_limit;
pub mod request;
pub mod retry;
pub mod transport;

pub use auth::{AuthMode, Credentials};
pub use cancel::CancelToken;
pub use client::{Client, ClientBuilder};
pub use error::{ApiError, ErrorCategory};
pub use pagination::{Page, Pages, Paginator, ResultInfo};
pub use request::{Headers, Method, Request, Response};
pub use retry::RetryPolicy;
