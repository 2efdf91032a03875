//! `ClientBuilder`: collects options, validates them and applies defaults
//! before any request can be sent.

use std::sync::Arc;
use std::time::Duration;

use url::Url;

use super::{Client, Inner};
use crate::auth::{AuthMode, Credentials};
use crate::config::ApiwireConfig;
use crate::error::ApiError;
use crate::rate_limit::{RateLimiter, DEFAULT_BURST, DEFAULT_REQUESTS_PER_SECOND};
use crate::request::Headers;
use crate::retry::RetryPolicy;
use crate::transport::{CurlTransport, CurlTransportOptions, Transport};

pub const DEFAULT_BASE_URL: &str = "https://api.cloudflare.com/client/v4";

fn secs(field: &str, value: f64) -> Result<Duration, ApiError> {
    Duration::try_from_secs_f64(value)
        .map_err(|e| ApiError::config(format!("{} = {}: {}", field, value, e)))
}

pub struct ClientBuilder {
    base_url: String,
    credentials: Credentials,
    auth_mode: Option<AuthMode>,
    headers: Headers,
    user_agent: Option<String>,
    max_retries: u32,
    min_retry_delay: Duration,
    max_retry_delay: Duration,
    requests_per_second: f64,
    burst: u32,
    transport_options: CurlTransportOptions,
    transport: Option<Arc<dyn Transport>>,
}

impl Default for ClientBuilder {
    fn default() -> Self {
        let retry = RetryPolicy::default();
        Self {
            base_url: DEFAULT_BASE_URL.to_string(),
            credentials: Credentials::default(),
            auth_mode: None,
            headers: Headers::new(),
            user_agent: None,
            max_retries: retry.max_retries(),
            min_retry_delay: retry.min_retry_delay(),
            max_retry_delay: retry.max_retry_delay(),
            requests_per_second: DEFAULT_REQUESTS_PER_SECOND,
            burst: DEFAULT_BURST,
            transport_options: CurlTransportOptions::default(),
            transport: None,
        }
    }
}

impl ClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a loaded config file. Credentials still have to be supplied.
    pub fn from_config(cfg: &ApiwireConfig) -> Result<Self, ApiError> {
        let mut b = Self::new();
        if let Some(url) = &cfg.base_url {
            b.base_url = url.clone();
        }
        b.user_agent = cfg.user_agent.clone();
        if let Some(retry) = &cfg.retry {
            b.max_retries = retry.max_retries;
            b.min_retry_delay = secs("retry.min_retry_delay_secs", retry.min_retry_delay_secs)?;
            b.max_retry_delay = secs("retry.max_retry_delay_secs", retry.max_retry_delay_secs)?;
        }
        if let Some(rl) = &cfg.rate_limit {
            b.requests_per_second = rl.requests_per_second;
            b.burst = rl.burst;
        }
        if let Some(t) = &cfg.timeouts {
            b.transport_options.connect_timeout = Duration::from_secs(t.connect_secs);
            b.transport_options.request_timeout = Duration::from_secs(t.request_secs);
        }
        Ok(b)
    }

    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = url.into();
        self
    }

    pub fn credentials(mut self, credentials: Credentials) -> Self {
        self.credentials = credentials;
        self
    }

    /// Explicit auth mode. When unset, it is inferred from the credentials.
    pub fn auth_mode(mut self, mode: AuthMode) -> Self {
        self.auth_mode = Some(mode);
        self
    }

    /// Custom header sent with every request (auth headers take precedence).
    pub fn header(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.headers.insert(name, value);
        self
    }

    pub fn user_agent(mut self, ua: impl Into<String>) -> Self {
        self.user_agent = Some(ua.into());
        self
    }

    pub fn max_retries(mut self, n: u32) -> Self {
        self.max_retries = n;
        self
    }

    pub fn retry_delays(mut self, min: Duration, max: Duration) -> Self {
        self.min_retry_delay = min;
        self.max_retry_delay = max;
        self
    }

    pub fn retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.max_retries = policy.max_retries();
        self.min_retry_delay = policy.min_retry_delay();
        self.max_retry_delay = policy.max_retry_delay();
        self
    }

    pub fn rate_limit(mut self, requests_per_second: f64, burst: u32) -> Self {
        self.requests_per_second = requests_per_second;
        self.burst = burst;
        self
    }

    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.transport_options.connect_timeout = timeout;
        self
    }

    pub fn request_timeout(mut self, timeout: Duration) -> Self {
        self.transport_options.request_timeout = timeout;
        self
    }

    /// Replace the libcurl transport (tests, proxies, recording).
    pub fn transport(mut self, transport: Arc<dyn Transport>) -> Self {
        self.transport = Some(transport);
        self
    }

    pub fn build(self) -> Result<Client, ApiError> {
        let base_url = Url::parse(&self.base_url)
            .map_err(|e| ApiError::config(format!("invalid base URL {:?}: {}", self.base_url, e)))?;
        if !matches!(base_url.scheme(), "http" | "https") {
            return Err(ApiError::config(format!(
                "base URL must be http or https, got {:?}",
                base_url.scheme()
            )));
        }

        let auth_mode = self
            .auth_mode
            .unwrap_or_else(|| AuthMode::from_credentials(&self.credentials));
        self.credentials.validate_for(auth_mode)?;

        let retry = RetryPolicy::new(self.max_retries, self.min_retry_delay, self.max_retry_delay)?;
        let limiter = RateLimiter::new(self.requests_per_second, self.burst)?;
        let transport = match self.transport {
            Some(t) => t,
            None => Arc::new(CurlTransport::new(self.transport_options)),
        };
        let user_agent = self
            .user_agent
            .unwrap_or_else(|| format!("apiwire/{}", env!("CARGO_PKG_VERSION")));

        tracing::debug!(
            base_url = %base_url,
            auth_mode = ?auth_mode,
            max_retries = retry.max_retries(),
            requests_per_second = limiter.requests_per_second(),
            burst = limiter.burst(),
            "client configured"
        );

        Ok(Client {
            inner: Arc::new(Inner {
                base_url,
                credentials: Arc::new(self.credentials),
                auth_mode,
                headers: self.headers,
                user_agent,
                retry,
                limiter: Arc::new(limiter),
                transport,
            }),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{RateLimitConfig, RetryConfig};
    use crate::error::ErrorCategory;

    #[test]
    fn defaults_apply() {
        let c = ClientBuilder::new()
            .credentials(Credentials::token("t"))
            .build()
            .unwrap();
        assert_eq!(c.base_url().as_str(), "https://api.cloudflare.com/client/v4");
        assert_eq!(c.auth_mode(), AuthMode::TOKEN);
        assert_eq!(*c.retry_policy(), RetryPolicy::default());
        assert_eq!(c.rate_limiter().requests_per_second(), 4.0);
        assert_eq!(c.rate_limiter().burst(), 1);
    }

    #[test]
    fn rejects_invalid_inputs() {
        let cases = vec![
            ClientBuilder::new().base_url("not a url"),
            ClientBuilder::new().base_url("ftp://example.com"),
            ClientBuilder::new().retry_delays(Duration::from_secs(10), Duration::from_secs(1)),
            ClientBuilder::new().rate_limit(0.0, 1),
            ClientBuilder::new().rate_limit(4.0, 0),
            ClientBuilder::new()
                .credentials(Credentials::token("t"))
                .auth_mode(AuthMode::KEY_EMAIL),
        ];
        for b in cases {
            let err = b.build().unwrap_err();
            assert_eq!(err.category(), ErrorCategory::Config, "{}", err);
        }
    }

    #[test]
    fn no_credentials_means_no_auth() {
        let c = ClientBuilder::new().build().unwrap();
        assert_eq!(c.auth_mode(), AuthMode::NONE);
    }

    #[test]
    fn from_config_overrides_defaults() {
        let cfg = ApiwireConfig {
            base_url: Some("http://localhost:8080/v4".to_string()),
            retry: Some(RetryConfig {
                max_retries: 5,
                min_retry_delay_secs: 0.5,
                max_retry_delay_secs: 10.0,
            }),
            rate_limit: Some(RateLimitConfig {
                requests_per_second: 10.0,
                burst: 3,
            }),
            ..ApiwireConfig::default()
        };
        let c = ClientBuilder::from_config(&cfg).unwrap().build().unwrap();
        assert_eq!(c.base_url().as_str(), "http://localhost:8080/v4");
        assert_eq!(c.retry_policy().max_retries(), 5);
        assert_eq!(c.retry_policy().min_retry_delay(), Duration::from_millis(500));
        assert_eq!(c.retry_policy().max_retry_delay(), Duration::from_secs(10));
        assert_eq!(c.rate_limiter().requests_per_second(), 10.0);
        assert_eq!(c.rate_limiter().burst(), 3);
    }

    #[test]
    fn from_config_rejects_negative_delay() {
        let cfg = ApiwireConfig {
            retry: Some(RetryConfig {
                max_retries: 1,
                min_retry_delay_secs: -1.0,
                max_retry_delay_secs: 1.0,
            }),
            ..ApiwireConfig::default()
        };
        let err = ClientBuilder::from_config(&cfg).err().unwrap();
        assert_eq!(err.category(), ErrorCategory::Config);
    }
}
