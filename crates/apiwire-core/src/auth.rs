//! Authentication header selection.
//!
//! Each bit of `AuthMode` enables one header scheme; schemes are additive.
//! `auth_headers` is pure: same credentials and mode always give the same set.

use secrecy::{ExposeSecret, SecretString};
use std::fmt;
use std::ops::{BitOr, BitOrAssign};

use crate::error::ApiError;
use crate::request::Headers;

pub const HEADER_AUTH_KEY: &str = "X-Auth-Key";
pub const HEADER_AUTH_EMAIL: &str = "X-Auth-Email";
pub const HEADER_USER_SERVICE_KEY: &str = "X-Auth-User-Service-Key";
pub const HEADER_AUTHORIZATION: &str = "Authorization";

/// Bitmask of enabled auth schemes. Bits outside the known set are kept but ignored.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct AuthMode(u32);

impl AuthMode {
    /// No auth headers.
    pub const NONE: AuthMode = AuthMode(0);
    /// `X-Auth-Key` + `X-Auth-Email`.
    pub const KEY_EMAIL: AuthMode = AuthMode(1 << 0);
    /// `X-Auth-User-Service-Key`.
    pub const USER_SERVICE: AuthMode = AuthMode(1 << 1);
    /// `Authorization: Bearer <token>`.
    pub const TOKEN: AuthMode = AuthMode(1 << 2);

    const KNOWN: u32 = Self::KEY_EMAIL.0 | Self::USER_SERVICE.0 | Self::TOKEN.0;

    pub const fn from_bits(bits: u32) -> Self {
        AuthMode(bits)
    }

    pub const fn bits(self) -> u32 {
        self.0
    }

    pub const fn contains(self, other: AuthMode) -> bool {
        other.0 != 0 && self.0 & other.0 == other.0
    }

    /// True when no known scheme bit is set.
    pub const fn is_empty(self) -> bool {
        self.0 & Self::KNOWN == 0
    }

    /// Pick a mode from whichever credentials are present: token first, then
    /// key + e-mail, then the user-service key.
    pub fn from_credentials(creds: &Credentials) -> Self {
        if creds.api_token.is_some() {
            AuthMode::TOKEN
        } else if creds.api_key.is_some() && creds.api_email.is_some() {
            AuthMode::KEY_EMAIL
        } else if creds.user_service_key.is_some() {
            AuthMode::USER_SERVICE
        } else {
            AuthMode::NONE
        }
    }
}

impl BitOr for AuthMode {
    type Output = AuthMode;

    fn bitor(self, rhs: AuthMode) -> AuthMode {
        AuthMode(self.0 | rhs.0)
    }
}

impl BitOrAssign for AuthMode {
    fn bitor_assign(&mut self, rhs: AuthMode) {
        self.0 |= rhs.0;
    }
}

impl fmt::Debug for AuthMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut names = Vec::new();
        if self.contains(AuthMode::KEY_EMAIL) {
            names.push("KEY_EMAIL");
        }
        if self.contains(AuthMode::USER_SERVICE) {
            names.push("USER_SERVICE");
        }
        if self.contains(AuthMode::TOKEN) {
            names.push("TOKEN");
        }
        if names.is_empty() {
            names.push("NONE");
        }
        write!(f, "AuthMode({})", names.join(" | "))
    }
}

/// Key material for all supported schemes. Any subset may be present.
#[derive(Debug, Default)]
pub struct Credentials {
    pub api_key: Option<SecretString>,
    pub api_email: Option<String>,
    pub user_service_key: Option<SecretString>,
    pub api_token: Option<SecretString>,
}

impl Credentials {
    pub fn token(token: impl Into<String>) -> Self {
        Self {
            api_token: Some(SecretString::from(token.into())),
            ..Self::default()
        }
    }

    pub fn key_email(key: impl Into<String>, email: impl Into<String>) -> Self {
        Self {
            api_key: Some(SecretString::from(key.into())),
            api_email: Some(email.into()),
            ..Self::default()
        }
    }

    pub fn user_service_key(key: impl Into<String>) -> Self {
        Self {
            user_service_key: Some(SecretString::from(key.into())),
            ..Self::default()
        }
    }

    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(SecretString::from(token.into()));
        self
    }

    pub fn with_key_email(mut self, key: impl Into<String>, email: impl Into<String>) -> Self {
        self.api_key = Some(SecretString::from(key.into()));
        self.api_email = Some(email.into());
        self
    }

    pub fn with_user_service_key(mut self, key: impl Into<String>) -> Self {
        self.user_service_key = Some(SecretString::from(key.into()));
        self
    }

    /// Read credentials from `CLOUDFLARE_API_TOKEN`, `CLOUDFLARE_API_KEY` +
    /// `CLOUDFLARE_EMAIL`, and `CLOUDFLARE_API_USER_SERVICE_KEY`. Unset or empty
    /// variables are skipped.
    pub fn from_env() -> Self {
        fn var(name: &str) -> Option<String> {
            std::env::var(name).ok().filter(|v| !v.trim().is_empty())
        }
        Self {
            api_key: var("CLOUDFLARE_API_KEY").map(SecretString::from),
            api_email: var("CLOUDFLARE_EMAIL"),
            user_service_key: var("CLOUDFLARE_API_USER_SERVICE_KEY").map(SecretString::from),
            api_token: var("CLOUDFLARE_API_TOKEN").map(SecretString::from),
        }
    }

    /// Check that every scheme enabled in `mode` has its key material.
    pub fn validate_for(&self, mode: AuthMode) -> Result<(), ApiError> {
        if mode.contains(AuthMode::KEY_EMAIL) && (self.api_key.is_none() || self.api_email.is_none())
        {
            return Err(ApiError::config(
                "auth mode KEY_EMAIL requires both an API key and an e-mail",
            ));
        }
        if mode.contains(AuthMode::USER_SERVICE) && self.user_service_key.is_none() {
            return Err(ApiError::config(
                "auth mode USER_SERVICE requires a user service key",
            ));
        }
        if mode.contains(AuthMode::TOKEN) && self.api_token.is_none() {
            return Err(ApiError::config("auth mode TOKEN requires an API token"));
        }
        Ok(())
    }
}

/// Headers for every scheme set in `mode`.
///
/// Schemes whose credentials are missing contribute nothing; `Client`
/// construction rejects that combination up front via `validate_for`.
pub fn auth_headers(creds: &Credentials, mode: AuthMode) -> Headers {
    let mut headers = Headers::new();
    if mode.contains(AuthMode::KEY_EMAIL) {
        if let (Some(key), Some(email)) = (&creds.api_key, &creds.api_email) {
            headers.insert(HEADER_AUTH_KEY, key.expose_secret());
            headers.insert(HEADER_AUTH_EMAIL, email.as_str());
        }
    }
    if mode.contains(AuthMode::USER_SERVICE) {
        if let Some(key) = &creds.user_service_key {
            headers.insert(HEADER_USER_SERVICE_KEY, key.expose_secret());
        }
    }
    if mode.contains(AuthMode::TOKEN) {
        if let Some(token) = &creds.api_token {
            headers.insert(
                HEADER_AUTHORIZATION,
                format!("Bearer {}", token.expose_secret()),
            );
        }
    }
    headers
}
