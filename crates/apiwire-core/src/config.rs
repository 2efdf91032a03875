use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

/// Retry policy parameters (`[retry]` in config.toml).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 = single attempt).
    pub max_retries: u32,
    /// Backoff before the first retry, in seconds; doubles per retry.
    pub min_retry_delay_secs: f64,
    /// Upper bound for any single backoff, in seconds.
    pub max_retry_delay_secs: f64,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: 3,
            min_retry_delay_secs: 1.0,
            max_retry_delay_secs: 30.0,
        }
    }
}

/// Client-side token bucket (`[rate_limit]`).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RateLimitConfig {
    pub requests_per_second: f64,
    pub burst: u32,
}

impl Default for RateLimitConfig {
    fn default() -> Self {
        Self {
            requests_per_second: 4.0,
            burst: 1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeoutConfig {
    pub connect_secs: u64,
    /// Per attempt, body included.
    pub request_secs: u64,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            connect_secs: 15,
            request_secs: 60,
        }
    }
}

/// Client configuration loaded from `~/.config/apiwire/config.toml`.
///
/// Credentials are never read from this file; see `Credentials::from_env`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ApiwireConfig {
    /// API root, e.g. `https://api.cloudflare.com/client/v4`.
    #[serde(default)]
    pub base_url: Option<String>,
    /// Overrides the default `apiwire/<version>` User-Agent.
    #[serde(default)]
    pub user_agent: Option<String>,
    #[serde(default)]
    pub retry: Option<RetryConfig>,
    #[serde(default)]
    pub rate_limit: Option<RateLimitConfig>,
    #[serde(default)]
    pub timeouts: Option<TimeoutConfig>,
}

impl Default for ApiwireConfig {
    fn default() -> Self {
        Self {
            base_url: Some(crate::client::DEFAULT_BASE_URL.to_string()),
            user_agent: None,
            retry: Some(RetryConfig::default()),
            rate_limit: Some(RateLimitConfig::default()),
            timeouts: Some(TimeoutConfig::default()),
        }
    }
}

pub fn config_path() -> Result<PathBuf> {
    let xdg_dirs = xdg::BaseDirectories::with_prefix("apiwire")?;
    Ok(xdg_dirs.place_config_file("config.toml")?)
}

/// Load configuration from disk, creating a default file if none exists.
pub fn load_or_init() -> Result<ApiwireConfig> {
    let path = config_path()?;
    if !path.exists() {
        let default_cfg = ApiwireConfig::default();
        let toml = toml::to_string_pretty(&default_cfg)?;
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::write(&path, toml)?;
        tracing::info!("created default config at {}", path.display());
        return Ok(default_cfg);
    }
    load_from_path(&path)
}

/// Load configuration from an explicit path; the file must exist.
pub fn load_from_path(path: &Path) -> Result<ApiwireConfig> {
    let data = fs::read_to_string(path)
        .with_context(|| format!("reading config {}", path.display()))?;
    let cfg: ApiwireConfig =
        toml::from_str(&data).with_context(|| format!("parsing config {}", path.display()))?;
    Ok(cfg)
}
