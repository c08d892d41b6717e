//! Link configuration loaded from environment variables.
//!
//! All settings come from environment variables (or a `.env` file via
//! `dotenvy`). Everything except the device base URL falls back to a
//! default when missing or unparsable.

use std::path::PathBuf;
use std::time::Duration;

use reqwest::Url;

use crate::domain::BackoffPolicy;
use crate::error::LinkError;

/// Default device address when running as the controller's own AP.
const DEFAULT_BASE_URL: &str = "http://192.168.4.1";

/// Top-level link configuration.
///
/// Loaded once at startup via [`LinkConfig::from_env`].
#[derive(Debug, Clone)]
pub struct LinkConfig {
    /// Base URL of the device's HTTP server (e.g. `http://192.168.4.1`).
    pub base_url: Url,

    /// Path of the live channel endpoint on the same host.
    pub ws_path: String,

    /// File holding the API token between runs.
    pub token_file: PathBuf,

    /// Reconnect backoff schedule.
    pub backoff: BackoffPolicy,

    /// Interval between state polls while the live channel is down.
    /// Zero disables periodic polling.
    pub state_poll_interval: Duration,

    /// Timeout for individual HTTP requests. `None` leaves it to the
    /// transport.
    pub request_timeout: Option<Duration>,
}

impl LinkConfig {
    /// Creates a configuration for `base_url` with every other setting at
    /// its default.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::InvalidConfig`] if `base_url` is not an
    /// absolute `http` or `https` URL.
    pub fn new(base_url: &str) -> Result<Self, LinkError> {
        Ok(Self {
            base_url: parse_base_url(base_url)?,
            ws_path: "/ws".to_string(),
            token_file: PathBuf::from(".apitoken"),
            backoff: BackoffPolicy::default(),
            state_poll_interval: Duration::from_secs(5),
            request_timeout: Some(Duration::from_secs(10)),
        })
    }

    /// Loads configuration from environment variables.
    ///
    /// Calls `dotenvy::dotenv().ok()` to optionally load a `.env` file.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::InvalidConfig`] if `AP_BASE_URL` is set but is
    /// not an absolute `http` or `https` URL.
    pub fn from_env() -> Result<Self, LinkError> {
        dotenvy::dotenv().ok();

        let base_url =
            std::env::var("AP_BASE_URL").unwrap_or_else(|_| DEFAULT_BASE_URL.to_string());
        let mut config = Self::new(&base_url)?;

        if let Ok(path) = std::env::var("AP_WS_PATH") {
            config.ws_path = path;
        }
        if let Ok(file) = std::env::var("AP_TOKEN_FILE") {
            config.token_file = PathBuf::from(file);
        }

        let defaults = BackoffPolicy::default();
        config.backoff = BackoffPolicy {
            floor: Duration::from_millis(parse_env(
                "AP_BACKOFF_FLOOR_MS",
                millis(defaults.floor),
            )),
            ceiling: Duration::from_millis(nonzero_or(
                "AP_BACKOFF_CEILING_MS",
                parse_env("AP_BACKOFF_CEILING_MS", millis(defaults.ceiling)),
                millis(defaults.ceiling),
            )),
            factor: parse_env("AP_BACKOFF_FACTOR", defaults.factor),
        };

        config.state_poll_interval = Duration::from_secs(parse_env("AP_STATE_POLL_SECS", 5));

        let timeout_secs: u64 = parse_env("AP_REQUEST_TIMEOUT_SECS", 10);
        config.request_timeout = (timeout_secs > 0).then(|| Duration::from_secs(timeout_secs));

        Ok(config)
    }

    /// Returns the live channel URL: same host as [`Self::base_url`],
    /// `wss` when the page scheme is `https`, `ws` otherwise.
    ///
    /// # Errors
    ///
    /// Returns [`LinkError::InvalidConfig`] if the scheme cannot be
    /// rewritten.
    pub fn ws_url(&self) -> Result<Url, LinkError> {
        let mut url = self.base_url.clone();
        let scheme = if url.scheme() == "https" { "wss" } else { "ws" };
        url.set_scheme(scheme)
            .map_err(|()| LinkError::InvalidConfig(format!("cannot use scheme {scheme}")))?;
        url.set_path(&self.ws_path);
        url.set_query(None);
        Ok(url)
    }
}

fn parse_base_url(raw: &str) -> Result<Url, LinkError> {
    let url = Url::parse(raw).map_err(|e| LinkError::InvalidConfig(format!("{raw}: {e}")))?;
    match url.scheme() {
        "http" | "https" => Ok(url),
        other => Err(LinkError::InvalidConfig(format!(
            "unsupported scheme {other} in {raw}"
        ))),
    }
}

fn millis(d: Duration) -> u64 {
    u64::try_from(d.as_millis()).unwrap_or(u64::MAX)
}

/// Replaces a zero `value` with `default`, logging the substitution.
fn nonzero_or(key: &str, value: u64, default: u64) -> u64 {
    if value == 0 {
        tracing::warn!(key, default, "zero is not allowed here, using default");
        default
    } else {
        value
    }
}

/// Parses an environment variable as `T`, returning `default` on missing
/// or invalid values.
fn parse_env<T: std::str::FromStr>(key: &str, default: T) -> T {
    std::env::var(key)
        .ok()
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}
