//! Member directory client configuration.
//!
//! The directory is optional: when `MEMBER_DIRECTORY_URL` is unset the
//! server falls back to an in-memory directory.

use url::Url;

/// Default request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Connection settings for the remote member directory.
///
/// Custom `Debug` implementation redacts the `api_token` field.
#[derive(Clone)]
pub struct DirectoryConfig {
    /// Base URL of the member service, e.g. `https://members.internal`.
    pub base_url: Url,
    /// Optional bearer token.
    pub api_token: Option<String>,
    /// Request timeout in seconds.
    pub timeout_secs: u64,
}

impl std::fmt::Debug for DirectoryConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DirectoryConfig")
            .field("base_url", &self.base_url)
            .field(
                "api_token",
                &self.api_token.as_ref().map(|_| "[REDACTED]"),
            )
            .field("timeout_secs", &self.timeout_secs)
            .finish()
    }
}

impl DirectoryConfig {
    /// Configuration for `base_url` with no token and the default timeout.
    pub fn new(base_url: &str) -> Result<Self, ConfigError> {
        Ok(Self {
            base_url: parse_base_url("base_url", base_url)?,
            api_token: None,
            timeout_secs: DEFAULT_TIMEOUT_SECS,
        })
    }

    /// Builder: set the bearer token.
    pub fn with_token(mut self, token: impl Into<String>) -> Self {
        self.api_token = Some(token.into());
        self
    }

    /// Load configuration from environment variables.
    ///
    /// Returns `Ok(None)` when `MEMBER_DIRECTORY_URL` is unset.
    ///
    /// Variables:
    /// - `MEMBER_DIRECTORY_URL` (optional)
    /// - `MEMBER_DIRECTORY_TOKEN` (optional)
    /// - `MEMBER_DIRECTORY_TIMEOUT_SECS` (default: 30)
    pub fn from_env() -> Result<Option<Self>, ConfigError> {
        let Ok(raw) = std::env::var("MEMBER_DIRECTORY_URL") else {
            return Ok(None);
        };
        let timeout_secs = match std::env::var("MEMBER_DIRECTORY_TIMEOUT_SECS") {
            Ok(v) => v
                .parse()
                .ok()
                .filter(|secs| *secs > 0)
                .ok_or_else(|| ConfigError::InvalidTimeout(v.clone()))?,
            Err(_) => DEFAULT_TIMEOUT_SECS,
        };
        Ok(Some(Self {
            base_url: parse_base_url("MEMBER_DIRECTORY_URL", &raw)?,
            api_token: std::env::var("MEMBER_DIRECTORY_TOKEN")
                .ok()
                .filter(|t| !t.trim().is_empty()),
            timeout_secs,
        }))
    }
}

fn parse_base_url(var: &str, raw: &str) -> Result<Url, ConfigError> {
    let url = Url::parse(raw).map_err(|e| ConfigError::InvalidUrl(var.to_string(), e.to_string()))?;
    if !matches!(url.scheme(), "http" | "https") || url.cannot_be_a_base() {
        return Err(ConfigError::InvalidUrl(
            var.to_string(),
            format!("expected an http(s) base URL, got {raw}"),
        ));
    }
    Ok(url)
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("invalid URL for {0}: {1}")]
    InvalidUrl(String, String),
    #[error("MEMBER_DIRECTORY_TIMEOUT_SECS must be a positive integer, got {0:?}")]
    InvalidTimeout(String),
    #[error("MEMBER_DIRECTORY_TOKEN is not a valid header value")]
    InvalidToken,
}
