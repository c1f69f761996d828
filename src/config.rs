//! API credential and endpoint configuration.

use std::time::Duration;

/// Default API request rate in calls per second.
pub const DEFAULT_RATE_LIMIT: f64 = 2.5;

/// Default per-request timeout in seconds.
pub const DEFAULT_TIMEOUT_SECS: u64 = 60;

/// Configuration for talking to the call-intelligence API.
///
/// Credentials are injected by the caller (CLI flags or environment); this
/// struct only validates and carries them.
#[derive(Debug, Clone)]
pub struct ApiConfig {
    /// API access key (Basic auth username)
    pub access_key: String,
    /// API access key secret (Basic auth password)
    pub access_key_secret: String,
    /// Base URL of the API, without trailing slash
    pub base_url: String,
    /// Requests per second the rate limiter enforces
    pub rate_limit: f64,
    /// Per-request timeout
    pub timeout: Duration,
}

impl ApiConfig {
    /// Create a config with default rate limit and timeout.
    pub fn new(
        access_key: impl Into<String>,
        access_key_secret: impl Into<String>,
        base_url: impl Into<String>,
    ) -> Result<Self, ConfigError> {
        let config = Self {
            access_key: access_key.into(),
            access_key_secret: access_key_secret.into(),
            base_url: normalize_base_url(base_url.into()),
            rate_limit: DEFAULT_RATE_LIMIT,
            timeout: Duration::from_secs(DEFAULT_TIMEOUT_SECS),
        };
        config.validate()?;
        Ok(config)
    }

    /// Override the request rate (calls per second).
    pub fn with_rate_limit(mut self, rate: f64) -> Result<Self, ConfigError> {
        self.rate_limit = rate;
        self.validate()?;
        Ok(self)
    }

    /// Override the per-request timeout.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Validate credential presence and numeric sanity.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.access_key.trim().is_empty() {
            return Err(ConfigError::MissingCredential("access key"));
        }
        if self.access_key_secret.trim().is_empty() {
            return Err(ConfigError::MissingCredential("access key secret"));
        }
        if self.base_url.trim().is_empty() {
            return Err(ConfigError::InvalidValue(
                "base URL cannot be empty".to_string(),
            ));
        }
        if !self.base_url.starts_with("http://") && !self.base_url.starts_with("https://") {
            return Err(ConfigError::InvalidValue(format!(
                "base URL must start with http:// or https://, got {:?}",
                self.base_url
            )));
        }
        if !(self.rate_limit.is_finite() && self.rate_limit > 0.0) {
            return Err(ConfigError::InvalidValue(format!(
                "rate limit must be a positive number, got {}",
                self.rate_limit
            )));
        }
        Ok(())
    }
}

/// Strip a trailing slash so endpoint paths can be appended verbatim.
fn normalize_base_url(mut url: String) -> String {
    while url.ends_with('/') {
        url.pop();
    }
    url
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// A required credential is missing or blank
    #[error("missing credential: {0}")]
    MissingCredential(&'static str),

    /// A config value failed validation
    #[error("invalid configuration: {0}")]
    InvalidValue(String),
}
