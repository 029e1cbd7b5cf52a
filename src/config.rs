use std::time::Duration;

use crate::error::{ProviderError, ProviderResult};

pub const DEFAULT_API_URL: &str = "https://app.koyeb.com";

/// Provider settings: credentials, endpoint and timing.
///
/// # Example
///
/// ```
/// use std::time::Duration;
/// use koyeb_provider::ProviderConfig;
///
/// let config = ProviderConfig::new("token")
///     .api_url("https://staging.koyeb.example/")
///     .poll_interval(Duration::from_millis(500));
///
/// assert_eq!(config.api_url, "https://staging.koyeb.example");
/// assert_eq!(config.poll_interval, Duration::from_millis(500));
/// ```
#[derive(Clone)]
pub struct ProviderConfig {
    pub token: String,
    pub api_url: String,
    /// Delay between two service listings while draining an app.
    pub poll_interval: Duration,
    pub request_timeout: Duration,
}

impl ProviderConfig {
    #[must_use]
    pub fn new(token: &str) -> Self {
        Self {
            token: token.to_string(),
            api_url: DEFAULT_API_URL.to_string(),
            poll_interval: Duration::from_secs(2),
            request_timeout: Duration::from_secs(30),
        }
    }

    /// Build the configuration from `KOYEB_TOKEN` and the optional
    /// `KOYEB_API_URL`.
    pub fn from_env() -> ProviderResult<Self> {
        let token = std::env::var("KOYEB_TOKEN").map_err(|_| {
            ProviderError::EnvMissing(
                "KOYEB_TOKEN not set. Create a token at: \
                 https://app.koyeb.com/user/settings/api"
                    .into(),
            )
        })?;
        let mut config = Self::new(&token);
        if let Ok(url) = std::env::var("KOYEB_API_URL") {
            config = config.api_url(&url);
        }
        Ok(config)
    }

    #[must_use]
    pub fn api_url(mut self, url: &str) -> Self {
        self.api_url = url.trim_end_matches('/').to_string();
        self
    }

    #[must_use]
    pub const fn poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval = interval;
        self
    }

    #[must_use]
    pub const fn request_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

impl std::fmt::Debug for ProviderConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ProviderConfig")
            .field("token", &"<redacted>")
            .field("api_url", &self.api_url)
            .field("poll_interval", &self.poll_interval)
            .field("request_timeout", &self.request_timeout)
            .finish()
    }
}
