use std::time::Duration;

use secrecy::SecretString;
use serde::{Deserialize, Deserializer};
use url::Url;

/// Configuration for one gateway client instance
///
/// Everything here is read once at client construction. The only value
/// that must come from the environment in practice is `api_key`.
#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct GatewayConfig {
    /// Provider API key, sent as a bearer token
    pub api_key: SecretString,
    /// Provider base URL; `/chat/completions` is appended
    #[serde(default)]
    pub base_url: Option<Url>,
    /// Model used when a request does not name one
    #[serde(default)]
    pub default_model: Option<String>,
    /// Wall-clock budget for a whole call, retries included
    #[serde(default = "default_timeout", deserialize_with = "duration")]
    pub timeout: Duration,
    /// Retry and backoff tuning
    #[serde(default)]
    pub retry: RetryConfig,
    /// Sent as `X-Title` for provider-side attribution
    #[serde(default)]
    pub app_title: Option<String>,
    /// Sent as `HTTP-Referer` for provider-side attribution
    #[serde(default)]
    pub site_url: Option<String>,
    /// Generation parameters applied to every request unless overridden
    #[serde(default)]
    pub defaults: DefaultParams,
}

impl GatewayConfig {
    /// Configuration with the given key and every other field at its default
    pub fn new(api_key: impl Into<String>) -> Self {
        Self {
            api_key: SecretString::from(api_key.into()),
            base_url: None,
            default_model: None,
            timeout: default_timeout(),
            retry: RetryConfig::default(),
            app_title: None,
            site_url: None,
            defaults: DefaultParams::default(),
        }
    }

    /// Set the provider base URL
    #[must_use]
    pub fn with_base_url(mut self, base_url: Url) -> Self {
        self.base_url = Some(base_url);
        self
    }

    /// Set the fallback model
    #[must_use]
    pub fn with_default_model(mut self, model: impl Into<String>) -> Self {
        self.default_model = Some(model.into());
        self
    }

    /// Set the per-call timeout
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the retry tuning
    #[must_use]
    pub const fn with_retry(mut self, retry: RetryConfig) -> Self {
        self.retry = retry;
        self
    }
}

/// Retry and backoff tuning
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct RetryConfig {
    /// Retries after the first attempt (0 disables retrying)
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,
    /// Base of the exponential backoff
    #[serde(default = "default_base_delay", deserialize_with = "duration")]
    pub base_delay: Duration,
    /// Upper bound on any single backoff sleep
    #[serde(default = "default_max_delay", deserialize_with = "duration")]
    pub max_delay: Duration,
}

impl Default for RetryConfig {
    fn default() -> Self {
        Self {
            max_retries: default_max_retries(),
            base_delay: default_base_delay(),
            max_delay: default_max_delay(),
        }
    }
}

/// Service-wide generation parameters
///
/// Absent fields are never sent; the provider applies its own defaults.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct DefaultParams {
    /// Sampling temperature
    #[serde(default)]
    pub temperature: Option<f64>,
    /// Nucleus sampling threshold
    #[serde(default)]
    pub top_p: Option<f64>,
    /// Maximum tokens to generate
    #[serde(default)]
    pub max_tokens: Option<u32>,
    /// Presence penalty
    #[serde(default)]
    pub presence_penalty: Option<f64>,
    /// Frequency penalty
    #[serde(default)]
    pub frequency_penalty: Option<f64>,
    /// Stop sequences
    #[serde(default)]
    pub stop: Option<Vec<String>>,
    /// Sampling seed
    #[serde(default)]
    pub seed: Option<u64>,
}

const fn default_timeout() -> Duration {
    Duration::from_secs(60)
}

const fn default_max_retries() -> u32 {
    3
}

const fn default_base_delay() -> Duration {
    Duration::from_millis(500)
}

const fn default_max_delay() -> Duration {
    Duration::from_secs(8)
}

/// Deserialize a human duration such as `"30s"` or `"250ms"`
fn duration<'de, D>(deserializer: D) -> Result<Duration, D::Error>
where
    D: Deserializer<'de>,
{
    let raw = String::deserialize(deserializer)?;
    duration_str::parse(&raw).map_err(|e| serde::de::Error::custom(format!("invalid duration '{raw}': {e}")))
}
