//! Programmatic client configuration for integration tests

use std::time::Duration;

use conduit_config::{GatewayConfig, RetryConfig};
use url::Url;

pub const TEST_MODEL: &str = "mock/gpt-test";

/// Builder for constructing test configurations
pub struct ConfigBuilder {
    config: GatewayConfig,
}

impl ConfigBuilder {
    /// Point at `base_url` with short timeouts and fast retries
    pub fn new(base_url: &str) -> Self {
        let config = GatewayConfig::new("sk-test-key")
            .with_base_url(Url::parse(base_url).unwrap())
            .with_default_model(TEST_MODEL)
            .with_timeout(Duration::from_secs(5))
            .with_retry(RetryConfig {
                max_retries: 2,
                base_delay: Duration::from_millis(10),
                max_delay: Duration::from_millis(50),
            });

        Self { config }
    }

    pub const fn timeout(mut self, timeout: Duration) -> Self {
        self.config.timeout = timeout;
        self
    }

    pub const fn max_retries(mut self, max_retries: u32) -> Self {
        self.config.retry.max_retries = max_retries;
        self
    }

    pub fn attribution(mut self, app_title: &str, site_url: &str) -> Self {
        self.config.app_title = Some(app_title.to_owned());
        self.config.site_url = Some(site_url.to_owned());
        self
    }

    pub fn build(self) -> GatewayConfig {
        self.config
    }
}
