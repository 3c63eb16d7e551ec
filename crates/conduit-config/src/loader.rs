use std::path::Path;

use crate::GatewayConfig;

impl GatewayConfig {
    /// Load configuration from a TOML file
    ///
    /// Expands `{{ env.VAR }}` placeholders, deserializes, then validates.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read, a referenced variable
    /// is unset, the TOML is malformed, or validation fails
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| anyhow::anyhow!("failed to read config file {}: {e}", path.display()))?;

        Self::from_toml_str(&raw)
    }

    /// Parse configuration from TOML text
    ///
    /// # Errors
    ///
    /// Same as [`GatewayConfig::load`], minus the file read
    pub fn from_toml_str(raw: &str) -> anyhow::Result<Self> {
        let expanded =
            crate::env::expand_env(raw).map_err(|e| anyhow::anyhow!("config variable expansion failed: {e}"))?;

        let config: Self = toml::from_str(&expanded).map_err(|e| anyhow::anyhow!("failed to parse config: {e}"))?;

        config.validate()?;

        Ok(config)
    }

    /// Check what can be checked without building a client
    ///
    /// Numeric guards on the timeout and retry bounds live in the client
    /// so that programmatic configs get them too.
    ///
    /// # Errors
    ///
    /// Returns an error on a non-HTTP base URL or a blank model/header value
    pub fn validate(&self) -> anyhow::Result<()> {
        if let Some(url) = &self.base_url
            && !matches!(url.scheme(), "http" | "https")
        {
            anyhow::bail!("base_url must use http or https, got '{}'", url.scheme());
        }

        if self.default_model.as_deref().is_some_and(|m| m.trim().is_empty()) {
            anyhow::bail!("default_model must not be blank when set");
        }

        for (field, value) in [("app_title", &self.app_title), ("site_url", &self.site_url)] {
            if value.as_deref().is_some_and(|v| v.trim().is_empty()) {
                anyhow::bail!("{field} must not be blank when set");
            }
        }

        Ok(())
    }
}
