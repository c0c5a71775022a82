//! Configuration for the manifest client.

use std::time::Duration;

/// Manifest URL used when neither settings nor the command line name one.
pub const DEFAULT_MANIFEST_URL: &str = "https://games.arcade.example/manifest.json";

/// Configuration for fetching the remote manifest.
///
/// # Example
///
/// ```
/// use arcade_manifest::ManifestClientConfig;
/// use std::time::Duration;
///
/// let config = ManifestClientConfig::new("https://cdn.example/manifest.json")
///     .with_timeout(Duration::from_secs(10))
///     .with_max_retries(1);
/// ```
#[derive(Debug, Clone)]
pub struct ManifestClientConfig {
    pub(crate) manifest_url: String,
    pub(crate) user_agent: String,
    pub(crate) timeout: Duration,
    pub(crate) max_retries: u8,
    pub(crate) retry_base_delay: Duration,
}

impl Default for ManifestClientConfig {
    fn default() -> Self {
        Self {
            manifest_url: DEFAULT_MANIFEST_URL.to_string(),
            user_agent: concat!("arcade/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(15),
            max_retries: 2,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

impl ManifestClientConfig {
    /// Configuration for `manifest_url` with default transport settings.
    #[must_use]
    pub fn new(manifest_url: impl Into<String>) -> Self {
        Self {
            manifest_url: manifest_url.into(),
            ..Self::default()
        }
    }

    /// Set the request timeout.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set how many times a 5xx or network failure is retried.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the base delay for exponential backoff.
    #[must_use]
    pub const fn with_retry_base_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }

    /// Set the user agent.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Manifest URL.
    pub fn manifest_url(&self) -> &str {
        &self.manifest_url
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_overrides() {
        let config = ManifestClientConfig::new("https://x.example/m.json")
            .with_timeout(Duration::from_secs(3))
            .with_max_retries(0)
            .with_user_agent("test");

        assert_eq!(config.manifest_url(), "https://x.example/m.json");
        assert_eq!(config.timeout, Duration::from_secs(3));
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.user_agent, "test");
    }

    #[test]
    fn test_default_user_agent_carries_version() {
        assert!(ManifestClientConfig::default().user_agent.starts_with("arcade/"));
    }
}
