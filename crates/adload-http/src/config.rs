//! Configuration for the HTTP connection.

use std::time::Duration;

/// Configuration for `ReqwestConnection`.
///
/// # Example
///
/// ```
/// use adload_http::HttpConnectionConfig;
/// use std::time::Duration;
///
/// let config = HttpConnectionConfig::new()
///     .with_timeout(Duration::from_secs(10))
///     .with_max_retries(1);
/// ```
#[derive(Debug, Clone)]
pub struct HttpConnectionConfig {
    /// User agent string for HTTP requests
    pub(crate) user_agent: String,
    /// Per-request timeout
    pub(crate) timeout: Duration,
    /// Maximum number of retry attempts for transient errors
    pub(crate) max_retries: u8,
    /// Base delay for exponential backoff
    pub(crate) retry_base_delay: Duration,
}

impl Default for HttpConnectionConfig {
    fn default() -> Self {
        Self {
            user_agent: concat!("adload-http/", env!("CARGO_PKG_VERSION")).to_string(),
            timeout: Duration::from_secs(30),
            max_retries: 3,
            retry_base_delay: Duration::from_millis(500),
        }
    }
}

impl HttpConnectionConfig {
    /// Create a configuration with default settings.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the user agent string.
    #[must_use]
    pub fn with_user_agent(mut self, user_agent: impl Into<String>) -> Self {
        self.user_agent = user_agent.into();
        self
    }

    /// Set the per-request timeout.
    ///
    /// Defaults to 30 seconds.
    #[must_use]
    pub const fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    /// Set the maximum number of retries for transient errors.
    ///
    /// Defaults to 3 retries.
    #[must_use]
    pub const fn with_max_retries(mut self, retries: u8) -> Self {
        self.max_retries = retries;
        self
    }

    /// Set the base delay for exponential backoff.
    ///
    /// Defaults to 500ms.
    #[must_use]
    pub const fn with_retry_delay(mut self, delay: Duration) -> Self {
        self.retry_base_delay = delay;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HttpConnectionConfig::new();
        assert!(config.user_agent.starts_with("adload-http/"));
        assert_eq!(config.timeout, Duration::from_secs(30));
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.retry_base_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_builder_pattern() {
        let config = HttpConnectionConfig::new()
            .with_user_agent("test-agent/1.0")
            .with_timeout(Duration::from_secs(5))
            .with_max_retries(0)
            .with_retry_delay(Duration::from_millis(10));

        assert_eq!(config.user_agent, "test-agent/1.0");
        assert_eq!(config.timeout, Duration::from_secs(5));
        assert_eq!(config.max_retries, 0);
        assert_eq!(config.retry_base_delay, Duration::from_millis(10));
    }
}
