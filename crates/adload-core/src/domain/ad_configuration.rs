//! Ad configuration for one load attempt.

use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default limit on concurrently running asset downloads.
pub const DEFAULT_MAX_CONCURRENT_DOWNLOADS: u32 = 4;

/// Format of the ad slot being filled.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdFormat {
    /// Display banner (HTML).
    #[default]
    Banner,
    /// Video ad.
    Video,
    /// Native ad assembled from individual assets.
    Native,
}

/// Size of an ad slot in points.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AdSize {
    /// Width in points.
    pub width: u32,
    /// Height in points.
    pub height: u32,
}

impl AdSize {
    /// Create a size.
    #[must_use]
    pub const fn new(width: u32, height: u32) -> Self {
        Self { width, height }
    }
}

/// Settings describing how the ad should be sized and loaded.
///
/// Owned by the manager and immutable for the attempt. The factory only sees
/// the download limits derived from it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AdConfiguration {
    /// Format of the slot.
    pub ad_format: AdFormat,
    /// Requested slot size.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub size: Option<AdSize>,
    /// Whether the ad is shown full screen.
    pub is_interstitial: bool,
    /// Whether the ad grants a reward on completion.
    pub is_rewarded: bool,
    /// Maximum asset downloads running at once (minimum 1).
    pub max_concurrent_downloads: u32,
    /// Abort the load if creatives are not ready within this many milliseconds.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub load_timeout_ms: Option<u64>,
}

impl Default for AdConfiguration {
    fn default() -> Self {
        Self {
            ad_format: AdFormat::Banner,
            size: None,
            is_interstitial: false,
            is_rewarded: false,
            max_concurrent_downloads: DEFAULT_MAX_CONCURRENT_DOWNLOADS,
            load_timeout_ms: None,
        }
    }
}

impl AdConfiguration {
    /// Create a configuration for the given format.
    #[must_use]
    pub fn new(ad_format: AdFormat) -> Self {
        Self {
            ad_format,
            ..Default::default()
        }
    }

    /// Set the slot size.
    #[must_use]
    pub const fn with_size(mut self, size: AdSize) -> Self {
        self.size = Some(size);
        self
    }

    /// Mark the ad as interstitial.
    #[must_use]
    pub const fn with_interstitial(mut self, is_interstitial: bool) -> Self {
        self.is_interstitial = is_interstitial;
        self
    }

    /// Mark the ad as rewarded.
    #[must_use]
    pub const fn with_rewarded(mut self, is_rewarded: bool) -> Self {
        self.is_rewarded = is_rewarded;
        self
    }

    /// Set the maximum number of concurrent asset downloads.
    #[must_use]
    pub const fn with_max_concurrent_downloads(mut self, max: u32) -> Self {
        self.max_concurrent_downloads = max;
        self
    }

    /// Set the load timeout.
    #[must_use]
    pub fn with_load_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.load_timeout_ms = timeout.map(|t| u64::try_from(t.as_millis()).unwrap_or(u64::MAX));
        self
    }

    /// The load timeout, if one is configured.
    #[must_use]
    pub const fn load_timeout(&self) -> Option<Duration> {
        match self.load_timeout_ms {
            Some(ms) => Some(Duration::from_millis(ms)),
            None => None,
        }
    }

    /// Effective download concurrency (never zero).
    #[must_use]
    pub const fn effective_max_concurrent_downloads(&self) -> u32 {
        if self.max_concurrent_downloads == 0 {
            1
        } else {
            self.max_concurrent_downloads
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = AdConfiguration::default();
        assert_eq!(config.ad_format, AdFormat::Banner);
        assert_eq!(config.max_concurrent_downloads, DEFAULT_MAX_CONCURRENT_DOWNLOADS);
        assert!(config.load_timeout().is_none());
    }

    #[test]
    fn test_builder_sets_fields() {
        let config = AdConfiguration::new(AdFormat::Video)
            .with_size(AdSize::new(320, 480))
            .with_interstitial(true)
            .with_load_timeout(Some(Duration::from_secs(3)));

        assert_eq!(config.ad_format, AdFormat::Video);
        assert_eq!(config.size, Some(AdSize::new(320, 480)));
        assert!(config.is_interstitial);
        assert_eq!(config.load_timeout(), Some(Duration::from_secs(3)));
    }

    #[test]
    fn test_zero_concurrency_is_clamped() {
        let config = AdConfiguration::default().with_max_concurrent_downloads(0);
        assert_eq!(config.effective_max_concurrent_downloads(), 1);
    }

    #[test]
    fn test_partial_json_uses_defaults() {
        let config: AdConfiguration =
            serde_json::from_str(r#"{"ad_format":"native","load_timeout_ms":250}"#).unwrap();
        assert_eq!(config.ad_format, AdFormat::Native);
        assert_eq!(config.load_timeout(), Some(Duration::from_millis(250)));
        assert_eq!(config.max_concurrent_downloads, DEFAULT_MAX_CONCURRENT_DOWNLOADS);
    }
}
