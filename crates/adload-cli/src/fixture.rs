//! Load fixtures.
//!
//! A fixture is the JSON stand-in for what an ad server hands the loader:
//! the winning bid, the slot configuration and the creative models.

use std::path::Path;
use std::time::Duration;

use anyhow::Context;
use serde::{Deserialize, Serialize};

use adload_core::{AdConfiguration, Bid, CreativeModel};

use crate::parser::LoadArgs;

/// Input of one load attempt.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoadInput {
    /// The winning bid.
    pub bid: Bid,
    /// Slot configuration.
    #[serde(default)]
    pub ad_configuration: AdConfiguration,
    /// Creative models in bid order.
    #[serde(default)]
    pub creatives: Vec<CreativeModel>,
}

impl LoadInput {
    /// Apply command-line overrides.
    #[must_use]
    pub fn with_overrides(mut self, args: &LoadArgs) -> Self {
        if let Some(ms) = args.load_timeout_ms {
            self.ad_configuration = self
                .ad_configuration
                .with_load_timeout(Some(Duration::from_millis(ms)));
        }
        if let Some(max) = args.max_concurrent_downloads {
            self.ad_configuration = self.ad_configuration.with_max_concurrent_downloads(max);
        }
        self
    }
}

/// Read and parse a fixture file.
pub fn load_input(path: &Path) -> anyhow::Result<LoadInput> {
    let raw = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read fixture {}", path.display()))?;
    let input: LoadInput = serde_json::from_str(&raw)
        .with_context(|| format!("Failed to parse fixture {}", path.display()))?;

    tracing::debug!(
        bid = %input.bid.id,
        creatives = input.creatives.len(),
        "Loaded fixture"
    );
    Ok(input)
}

#[cfg(test)]
mod tests {
    use super::*;
    use adload_core::CreativeKind;
    use std::io::Write;
    use std::path::PathBuf;
    use tempfile::NamedTempFile;

    fn write_fixture(contents: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        file.write_all(contents.as_bytes()).unwrap();
        file
    }

    #[test]
    fn test_parses_minimal_fixture() {
        let file = write_fixture(
            r#"{
                "bid": { "id": "bid-7", "price": 0.42 },
                "creatives": [
                    { "kind": "html", "html": "<p>ad</p>" },
                    { "kind": "video", "video_url": "https://cdn.example/v.mp4" },
                    { "kind": "mraid" }
                ]
            }"#,
        );

        let input = load_input(file.path()).unwrap();

        assert_eq!(input.bid.id, "bid-7");
        assert_eq!(input.ad_configuration, AdConfiguration::default());
        let kinds: Vec<_> = input.creatives.iter().map(|c| c.kind).collect();
        assert_eq!(
            kinds,
            vec![CreativeKind::Html, CreativeKind::Video, CreativeKind::Unknown]
        );
    }

    #[test]
    fn test_missing_file_has_context() {
        let err = load_input(Path::new("/definitely/not/here.json")).unwrap_err();
        assert!(err.to_string().contains("Failed to read fixture"));
    }

    #[test]
    fn test_invalid_json_has_context() {
        let file = write_fixture("{ not json");
        let err = load_input(file.path()).unwrap_err();
        assert!(err.to_string().contains("Failed to parse fixture"));
    }

    #[test]
    fn test_overrides_apply() {
        let input = LoadInput {
            bid: Bid::new("bid-1", 1.0),
            ad_configuration: AdConfiguration::default(),
            creatives: Vec::new(),
        };
        let args = LoadArgs {
            fixture: PathBuf::from("unused.json"),
            load_timeout_ms: Some(250),
            max_concurrent_downloads: Some(2),
            max_retries: 3,
            request_timeout_secs: 30,
        };

        let input = input.with_overrides(&args);

        assert_eq!(
            input.ad_configuration.load_timeout(),
            Some(Duration::from_millis(250))
        );
        assert_eq!(input.ad_configuration.max_concurrent_downloads, 2);
    }
}
