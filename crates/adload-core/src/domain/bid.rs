//! Winning bid value.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::AdSize;

/// Targeting keys that mark a bid as the auction winner.
const WINNING_KEYS: [&str; 3] = ["hb_pb", "hb_bidder", "hb_cache_id"];

/// The winning auction response driving one load attempt.
///
/// The load pipeline treats this as opaque: it is held by the manager for the
/// lifetime of the attempt and exposed read-only to callers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bid {
    /// Bid identifier assigned by the bidder.
    pub id: String,
    /// Clearing price.
    #[serde(default)]
    pub price: f64,
    /// Ad markup returned with the bid.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub adm: Option<String>,
    /// Win notification URL.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub nurl: Option<String>,
    /// Creative width in points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub width: Option<u32>,
    /// Creative height in points.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub height: Option<u32>,
    /// Targeting keywords attached by the ad server.
    #[serde(default)]
    pub targeting: HashMap<String, String>,
}

impl Bid {
    /// Create a bid with the required fields.
    pub fn new(id: impl Into<String>, price: f64) -> Self {
        Self {
            id: id.into(),
            price,
            adm: None,
            nurl: None,
            width: None,
            height: None,
            targeting: HashMap::new(),
        }
    }

    /// Set the ad markup.
    #[must_use]
    pub fn with_adm(mut self, adm: impl Into<String>) -> Self {
        self.adm = Some(adm.into());
        self
    }

    /// Set the creative size.
    #[must_use]
    pub const fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = Some(width);
        self.height = Some(height);
        self
    }

    /// Add a targeting keyword.
    #[must_use]
    pub fn with_targeting(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.targeting.insert(key.into(), value.into());
        self
    }

    /// The creative size, when both dimensions are known.
    #[must_use]
    pub const fn size(&self) -> Option<AdSize> {
        match (self.width, self.height) {
            (Some(width), Some(height)) => Some(AdSize::new(width, height)),
            _ => None,
        }
    }

    /// Cache identifier of the creative on the prebid cache, if any.
    pub fn cache_id(&self) -> Option<&str> {
        self.targeting.get("hb_cache_id").map(String::as_str)
    }

    /// Whether the targeting keywords mark this bid as the auction winner.
    pub fn is_winning(&self) -> bool {
        WINNING_KEYS
            .iter()
            .all(|key| self.targeting.get(*key).is_some_and(|v| !v.is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_winning_requires_all_targeting_keys() {
        let bid = Bid::new("bid-1", 0.5)
            .with_targeting("hb_pb", "0.50")
            .with_targeting("hb_bidder", "appnexus");
        assert!(!bid.is_winning());

        let bid = bid.with_targeting("hb_cache_id", "c-42");
        assert!(bid.is_winning());
        assert_eq!(bid.cache_id(), Some("c-42"));
    }

    #[test]
    fn test_size_needs_both_dimensions() {
        assert_eq!(Bid::new("b", 1.0).size(), None);
        assert_eq!(
            Bid::new("b", 1.0).with_size(320, 50).size(),
            Some(AdSize::new(320, 50))
        );
    }

    #[test]
    fn test_deserializes_with_defaults() {
        let bid: Bid = serde_json::from_str(r#"{"id":"abc"}"#).unwrap();
        assert_eq!(bid.id, "abc");
        assert!(bid.targeting.is_empty());
        assert!(bid.adm.is_none());
    }
}
