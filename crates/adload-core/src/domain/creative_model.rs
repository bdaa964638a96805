//! Creative model: one candidate creative extracted from a bid.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Kind of creative a model describes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CreativeKind {
    /// HTML markup rendered in a web view. Assets are fetched lazily.
    Html,
    /// Video file downloaded before display.
    Video,
    /// Native ad assembled from individual assets.
    Native,
    /// Anything the upstream parser did not recognise.
    #[serde(other)]
    Unknown,
}

impl CreativeKind {
    /// Stable lowercase name.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Html => "html",
            Self::Video => "video",
            Self::Native => "native",
            Self::Unknown => "unknown",
        }
    }
}

impl fmt::Display for CreativeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Tracking events a creative can report.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackingEvent {
    /// Creative finished loading.
    Loaded,
    /// Creative became viewable.
    Impression,
    /// User clicked the creative.
    Click,
    /// User clicked a companion ad.
    CompanionClick,
    /// Video played to the end.
    Complete,
}

/// One asset of a native creative.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NativeAsset {
    /// Asset identifier from the native request.
    pub id: u32,
    /// Where the asset is fetched from.
    pub url: String,
    /// Required assets are downloaded before the creative is handed out;
    /// optional ones are left to the download-hook.
    #[serde(default)]
    pub required: bool,
}

impl NativeAsset {
    /// Create a native asset.
    pub fn new(id: u32, url: impl Into<String>, required: bool) -> Self {
        Self {
            id,
            url: url.into(),
            required,
        }
    }
}

/// Immutable description of one renderable ad variant.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CreativeModel {
    /// What kind of creative to build.
    pub kind: CreativeKind,
    /// HTML markup (HTML creatives).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub html: Option<String>,
    /// Media file location (video creatives).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub video_url: Option<String>,
    /// Assets of a native creative.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub native_assets: Vec<NativeAsset>,
    /// Width in points.
    #[serde(default)]
    pub width: u32,
    /// Height in points.
    #[serde(default)]
    pub height: u32,
    /// How long the creative stays on screen, if limited.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_duration_secs: Option<u32>,
    /// Whether this is the companion (end card) of a video.
    #[serde(default)]
    pub is_companion_ad: bool,
    /// Landing page opened on click.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub click_through_url: Option<String>,
    /// Tracking URLs keyed by event.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub tracking_urls: HashMap<TrackingEvent, Vec<String>>,
}

impl CreativeModel {
    fn empty(kind: CreativeKind) -> Self {
        Self {
            kind,
            html: None,
            video_url: None,
            native_assets: Vec::new(),
            width: 0,
            height: 0,
            display_duration_secs: None,
            is_companion_ad: false,
            click_through_url: None,
            tracking_urls: HashMap::new(),
        }
    }

    /// Create an HTML creative model.
    pub fn html(markup: impl Into<String>) -> Self {
        Self {
            html: Some(markup.into()),
            ..Self::empty(CreativeKind::Html)
        }
    }

    /// Create a video creative model.
    pub fn video(video_url: impl Into<String>) -> Self {
        Self {
            video_url: Some(video_url.into()),
            ..Self::empty(CreativeKind::Video)
        }
    }

    /// Create a native creative model.
    #[must_use]
    pub fn native(assets: Vec<NativeAsset>) -> Self {
        Self {
            native_assets: assets,
            ..Self::empty(CreativeKind::Native)
        }
    }

    /// Create a model of a kind the factory does not understand.
    #[must_use]
    pub fn unknown() -> Self {
        Self::empty(CreativeKind::Unknown)
    }

    /// Set the creative size.
    #[must_use]
    pub const fn with_size(mut self, width: u32, height: u32) -> Self {
        self.width = width;
        self.height = height;
        self
    }

    /// Set the click-through URL.
    #[must_use]
    pub fn with_click_through(mut self, url: impl Into<String>) -> Self {
        self.click_through_url = Some(url.into());
        self
    }

    /// Add a tracking URL for an event.
    #[must_use]
    pub fn with_tracking(mut self, event: TrackingEvent, url: impl Into<String>) -> Self {
        self.tracking_urls.entry(event).or_default().push(url.into());
        self
    }

    /// Tracking URLs registered for an event.
    pub fn tracking(&self, event: TrackingEvent) -> &[String] {
        self.tracking_urls.get(&event).map_or(&[], Vec::as_slice)
    }

    /// URLs that must be downloaded before the creative can be handed out.
    pub fn eager_asset_urls(&self) -> Vec<&str> {
        match self.kind {
            CreativeKind::Video => self.video_url.as_deref().into_iter().collect(),
            CreativeKind::Native => self
                .native_assets
                .iter()
                .filter(|asset| asset.required)
                .map(|asset| asset.url.as_str())
                .collect(),
            CreativeKind::Html | CreativeKind::Unknown => Vec::new(),
        }
    }

    /// Assets left to the download-hook.
    pub fn deferred_assets(&self) -> impl Iterator<Item = &NativeAsset> {
        self.native_assets.iter().filter(|asset| !asset.required)
    }

    /// Check that the model carries what its kind needs.
    ///
    /// `Unknown` models pass: rejecting them is the factory's call.
    pub fn validate(&self) -> Result<(), String> {
        match self.kind {
            CreativeKind::Html => match self.html.as_deref() {
                None => Err("HTML creative has no markup".to_string()),
                Some(markup) if markup.trim().is_empty() => {
                    Err("HTML creative markup is blank".to_string())
                }
                Some(markup) if looks_like_vast(markup) => {
                    Err("HTML creative contains a VAST document".to_string())
                }
                Some(_) => Ok(()),
            },
            CreativeKind::Video => match self.video_url.as_deref() {
                Some(url) if !url.trim().is_empty() => Ok(()),
                _ => Err("video creative has no media URL".to_string()),
            },
            CreativeKind::Native => {
                if self.native_assets.is_empty() {
                    Err("native creative has no assets".to_string())
                } else {
                    Ok(())
                }
            }
            CreativeKind::Unknown => Ok(()),
        }
    }
}

/// Whether markup is a VAST XML document rather than HTML.
fn looks_like_vast(markup: &str) -> bool {
    let head = markup.trim_start();
    let head = head
        .strip_prefix("<?xml")
        .and_then(|rest| rest.find("?>").map(|end| rest[end + 2..].trim_start()))
        .unwrap_or(head);
    head.get(..5)
        .is_some_and(|tag| tag.eq_ignore_ascii_case("<vast"))
}
