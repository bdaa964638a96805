//! Materialized creatives.
//!
//! An `AbstractCreative` is what the factory hands to the caller: the model
//! it was built from, the assets downloaded for it, and optionally a
//! download-hook for assets fetched later by the renderer.
//!
//! A creative references its model and transaction id only. It never points
//! back at the manager or factory that built it, so it can outlive both.

mod hook;
mod html;

use std::sync::Arc;

use bytes::Bytes;

use crate::domain::{CreativeKind, CreativeModel, NativeAsset};
use crate::transaction::TransactionId;

pub use hook::DownloadHook;
pub use html::HtmlCreative;

/// A downloaded asset.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedAsset {
    /// Where it came from.
    pub url: String,
    /// Body bytes.
    pub data: Bytes,
}

impl ResolvedAsset {
    /// Create a resolved asset.
    pub fn new(url: impl Into<String>, data: Bytes) -> Self {
        Self {
            url: url.into(),
            data,
        }
    }
}

/// A video creative with its media file in memory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoCreative {
    media: ResolvedAsset,
}

impl VideoCreative {
    /// Create from the downloaded media file.
    #[must_use]
    pub const fn new(media: ResolvedAsset) -> Self {
        Self { media }
    }

    /// The media file.
    pub const fn media(&self) -> &ResolvedAsset {
        &self.media
    }
}

/// A native creative: required assets downloaded, optional ones deferred.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NativeCreative {
    assets: Vec<(u32, ResolvedAsset)>,
    deferred: Vec<NativeAsset>,
}

impl NativeCreative {
    /// Create from downloaded `(asset id, asset)` pairs and deferred assets.
    #[must_use]
    pub const fn new(assets: Vec<(u32, ResolvedAsset)>, deferred: Vec<NativeAsset>) -> Self {
        Self { assets, deferred }
    }

    /// Downloaded asset by native asset id.
    pub fn asset(&self, id: u32) -> Option<&ResolvedAsset> {
        self.assets
            .iter()
            .find(|(asset_id, _)| *asset_id == id)
            .map(|(_, asset)| asset)
    }

    /// Assets the renderer fetches through the download-hook.
    pub fn deferred(&self) -> &[NativeAsset] {
        &self.deferred
    }
}

/// Kind-specific part of a creative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CreativeBody {
    /// HTML markup.
    Html(HtmlCreative),
    /// Video with media file.
    Video(VideoCreative),
    /// Native assets.
    Native(NativeCreative),
}

/// A constructed, loadable creative.
#[derive(Debug)]
pub struct AbstractCreative {
    model: Arc<CreativeModel>,
    transaction_id: TransactionId,
    body: CreativeBody,
    download_hook: Option<DownloadHook>,
}

impl AbstractCreative {
    /// Create a creative for `model` built under `transaction_id`.
    #[must_use]
    pub const fn new(
        model: Arc<CreativeModel>,
        transaction_id: TransactionId,
        body: CreativeBody,
    ) -> Self {
        Self {
            model,
            transaction_id,
            body,
            download_hook: None,
        }
    }

    /// The model this creative was built from.
    pub fn model(&self) -> &CreativeModel {
        &self.model
    }

    /// Kind of the creative.
    pub fn kind(&self) -> CreativeKind {
        self.model.kind
    }

    /// Transaction the creative was built under.
    pub const fn transaction_id(&self) -> TransactionId {
        self.transaction_id
    }

    /// Kind-specific body.
    pub const fn body(&self) -> &CreativeBody {
        &self.body
    }

    /// All assets downloaded at construction time.
    pub fn assets(&self) -> Vec<&ResolvedAsset> {
        match &self.body {
            CreativeBody::Html(_) => Vec::new(),
            CreativeBody::Video(video) => vec![video.media()],
            CreativeBody::Native(native) => native.assets.iter().map(|(_, asset)| asset).collect(),
        }
    }

    /// Downloaded asset by URL.
    pub fn asset(&self, url: &str) -> Option<&ResolvedAsset> {
        self.assets().into_iter().find(|asset| asset.url == url)
    }

    /// HTML body, if this is an HTML creative.
    pub const fn as_html(&self) -> Option<&HtmlCreative> {
        match &self.body {
            CreativeBody::Html(html) => Some(html),
            _ => None,
        }
    }

    /// Video body, if this is a video creative.
    pub const fn as_video(&self) -> Option<&VideoCreative> {
        match &self.body {
            CreativeBody::Video(video) => Some(video),
            _ => None,
        }
    }

    /// Native body, if this is a native creative.
    pub const fn as_native(&self) -> Option<&NativeCreative> {
        match &self.body {
            CreativeBody::Native(native) => Some(native),
            _ => None,
        }
    }

    /// The installed download-hook.
    pub const fn download_hook(&self) -> Option<&DownloadHook> {
        self.download_hook.as_ref()
    }

    /// Install or clear the download-hook.
    pub fn set_download_hook(&mut self, hook: Option<DownloadHook>) {
        self.download_hook = hook;
    }

    /// Remove and return the download-hook.
    pub fn take_download_hook(&mut self) -> Option<DownloadHook> {
        self.download_hook.take()
    }
}
