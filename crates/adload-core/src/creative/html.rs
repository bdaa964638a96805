//! HTML creative.

use crate::domain::CreativeModel;

/// An HTML creative: markup rendered in a web view.
///
/// Assets referenced by the markup are not downloaded at construction time;
/// the renderer pulls them through the creative's download-hook.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HtmlCreative {
    markup: String,
}

impl HtmlCreative {
    /// Build from a model, rejecting missing, blank or VAST markup.
    pub fn from_model(model: &CreativeModel) -> Result<Self, String> {
        model.validate()?;
        let markup = model
            .html
            .clone()
            .ok_or_else(|| "HTML creative has no markup".to_string())?;
        Ok(Self { markup })
    }

    /// The markup as received.
    pub fn markup(&self) -> &str {
        &self.markup
    }

    /// The markup as a complete document.
    ///
    /// Fragments are wrapped in `<html><body>…</body></html>`; full documents
    /// are returned unchanged.
    pub fn sanitized_markup(&self) -> String {
        let trimmed = self.markup.trim();
        let lower = trimmed.to_ascii_lowercase();
        if lower.starts_with("<html") || lower.starts_with("<!doctype html") {
            trimmed.to_string()
        } else {
            format!("<html><body>{trimmed}</body></html>")
        }
    }
}
