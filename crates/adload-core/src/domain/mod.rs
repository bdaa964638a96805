//! Domain values for a load attempt.
//!
//! Pure data with no I/O: everything here is immutable once received and is
//! shared freely between the manager, the factory and the creatives.

mod ad_configuration;
mod bid;
mod creative_model;

pub use ad_configuration::{AdConfiguration, AdFormat, AdSize, DEFAULT_MAX_CONCURRENT_DOWNLOADS};
pub use bid::Bid;
pub use creative_model::{CreativeKind, CreativeModel, NativeAsset, TrackingEvent};
