//! Data model: tracks, transforms, viewport.

pub mod track;
pub mod transform;
pub mod viewport;

pub use track::{Track, TrackInfo, TrackStatus};
pub use transform::{TransformCache, TransformParams, build_transform};
pub use viewport::Viewport;
