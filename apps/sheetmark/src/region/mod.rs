//! Geometry and region store
//!
//! Normalized rectangles, region identity, and the per-page collections of
//! real regions that the resolver and the engine build on.

mod geometry;
mod store;

pub use geometry::{CanvasSize, NormRect, PixelRect, Region, RegionId};
pub use store::{clamp_group_delta, RegionStore};
