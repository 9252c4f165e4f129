pub mod region;

pub use region::{adjust, resize, NormalizedRect, PixelRect, Rect, Region, RegionLimits, Size};
