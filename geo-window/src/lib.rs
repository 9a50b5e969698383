//! Pixel-space windows and area-of-interest geometry for raster scenes.

mod common;

pub mod pixel_box;
pub use pixel_box::*;

pub mod polygon;
pub use polygon::*;
