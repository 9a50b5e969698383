//! Task strategies that turn scenes into training windows and labels.

mod common;

pub mod classification;
pub mod debug_image;
pub mod task;

#[cfg(feature = "tch")]
pub use tch_backbone::*;
#[cfg(feature = "tch")]
mod tch_backbone;

pub use classification::*;
pub use debug_image::*;
pub use task::*;
