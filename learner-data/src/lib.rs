//! Dataset assembly for geospatial learners.
//!
//! Datasets are random-access collections of [DataRecord]s. Image datasets
//! are read from directories of class-named chip folders, resolved from
//! URIs of directories and zip archives. Geo datasets are windows read from
//! scenes, either by sliding over the extent or by random sampling
//! constrained to the areas of interest.

mod common;

pub mod data_dirs;
pub mod dataset;
pub mod geo_builder;
pub mod image_builder;
pub mod image_dir;
pub mod scene;
pub mod subset;
pub mod transform;
pub mod window_dataset;

pub use data_dirs::*;
pub use dataset::*;
pub use geo_builder::*;
pub use image_builder::*;
pub use image_dir::*;
pub use scene::*;
pub use subset::*;
pub use transform::*;
pub use window_dataset::*;
