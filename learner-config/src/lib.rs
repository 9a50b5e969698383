//! Declarative configuration of geospatial learners.
//!
//! A [LearnerConfig] is loaded from a JSON5 file, upgraded if it was written
//! by an older version, updated once to apply mode overrides and derived
//! values, validated, and finally consumed by the dataset and model builders.

#[macro_use]
mod error;

mod common;

pub mod backbone;
pub mod color;
pub mod data;
pub mod external;
pub mod geo;
pub mod learner;
pub mod model;
pub mod plot;
pub mod proportion;
pub mod scene;
pub mod solver;
pub mod transform;
pub mod upgrade;
pub mod window;

pub use backbone::*;
pub use color::Color;
pub use data::*;
pub use error::*;
pub use external::*;
pub use geo::*;
pub use learner::*;
pub use model::*;
pub use plot::*;
pub use proportion::*;
pub use scene::*;
pub use solver::*;
pub use transform::*;
pub use upgrade::CONFIG_VERSION;
pub use window::*;
