pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use geo_window::{PixelBox, Polygon};
pub use image::{imageops, DynamicImage, GrayImage};
pub use indexmap::IndexMap;
pub use itertools::Itertools as _;
pub use learner_config::{Proportion, TransformConfig};
pub use log::{debug, info, warn};
pub use ndarray::{s, Array2, Array3, ArrayView2, Axis};
pub use rand::prelude::*;
pub use serde::{Deserialize, Serialize};
pub use std::{
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
pub use uri_fs::{FileSystem, UriError};
