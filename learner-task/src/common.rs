pub use anyhow::{bail, ensure, format_err, Context as _, Result};
pub use geo_window::PixelBox;
pub use image::{Rgb, RgbImage};
pub use learner_config::ClassConfig;
pub use learner_data::{ClassificationLabels, Scene};
pub use log::{info, warn};
pub use ndarray::{Array3, Axis};
pub use serde::{Deserialize, Serialize};
pub use std::{
    fmt::Debug,
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    sync::Arc,
};
pub use uri_fs::FileSystem;
