pub use anyhow::{ensure, format_err, Context as _, Result};
pub use log::{debug, info};
pub use std::{
    fmt::Debug,
    fs,
    path::{Path, PathBuf},
    sync::Arc,
};
