pub use crate::error::{ConfigError, ConfigResult};
pub use anyhow::{bail, ensure, format_err, Context as _, Error, Result};
pub use derivative::Derivative;
pub use indexmap::IndexMap;
pub use log::{info, warn};
pub use noisy_float::prelude::*;
pub use once_cell::sync::Lazy;
pub use rand::prelude::*;
pub use regex::Regex;
pub use serde::{
    de::Error as _, ser::Error as _, Deserialize, Deserializer, Serialize, Serializer,
};
pub use serde_json::{Map, Value};
pub use std::{
    collections::{HashMap, HashSet},
    fmt,
    fmt::Debug,
    fs,
    num::NonZeroUsize,
    path::{Path, PathBuf},
    str::FromStr,
};
pub use strum::{AsRefStr, Display, EnumIter, EnumString, IntoEnumIterator as _, IntoStaticStr};
pub use uri_fs::{FileSystem, UriError};
