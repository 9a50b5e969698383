pub use anyhow::{ensure, Result};
pub use itertools::Itertools as _;
pub use serde::{Deserialize, Deserializer, Serialize, Serializer};
pub use std::{cmp, fmt, iter};
