//! Storage access for local and remote URIs.
//!
//! Dataset and module sources are addressed by URI strings. The
//! [FileSystem] trait abstracts the handful of primitives the learner needs:
//! existence checks, child listing, local materialization, directory sync and
//! upload. [LocalFileSystem] serves plain paths and `file://` URIs, and
//! [FileSystems] dispatches to registered backends by URI.

mod common;
pub mod error;
pub mod file_system;
pub mod local;
pub mod zip_util;

pub use error::*;
pub use file_system::*;
pub use local::*;
pub use zip_util::*;
