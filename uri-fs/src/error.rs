use thiserror::Error;

/// Failures at the point a URI is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum UriError {
    #[error("no such file or directory: '{0}'")]
    NotFound(String),
    #[error("'{uri}' is expected to be a {expected}")]
    InvalidExtension { uri: String, expected: String },
    #[error("no file system is registered for '{0}'")]
    UnsupportedScheme(String),
}
