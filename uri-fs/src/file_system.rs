use crate::{common::*, LocalFileSystem, UriError};

/// The storage primitives used by dataset and module resolution.
pub trait FileSystem
where
    Self: Debug + Send + Sync,
{
    /// Whether this backend serves the URI.
    fn matches_uri(&self, uri: &str) -> bool;

    /// Whether the URI exists. Directories count only if `include_dir` is set.
    fn file_exists(&self, uri: &str, include_dir: bool) -> Result<bool>;

    /// List the immediate children of a directory URI, optionally keeping
    /// only names ending with `.{ext}`. Children are returned as full URIs in
    /// lexicographic order.
    fn list_paths(&self, uri: &str, ext: Option<&str>) -> Result<Vec<String>>;

    /// The local path a URI maps to when materialized under `download_dir`.
    fn local_path(&self, uri: &str, download_dir: &Path) -> Result<PathBuf>;

    /// Make the file available locally and return its path.
    fn download_if_needed(&self, uri: &str, download_dir: &Path) -> Result<PathBuf>;

    /// Copy a directory URI recursively into a local directory.
    fn sync_from_dir(&self, src_uri: &str, dst_dir: &Path) -> Result<()>;

    /// Write a local file to the destination URI unless they are the same.
    fn upload_if_needed(&self, src_path: &Path, dst_uri: &str) -> Result<()>;
}

/// Join a child name to a URI with a single separator.
pub fn join_uri(base: &str, child: &str) -> String {
    if base.is_empty() {
        return child.to_owned();
    }
    format!(
        "{}/{}",
        base.trim_end_matches('/'),
        child.trim_start_matches('/')
    )
}

/// The last path component of a URI.
pub fn uri_basename(uri: &str) -> &str {
    uri.trim_end_matches('/')
        .rsplit('/')
        .next()
        .unwrap_or(uri)
}

/// The scheme of a URI, if it has one.
pub fn uri_scheme(uri: &str) -> Option<&str> {
    let (scheme, _) = uri.split_once("://")?;
    (!scheme.is_empty()).then(|| scheme)
}

/// A set of backends; each call goes to the first backend serving the URI.
#[derive(Debug, Clone)]
pub struct FileSystems {
    backends: Vec<Arc<dyn FileSystem>>,
}

impl FileSystems {
    pub fn new() -> Self {
        Self { backends: vec![] }
    }

    pub fn with_backend(mut self, backend: Arc<dyn FileSystem>) -> Self {
        self.backends.push(backend);
        self
    }

    pub fn register(&mut self, backend: Arc<dyn FileSystem>) {
        self.backends.push(backend);
    }

    pub fn backend_for(&self, uri: &str) -> Result<&dyn FileSystem> {
        self.backends
            .iter()
            .find(|backend| backend.matches_uri(uri))
            .map(|backend| backend.as_ref())
            .ok_or_else(|| UriError::UnsupportedScheme(uri.to_owned()).into())
    }
}

impl Default for FileSystems {
    fn default() -> Self {
        Self::new().with_backend(Arc::new(LocalFileSystem))
    }
}

impl FileSystem for FileSystems {
    fn matches_uri(&self, uri: &str) -> bool {
        self.backends.iter().any(|backend| backend.matches_uri(uri))
    }

    fn file_exists(&self, uri: &str, include_dir: bool) -> Result<bool> {
        self.backend_for(uri)?.file_exists(uri, include_dir)
    }

    fn list_paths(&self, uri: &str, ext: Option<&str>) -> Result<Vec<String>> {
        self.backend_for(uri)?.list_paths(uri, ext)
    }

    fn local_path(&self, uri: &str, download_dir: &Path) -> Result<PathBuf> {
        self.backend_for(uri)?.local_path(uri, download_dir)
    }

    fn download_if_needed(&self, uri: &str, download_dir: &Path) -> Result<PathBuf> {
        self.backend_for(uri)?.download_if_needed(uri, download_dir)
    }

    fn sync_from_dir(&self, src_uri: &str, dst_dir: &Path) -> Result<()> {
        self.backend_for(src_uri)?.sync_from_dir(src_uri, dst_dir)
    }

    fn upload_if_needed(&self, src_path: &Path, dst_uri: &str) -> Result<()> {
        self.backend_for(dst_uri)?.upload_if_needed(src_path, dst_uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uri_helpers() {
        assert_eq!(join_uri("s3://bucket/dir/", "/a.zip"), "s3://bucket/dir/a.zip");
        assert_eq!(join_uri("", "a"), "a");
        assert_eq!(uri_basename("s3://bucket/dir/model.zip"), "model.zip");
        assert_eq!(uri_basename("/tmp/dir/"), "dir");
        assert_eq!(uri_scheme("s3://bucket"), Some("s3"));
        assert_eq!(uri_scheme("/tmp/a"), None);
    }

    #[test]
    fn unknown_scheme_is_rejected() {
        let fs = FileSystems::default();
        let err = fs.file_exists("s3://bucket/key", true).unwrap_err();
        assert_eq!(
            err.downcast_ref::<UriError>(),
            Some(&UriError::UnsupportedScheme("s3://bucket/key".into()))
        );
    }
}
