use crate::{common::*, FileSystem, UriError};
use glob::Pattern;

/// Plain local paths and `file://` URIs.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    fn to_path(uri: &str) -> PathBuf {
        PathBuf::from(uri.strip_prefix("file://").unwrap_or(uri))
    }
}

impl FileSystem for LocalFileSystem {
    fn matches_uri(&self, uri: &str) -> bool {
        uri.starts_with("file://") || !uri.contains("://")
    }

    fn file_exists(&self, uri: &str, include_dir: bool) -> Result<bool> {
        let path = Self::to_path(uri);
        let exists = if include_dir {
            path.exists()
        } else {
            path.is_file()
        };
        Ok(exists)
    }

    fn list_paths(&self, uri: &str, ext: Option<&str>) -> Result<Vec<String>> {
        let dir = Self::to_path(uri);
        if !dir.is_dir() {
            return Err(UriError::NotFound(uri.to_owned()).into());
        }

        let pattern = match ext {
            Some(ext) => format!("*.{}", Pattern::escape(ext.trim_start_matches('.'))),
            None => "*".to_owned(),
        };
        let pattern = format!("{}/{}", Pattern::escape(&dir.to_string_lossy()), pattern);
        let paths = glob::glob(&pattern)
            .with_context(|| format!("invalid glob pattern '{}'", pattern))?
            .map(|path| -> Result<_> { Ok(path?.to_string_lossy().into_owned()) })
            .collect::<Result<_>>()?;
        Ok(paths)
    }

    fn local_path(&self, uri: &str, _download_dir: &Path) -> Result<PathBuf> {
        Ok(Self::to_path(uri))
    }

    fn download_if_needed(&self, uri: &str, _download_dir: &Path) -> Result<PathBuf> {
        let path = Self::to_path(uri);
        if !path.exists() {
            return Err(UriError::NotFound(uri.to_owned()).into());
        }
        Ok(path)
    }

    fn sync_from_dir(&self, src_uri: &str, dst_dir: &Path) -> Result<()> {
        let src_dir = Self::to_path(src_uri);
        if !src_dir.is_dir() {
            return Err(UriError::NotFound(src_uri.to_owned()).into());
        }
        if src_dir == dst_dir {
            return Ok(());
        }
        debug!("sync {} to {}", src_dir.display(), dst_dir.display());
        copy_dir_recursive(&src_dir, dst_dir)
    }

    fn upload_if_needed(&self, src_path: &Path, dst_uri: &str) -> Result<()> {
        let dst_path = Self::to_path(dst_uri);
        if src_path == dst_path {
            return Ok(());
        }
        if let Some(parent) = dst_path.parent() {
            fs::create_dir_all(parent)?;
        }
        fs::copy(src_path, &dst_path).with_context(|| {
            format!(
                "unable to copy '{}' to '{}'",
                src_path.display(),
                dst_path.display()
            )
        })?;
        Ok(())
    }
}

fn copy_dir_recursive(src: &Path, dst: &Path) -> Result<()> {
    fs::create_dir_all(dst)?;
    for entry in fs::read_dir(src)? {
        let entry = entry?;
        let src_path = entry.path();
        let dst_path = dst.join(entry.file_name());
        if entry.file_type()?.is_dir() {
            copy_dir_recursive(&src_path, &dst_path)?;
        } else {
            fs::copy(&src_path, &dst_path)?;
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_paths_filters_extension() -> Result<()> {
        let dir = tempfile::tempdir()?;
        fs::write(dir.path().join("b.zip"), b"")?;
        fs::write(dir.path().join("a.zip"), b"")?;
        fs::write(dir.path().join("c.txt"), b"")?;
        fs::create_dir(dir.path().join("train"))?;

        let uri = dir.path().to_string_lossy().into_owned();
        let fs = LocalFileSystem;

        let zips = fs.list_paths(&uri, Some("zip"))?;
        let names: Vec<_> = zips.iter().map(|path| crate::uri_basename(path)).collect();
        assert_eq!(names, ["a.zip", "b.zip"]);
        assert_eq!(fs.list_paths(&uri, None)?.len(), 4);

        assert!(fs.file_exists(&format!("{}/train", uri), true)?);
        assert!(!fs.file_exists(&format!("{}/train", uri), false)?);
        assert!(fs.file_exists(&format!("file://{}/a.zip", uri), false)?);
        Ok(())
    }

    #[test]
    fn list_paths_escapes_directory_name() -> Result<()> {
        let root = tempfile::tempdir()?;
        let dir = root.path().join("scenes[*]");
        fs::create_dir(&dir)?;
        fs::write(dir.join("x.json"), b"{}")?;
        fs::write(dir.join("y.geojson"), b"{}")?;
        fs::write(root.path().join("z.json"), b"{}")?;

        let uri = dir.to_string_lossy().into_owned();
        let paths = LocalFileSystem.list_paths(&uri, Some(".json"))?;
        assert_eq!(paths, [dir.join("x.json").to_string_lossy().into_owned()]);
        Ok(())
    }

    #[test]
    fn sync_copies_tree() -> Result<()> {
        let src = tempfile::tempdir()?;
        let dst = tempfile::tempdir()?;
        fs::create_dir_all(src.path().join("train/cat"))?;
        fs::write(src.path().join("train/cat/0.png"), b"png")?;

        LocalFileSystem.sync_from_dir(&src.path().to_string_lossy(), &dst.path().join("copy"))?;
        assert!(dst.path().join("copy/train/cat/0.png").is_file());
        Ok(())
    }
}
