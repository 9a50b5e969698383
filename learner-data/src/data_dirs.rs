//! Resolution of dataset URIs to local data directories.
//!
//! A data directory contains `train`, `valid` and optionally `test`
//! sub-directories.

use crate::common::*;
use learner_config::UriSpec;
use uri_fs::{is_zip_uri, unzip, uri_basename};
use uuid::Uuid;

/// Resolve the URI to local data directories, unzipping archives under
/// `unzip_dir` as needed.
///
/// The URI is one of
///
/// 1. a data directory, synced to local storage if it is remote,
/// 2. a zip file of (1),
/// 3. a list of (2),
/// 4. a directory of zip files of (1).
pub fn get_data_dirs(
    uri: &UriSpec,
    unzip_dir: &Path,
    file_system: &dyn FileSystem,
) -> Result<Vec<PathBuf>> {
    let zip_uris: Vec<String> = match uri {
        UriSpec::Many(uris) => {
            if let Some(uri) = uris.iter().find(|uri| !is_zip_uri(uri)) {
                return Err(UriError::InvalidExtension {
                    uri: uri.clone(),
                    expected: "zip file, as every item of a URI list must be".into(),
                }
                .into());
            }
            uris.clone()
        }
        UriSpec::One(uri) => {
            if file_system.file_exists(uri, false)? {
                if !is_zip_uri(uri) {
                    return Err(UriError::InvalidExtension {
                        uri: uri.clone(),
                        expected: "directory or a zip file".into(),
                    }
                    .into());
                }
                vec![uri.clone()]
            } else if file_system.file_exists(uri, true)? {
                if is_data_dir(uri, file_system)? {
                    let local_path = file_system.local_path(uri, unzip_dir)?;
                    if Path::new(uri) != local_path {
                        file_system.sync_from_dir(uri, &local_path)?;
                    }
                    return Ok(vec![local_path]);
                }
                file_system.list_paths(uri, Some("zip"))?
            } else {
                return Err(UriError::NotFound(uri.clone()).into());
            }
        }
    };

    unzip_data(&zip_uris, unzip_dir, file_system)
}

fn is_data_dir(uri: &str, file_system: &dyn FileSystem) -> Result<bool> {
    if !file_system.file_exists(uri, true)? {
        return Ok(false);
    }
    let paths = file_system.list_paths(uri, None)?;
    let has_child = |name: &str| paths.iter().any(|path| uri_basename(path) == name);
    Ok(has_child("train") && has_child("valid"))
}

/// Extract each zip into its own directory, in order.
///
/// Archives go to `<unzip_dir>/data/<uuid>/<index>` so that repeated builds
/// never mix their contents.
pub fn unzip_data(
    zip_uris: &[String],
    unzip_dir: &Path,
    file_system: &dyn FileSystem,
) -> Result<Vec<PathBuf>> {
    let unzip_dir = unzip_dir.join("data").join(Uuid::new_v4().to_string());
    zip_uris
        .iter()
        .enumerate()
        .map(|(index, zip_uri)| -> Result<_> {
            let zip_path = file_system.download_if_needed(zip_uri, &unzip_dir)?;
            let data_dir = unzip_dir.join(index.to_string());
            unzip(&zip_path, &data_dir)?;
            Ok(data_dir)
        })
        .collect()
}

/// The split sub-directories that exist under the data directories.
pub fn split_dirs(data_dirs: &[PathBuf], split: &str) -> Vec<PathBuf> {
    data_dirs
        .iter()
        .filter(|dir| dir.is_dir())
        .map(|dir| dir.join(split))
        .filter(|dir| dir.is_dir())
        .collect()
}
