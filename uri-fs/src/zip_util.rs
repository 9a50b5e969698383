use crate::{common::*, UriError};
use zip::ZipArchive;

/// Whether the URI names a zip archive.
pub fn is_zip_uri(uri: &str) -> bool {
    uri.ends_with(".zip")
}

/// Extract a local zip archive into `target_dir`, creating it if needed.
pub fn unzip(zip_path: &Path, target_dir: &Path) -> Result<()> {
    ensure!(
        zip_path.is_file(),
        UriError::NotFound(zip_path.display().to_string())
    );
    info!(
        "unzipping {} to {}",
        zip_path.display(),
        target_dir.display()
    );

    fs::create_dir_all(target_dir)?;
    let file = fs::File::open(zip_path)?;
    let mut archive = ZipArchive::new(file)
        .with_context(|| format!("'{}' is not a valid zip archive", zip_path.display()))?;
    archive
        .extract(target_dir)
        .with_context(|| format!("failed to extract '{}'", zip_path.display()))?;
    Ok(())
}
