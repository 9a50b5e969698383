//! Chip datasets stored as one sub-directory of images per class.

use crate::{
    common::*,
    dataset::{with_transform, BoxedDataset, DataRecord, RandomAccessDataset},
};
use glob::{glob_with, MatchOptions, Pattern};

const IMAGE_EXTENSIONS: &[&str] = &["png", "jpg", "jpeg", "tif", "tiff", "bmp"];

/// Builds the dataset of one split directory, such as `<data_dir>/train`.
pub trait DirToDataset
where
    Self: Debug + Send + Sync,
{
    fn dir_to_dataset(
        &self,
        data_dir: &Path,
        transform: Option<&TransformConfig>,
    ) -> Result<BoxedDataset>;
}

/// Reads [ImageDirDataset]s labeled by the class names.
#[derive(Debug, Clone)]
pub struct ImageDirToDataset {
    pub class_names: Vec<String>,
}

impl ImageDirToDataset {
    pub fn new(class_names: Vec<String>) -> Self {
        Self { class_names }
    }
}

impl DirToDataset for ImageDirToDataset {
    fn dir_to_dataset(
        &self,
        data_dir: &Path,
        transform: Option<&TransformConfig>,
    ) -> Result<BoxedDataset> {
        let dataset = ImageDirDataset::new(data_dir, &self.class_names)?;
        with_transform(Arc::new(dataset), transform)
    }
}

/// Images under `<dir>/<class_name>/`, labeled by the position of the class
/// name.
#[derive(Debug, Clone)]
pub struct ImageDirDataset {
    samples: Vec<(PathBuf, usize)>,
}

impl ImageDirDataset {
    pub fn new(dir: &Path, class_names: &[String]) -> Result<Self> {
        ensure!(
            dir.is_dir(),
            UriError::NotFound(dir.display().to_string())
        );

        let mut samples = vec![];
        let class_dirs = glob_paths(dir, "*", MatchOptions::new())?
            .into_iter()
            .filter(|path| path.is_dir());

        for class_dir in class_dirs {
            let class_name = class_dir
                .file_name()
                .map(|name| name.to_string_lossy().into_owned())
                .unwrap_or_default();
            let class_id = match class_names.iter().position(|name| *name == class_name) {
                Some(class_id) => class_id,
                None => {
                    warn!(
                        "skip '{}' that is not named after a class",
                        class_dir.display()
                    );
                    continue;
                }
            };

            let image_paths = IMAGE_EXTENSIONS
                .iter()
                .map(|ext| {
                    let options = MatchOptions {
                        case_sensitive: false,
                        ..MatchOptions::new()
                    };
                    glob_paths(&class_dir, &format!("*.{}", ext), options)
                })
                .collect::<Result<Vec<_>>>()?
                .into_iter()
                .flatten()
                .filter(|path| path.is_file())
                .sorted();
            samples.extend(image_paths.map(|path| (path, class_id)));
        }

        debug!("found {} images in {}", samples.len(), dir.display());
        Ok(Self { samples })
    }

    pub fn samples(&self) -> &[(PathBuf, usize)] {
        &self.samples
    }
}

impl RandomAccessDataset for ImageDirDataset {
    fn num_records(&self) -> usize {
        self.samples.len()
    }

    fn nth(&self, index: usize) -> Result<DataRecord> {
        let (path, class_id) = self
            .samples
            .get(index)
            .ok_or_else(|| format_err!("index {} is out of range", index))?;
        Ok(DataRecord {
            chip: load_chip(path)?,
            class_id: Some(*class_id),
        })
    }
}

/// Paths directly under `dir` matching the file name pattern, in
/// alphabetical order.
fn glob_paths(dir: &Path, pattern: &str, options: MatchOptions) -> Result<Vec<PathBuf>> {
    let pattern = format!(
        "{}/{}",
        Pattern::escape(&dir.to_string_lossy()),
        pattern
    );
    glob_with(&pattern, options)
        .with_context(|| format!("invalid glob pattern '{}'", pattern))?
        .map(|path| -> Result<_> { Ok(path?) })
        .collect()
}

/// Load an image as a (height, width, channel) array.
///
/// Grayscale images have one channel, images with alpha four, and the rest
/// are converted to RGB.
pub fn load_chip(path: &Path) -> Result<Array3<u8>> {
    let image =
        image::open(path).with_context(|| format!("unable to open '{}'", path.display()))?;
    image_to_chip(image)
}

pub fn image_to_chip(image: DynamicImage) -> Result<Array3<u8>> {
    let (width, height, channels, pixels) = match image {
        DynamicImage::ImageLuma8(image) => (image.width(), image.height(), 1, image.into_raw()),
        DynamicImage::ImageRgba8(image) => (image.width(), image.height(), 4, image.into_raw()),
        image => {
            let image = image.to_rgb8();
            (image.width(), image.height(), 3, image.into_raw())
        }
    };
    let chip = Array3::from_shape_vec((height as usize, width as usize, channels), pixels)?;
    Ok(chip)
}

#[cfg(test)]
mod tests {
    use super::*;
    use image::{GrayImage, Luma, Rgb, RgbImage};

    #[test]
    fn classes_follow_directory_names() -> Result<()> {
        let dir = tempfile::tempdir()?;
        for (class_name, count) in [("cat", 2), ("dog", 1), ("misc", 3)] {
            let class_dir = dir.path().join(class_name);
            fs::create_dir(&class_dir)?;
            for index in 0..count {
                RgbImage::from_pixel(4, 3, Rgb([index as u8, 0, 0]))
                    .save(class_dir.join(format!("{}.png", index)))?;
            }
        }
        fs::write(dir.path().join("cat").join("notes.txt"), "not an image")?;

        let class_names = vec!["cat".to_string(), "dog".to_string()];
        let dataset = ImageDirDataset::new(dir.path(), &class_names)?;
        assert_eq!(dataset.num_records(), 3);

        let record = dataset.nth(1)?;
        assert_eq!(record.class_id, Some(0));
        assert_eq!(record.chip.dim(), (3, 4, 3));
        assert_eq!(record.chip[[0, 0, 0]], 1);
        assert_eq!(dataset.nth(2)?.class_id, Some(1));
        Ok(())
    }

    #[test]
    fn image_extensions_match_in_any_case() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let split_dir = dir.path().join("[run-1]");
        let class_dir = split_dir.join("cat");
        fs::create_dir_all(&class_dir)?;
        for name in ["b.PNG", "a.jpg", "c.Tiff"] {
            RgbImage::from_pixel(1, 1, Rgb([0, 0, 0])).save_with_format(
                class_dir.join(name),
                image::ImageFormat::Png,
            )?;
        }
        fs::create_dir(class_dir.join("nested.png"))?;
        fs::write(class_dir.join("d.png.txt"), "not an image")?;

        let dataset = ImageDirDataset::new(&split_dir, &["cat".to_string()])?;
        let names: Vec<_> = dataset
            .samples()
            .iter()
            .map(|(path, _)| path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, ["a.jpg", "b.PNG", "c.Tiff"]);
        Ok(())
    }

    #[test]
    fn grayscale_images_have_one_channel() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let path = dir.path().join("gray.png");
        GrayImage::from_pixel(2, 5, Luma([9])).save(&path)?;
        let chip = load_chip(&path)?;
        assert_eq!(chip.dim(), (5, 2, 1));
        assert!(chip.iter().all(|&value| value == 9));
        Ok(())
    }

    #[test]
    fn missing_directory_is_not_found() {
        let err = ImageDirDataset::new(Path::new("/nonexistent/chips"), &[]).unwrap_err();
        assert!(matches!(
            err.downcast_ref::<UriError>(),
            Some(UriError::NotFound(_))
        ));
    }
}
