//! Chip classification: one class per non-overlapping grid cell.

use crate::{common::*, debug_image::draw_debug_predict_image, task::MlTask};
use learner_data::{LabelSource as _, LabelStore as _};
use uri_fs::join_uri;

pub const DEFAULT_LINE_WIDTH: usize = 4;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChipClassificationConfig {
    /// Height and width of the square grid cells.
    pub chip_size: NonZeroUsize,
    pub class_config: ClassConfig,
    /// Width of the cell outlines in debug images.
    #[serde(default = "default_line_width")]
    pub debug_line_width: usize,
}

impl ChipClassificationConfig {
    pub fn new(chip_size: NonZeroUsize, class_config: ClassConfig) -> Self {
        Self {
            chip_size,
            class_config,
            debug_line_width: DEFAULT_LINE_WIDTH,
        }
    }
}

fn default_line_width() -> usize {
    DEFAULT_LINE_WIDTH
}

#[derive(Debug, Clone)]
pub struct ChipClassification {
    pub config: ChipClassificationConfig,
    pub file_system: Arc<dyn FileSystem>,
}

impl ChipClassification {
    pub fn new(config: ChipClassificationConfig, file_system: Arc<dyn FileSystem>) -> Self {
        Self {
            config,
            file_system,
        }
    }

    fn grid(&self, extent: &PixelBox) -> Result<Vec<PixelBox>> {
        let size = self.config.chip_size.get();
        extent.get_windows((size, size), (size, size), None)
    }
}

impl MlTask for ChipClassification {
    /// Grid cells whose chip has any non-zero pixel.
    fn get_train_windows(&self, scene: &Scene) -> Result<Vec<PixelBox>> {
        let raster_source = &scene.raster_source;
        let mut windows = vec![];
        for window in self.grid(&raster_source.extent())? {
            let chip = raster_source.get_chip(&window)?;
            if chip.iter().any(|&value| value > 0) {
                windows.push(window);
            }
        }
        Ok(windows)
    }

    fn get_train_labels(&self, window: &PixelBox, scene: &Scene) -> Result<ClassificationLabels> {
        let ground_truth = scene
            .ground_truth
            .as_ref()
            .ok_or_else(|| format_err!("scene '{}' has no ground truth", scene.id))?;
        ground_truth.get_labels(Some(window))
    }

    fn get_predict_windows(&self, extent: &PixelBox) -> Result<Vec<PixelBox>> {
        self.grid(extent)
    }

    fn post_process_predictions(&self, labels: ClassificationLabels) -> ClassificationLabels {
        labels
    }

    fn save_debug_predict_image(
        &self,
        scene: &Scene,
        debug_dir_uri: &str,
        tmp_dir: &Path,
    ) -> Result<()> {
        let prediction_store = scene
            .prediction_store
            .as_ref()
            .ok_or_else(|| format_err!("scene '{}' has no prediction store", scene.id))?;
        let labels = prediction_store.get_labels()?;
        let image = draw_debug_predict_image(
            scene.raster_source.as_ref(),
            &labels,
            &self.config.class_config,
            self.config.debug_line_width,
        )?;

        let file_name = format!("{}.png", scene.id);
        fs::create_dir_all(tmp_dir)?;
        let path = tmp_dir.join(&file_name);
        image
            .save(&path)
            .with_context(|| format!("unable to write '{}'", path.display()))?;
        let debug_image_uri = join_uri(debug_dir_uri, &file_name);
        self.file_system.upload_if_needed(&path, &debug_image_uri)?;
        info!("saved debug image of scene '{}' to {}", scene.id, debug_image_uri);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use learner_data::ImageRasterSource;
    use uri_fs::LocalFileSystem;

    fn task(chip_size: usize) -> ChipClassification {
        let config = ChipClassificationConfig::new(
            NonZeroUsize::new(chip_size).unwrap(),
            ClassConfig::new(["a", "b"]),
        );
        ChipClassification::new(config, Arc::new(LocalFileSystem))
    }

    #[test]
    fn predict_windows_tile_the_extent() -> Result<()> {
        let windows = task(4).get_predict_windows(&PixelBox::from_hw(8, 10))?;
        // partial cells at the right border are kept
        assert_eq!(windows.len(), 6);
        assert!(windows.iter().all(|window| window.height() == 4));
        Ok(())
    }

    #[test]
    fn train_windows_skip_empty_chips() -> Result<()> {
        let mut image = Array3::zeros((8, 8, 1));
        image[[5, 6, 0]] = 1;
        image[[0, 0, 0]] = 7;
        let raster = ImageRasterSource::new(image, None)?;
        let scene = Scene::new("scene", Arc::new(raster));

        let windows = task(4).get_train_windows(&scene)?;
        assert_eq!(
            windows,
            [PixelBox::new(0, 0, 4, 4)?, PixelBox::new(4, 4, 8, 8)?]
        );
        Ok(())
    }

    #[test]
    fn train_labels_need_ground_truth() -> Result<()> {
        let raster = ImageRasterSource::new(Array3::zeros((4, 4, 3)), None)?;
        let scene = Scene::new("scene", Arc::new(raster));
        assert!(task(4)
            .get_train_labels(&PixelBox::from_hw(4, 4), &scene)
            .is_err());
        Ok(())
    }
}
