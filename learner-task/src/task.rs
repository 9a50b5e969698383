use crate::common::*;

/// The windowing and labeling strategy of a task.
pub trait MlTask
where
    Self: Debug + Send + Sync,
{
    /// The windows training chips are cut from.
    fn get_train_windows(&self, scene: &Scene) -> Result<Vec<PixelBox>>;

    /// The ground-truth labels inside a training window.
    fn get_train_labels(&self, window: &PixelBox, scene: &Scene) -> Result<ClassificationLabels>;

    /// The windows to run prediction on.
    fn get_predict_windows(&self, extent: &PixelBox) -> Result<Vec<PixelBox>>;

    fn post_process_predictions(&self, labels: ClassificationLabels) -> ClassificationLabels;

    /// Render the predictions of a scene and store the image under
    /// `debug_dir_uri`.
    fn save_debug_predict_image(
        &self,
        scene: &Scene,
        debug_dir_uri: &str,
        tmp_dir: &Path,
    ) -> Result<()>;
}
