//! Builds the datasets of a [GeoDataConfig].

use crate::{
    common::*,
    dataset::{BoxedDataset, ConcatDataset, DatasetSplits, RandomAccessDataset},
    scene::{Scene, SceneBuilder},
    subset::random_subset_dataset,
    window_dataset::SceneToDataset,
};
use learner_config::{GeoDataConfig, SceneConfig};

/// Builds training, validation and test datasets out of scene windows.
#[derive(Debug, Clone, Copy)]
pub struct GeoDatasetBuilder<'a> {
    pub config: &'a GeoDataConfig,
    pub scene_builder: &'a dyn SceneBuilder,
    pub scene_to_dataset: &'a dyn SceneToDataset,
}

impl<'a> GeoDatasetBuilder<'a> {
    pub fn new(
        config: &'a GeoDataConfig,
        scene_builder: &'a dyn SceneBuilder,
        scene_to_dataset: &'a dyn SceneToDataset,
    ) -> Self {
        Self {
            config,
            scene_builder,
            scene_to_dataset,
        }
    }

    /// The train, validation and test scenes.
    pub fn build_scenes(&self, tmp_dir: &Path) -> Result<[Vec<Arc<Scene>>; 3]> {
        let scene_dataset = &self.config.scene_dataset;
        let build = |scenes: &[SceneConfig]| -> Result<Vec<Arc<Scene>>> {
            scenes
                .iter()
                .map(|config| -> Result<_> {
                    let scene = self
                        .scene_builder
                        .build_scene(config, &scene_dataset.class_config, tmp_dir)
                        .with_context(|| format!("unable to build scene '{}'", config.id))?;
                    Ok(Arc::new(scene))
                })
                .collect()
        };
        Ok([
            build(&scene_dataset.train_scenes)?,
            build(&scene_dataset.validation_scenes)?,
            build(&scene_dataset.test_scenes)?,
        ])
    }

    /// Build the datasets, downloading scene data under `tmp_dir`.
    ///
    /// In overfit mode, the training split is not augmented.
    pub fn build(&self, tmp_dir: &Path, overfit_mode: bool) -> Result<DatasetSplits> {
        let common = &self.config.common;
        let (base_transform, aug_transform) = common.get_data_transforms();
        let train_transform = if overfit_mode {
            &base_transform
        } else {
            &aug_transform
        };

        let [train_scenes, valid_scenes, test_scenes] = self.build_scenes(tmp_dir)?;
        let train = self.scenes_to_dataset(train_scenes, train_transform)?;
        let valid = self.scenes_to_dataset(valid_scenes, &base_transform)?;
        let test = self.scenes_to_dataset(test_scenes, &base_transform)?;

        let train = random_subset_dataset(train, common.train_sz, common.train_sz_rel)?;
        info!(
            "built geo datasets with {} training, {} validation and {} test records",
            train.num_records(),
            valid.num_records(),
            test.num_records()
        );
        Ok(DatasetSplits { train, valid, test })
    }

    fn scenes_to_dataset(
        &self,
        scenes: Vec<Arc<Scene>>,
        transform: &TransformConfig,
    ) -> Result<BoxedDataset> {
        let datasets: Vec<_> = scenes
            .into_iter()
            .map(|scene| -> Result<BoxedDataset> {
                let opts = self
                    .config
                    .window_opts
                    .for_scene(&scene.id)
                    .ok_or_else(|| format_err!("window config not found for scene {}", scene.id))?;
                self.scene_to_dataset
                    .scene_to_dataset(scene, opts, Some(transform))
            })
            .collect::<Result<_>>()?;
        Ok(Arc::new(ConcatDataset::new(datasets)))
    }
}
