use crate::{common::*, CommonDataConfig, GeoDataWindowConfig, SceneDatasetConfig};

/// Window options for all scenes, or per scene id.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum WindowOpts {
    Single(GeoDataWindowConfig),
    PerScene(IndexMap<String, GeoDataWindowConfig>),
}

impl WindowOpts {
    pub fn for_scene(&self, scene_id: &str) -> Option<&GeoDataWindowConfig> {
        match self {
            Self::Single(config) => Some(config),
            Self::PerScene(configs) => configs.get(scene_id),
        }
    }

    pub fn update(&mut self) {
        match self {
            Self::Single(config) => config.update(),
            Self::PerScene(configs) => configs.values_mut().for_each(|config| config.update()),
        }
    }
}

/// A dataset of windows read from geospatial scenes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoDataConfig {
    #[serde(flatten)]
    pub common: CommonDataConfig,
    pub scene_dataset: SceneDatasetConfig,
    pub window_opts: WindowOpts,
}

impl GeoDataConfig {
    pub fn update<R>(&mut self, rng: &mut R) -> ConfigResult
    where
        R: Rng,
    {
        self.scene_dataset.update(rng);
        let class_config = &self.scene_dataset.class_config;
        if self.common.class_names.is_empty() {
            self.common.class_names = class_config.names.clone();
        }
        if self.common.class_colors.is_none() {
            self.common.class_colors = class_config.colors.clone();
        }
        self.common.update(rng)?;
        self.window_opts.update();
        Ok(())
    }

    pub fn validate_config(&self) -> ConfigResult {
        self.common.validate_config()?;
        self.scene_dataset
            .validate_config()
            .map_err(|err| err.within("scene_dataset"))?;

        match &self.window_opts {
            WindowOpts::Single(config) => {
                config
                    .validate_config()
                    .map_err(|err| err.within("window_opts"))?;
            }
            WindowOpts::PerScene(configs) => {
                for scene in self.scene_dataset.all_scenes() {
                    ensure_config!(
                        configs.contains_key(&scene.id),
                        "window config not found for scene {}",
                        scene.id
                    );
                }
                for (scene_id, config) in configs {
                    config
                        .validate_config()
                        .map_err(|err| err.within(&format!("window_opts[{}]", scene_id)))?;
                }
            }
        }
        Ok(())
    }
}
