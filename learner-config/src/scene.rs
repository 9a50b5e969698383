//! Declarative descriptions of geospatial scenes.

use crate::{color::random_distinct_colors, common::*, Color};

/// The classes of a scene dataset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClassConfig {
    pub names: Vec<String>,
    #[serde(default)]
    pub colors: Option<Vec<Color>>,
    /// The class assigned to pixels that belong to no other class.
    #[serde(default)]
    pub null_class: Option<String>,
}

impl ClassConfig {
    pub fn new<S>(names: impl IntoIterator<Item = S>) -> Self
    where
        S: Into<String>,
    {
        Self {
            names: names.into_iter().map(Into::into).collect(),
            colors: None,
            null_class: None,
        }
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    pub fn class_id(&self, name: &str) -> Option<usize> {
        self.names.iter().position(|class| class == name)
    }

    /// The RGB color of a class.
    pub fn color_rgb(&self, class_id: usize) -> Result<[u8; 3]> {
        let colors = self
            .colors
            .as_ref()
            .ok_or_else(|| format_err!("class colors are not assigned"))?;
        let color = colors
            .get(class_id)
            .ok_or_else(|| format_err!("class id {} is out of range", class_id))?;
        color.to_rgb()
    }

    pub fn update<R>(&mut self, rng: &mut R)
    where
        R: Rng,
    {
        if self.colors.as_ref().map_or(true, |colors| colors.is_empty()) {
            self.colors = Some(random_distinct_colors(self.names.len(), rng));
        }
    }

    pub fn validate_config(&self) -> ConfigResult {
        ensure_config!(!self.names.is_empty(), "names must not be empty");
        let mut seen = HashSet::new();
        for name in &self.names {
            ensure_config!(seen.insert(name), "duplicated class name '{}'", name);
        }
        if let Some(colors) = &self.colors {
            ensure_config!(
                colors.len() == self.names.len(),
                "the number of colors ({}) must match the number of classes ({})",
                colors.len(),
                self.names.len()
            );
            for color in colors {
                color
                    .to_rgb()
                    .map_err(|err| ConfigError::new(format!("colors: {}", err)))?;
            }
        }
        if let Some(null_class) = &self.null_class {
            ensure_config!(
                self.names.contains(null_class),
                "null_class '{}' is not one of the class names",
                null_class
            );
        }
        Ok(())
    }
}

/// Where the imagery of a scene is read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RasterSourceConfig {
    pub uris: Vec<String>,
    /// Channels to keep, in order. All channels are kept if unset.
    #[serde(default)]
    pub channel_order: Option<Vec<usize>>,
}

/// Where ground truth labels of a scene are read from.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelSourceConfig {
    pub uri: String,
}

/// Where predicted labels of a scene are written to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabelStoreConfig {
    pub uri: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SceneConfig {
    pub id: String,
    pub raster_source: RasterSourceConfig,
    #[serde(default)]
    pub label_source: Option<LabelSourceConfig>,
    #[serde(default)]
    pub label_store: Option<LabelStoreConfig>,
    /// Files of polygons restricting where windows are drawn.
    #[serde(default)]
    pub aoi_uris: Vec<String>,
}

impl SceneConfig {
    pub fn validate_config(&self) -> ConfigResult {
        ensure_config!(!self.id.trim().is_empty(), "scene id must not be empty");
        ensure_config!(
            !self.raster_source.uris.is_empty(),
            "scene '{}' has no raster source URIs",
            self.id
        );
        Ok(())
    }
}

/// Scenes split into training, validation and test sets.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SceneDatasetConfig {
    pub class_config: ClassConfig,
    #[serde(default)]
    pub train_scenes: Vec<SceneConfig>,
    #[serde(default)]
    pub validation_scenes: Vec<SceneConfig>,
    #[serde(default)]
    pub test_scenes: Vec<SceneConfig>,
}

impl SceneDatasetConfig {
    pub fn all_scenes(&self) -> impl Iterator<Item = &SceneConfig> {
        self.train_scenes
            .iter()
            .chain(&self.validation_scenes)
            .chain(&self.test_scenes)
    }

    pub fn update<R>(&mut self, rng: &mut R)
    where
        R: Rng,
    {
        self.class_config.update(rng);
    }

    pub fn validate_config(&self) -> ConfigResult {
        self.class_config
            .validate_config()
            .map_err(|err| err.within("class_config"))?;

        let mut ids = HashSet::new();
        for scene in self.all_scenes() {
            scene.validate_config()?;
            ensure_config!(ids.insert(&scene.id), "duplicated scene id '{}'", scene.id);
        }
        Ok(())
    }
}
