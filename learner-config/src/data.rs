//! Dataset configurations.

use crate::{
    color::random_distinct_colors, common::*, default_augmentors, Augmentor, Color,
    GeoDataConfig, PlotOptions, Proportion, TransformConfig,
};

/// The dataset configuration, tagged by `type_hint`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type_hint")]
pub enum DataConfig {
    #[serde(rename = "image_data")]
    Image(ImageDataConfig),
    #[serde(rename = "geo_data")]
    Geo(GeoDataConfig),
}

impl DataConfig {
    pub fn common(&self) -> &CommonDataConfig {
        match self {
            Self::Image(config) => &config.common,
            Self::Geo(config) => &config.common,
        }
    }

    pub fn common_mut(&mut self) -> &mut CommonDataConfig {
        match self {
            Self::Image(config) => &mut config.common,
            Self::Geo(config) => &mut config.common,
        }
    }

    pub fn num_classes(&self) -> usize {
        self.common().num_classes()
    }

    pub fn update<R>(&mut self, rng: &mut R) -> ConfigResult
    where
        R: Rng,
    {
        match self {
            Self::Image(config) => config.update(rng),
            Self::Geo(config) => config.update(rng),
        }
    }

    pub fn validate_config(&self) -> ConfigResult {
        match self {
            Self::Image(config) => config.validate_config(),
            Self::Geo(config) => config.validate_config(),
        }
    }

    pub fn get_data_transforms(&self) -> (TransformConfig, TransformConfig) {
        self.common().get_data_transforms()
    }

    pub fn as_image(&self) -> Option<&ImageDataConfig> {
        match self {
            Self::Image(config) => Some(config),
            Self::Geo(_) => None,
        }
    }

    pub fn as_geo(&self) -> Option<&GeoDataConfig> {
        match self {
            Self::Geo(config) => Some(config),
            Self::Image(_) => None,
        }
    }
}

/// Options shared by every kind of dataset.
#[derive(Debug, Clone, PartialEq, Derivative, Serialize, Deserialize)]
#[derivative(Default)]
pub struct CommonDataConfig {
    #[serde(default)]
    pub class_names: Vec<String>,
    /// Colors used to display classes.
    #[serde(default)]
    pub class_colors: Option<Vec<Color>>,
    /// The number of channels of the training images.
    #[serde(default)]
    pub img_channels: Option<NonZeroUsize>,
    /// Side length images are resized to during training, not the size in
    /// the raw dataset.
    #[serde(default = "default_img_sz")]
    #[derivative(Default(value = "default_img_sz()"))]
    pub img_sz: NonZeroUsize,
    /// Cap on the number of training samples.
    #[serde(default)]
    pub train_sz: Option<usize>,
    /// Cap on the proportion of training samples.
    #[serde(default)]
    pub train_sz_rel: Option<Proportion>,
    #[serde(default = "default_num_workers")]
    #[derivative(Default(value = "default_num_workers()"))]
    pub num_workers: usize,
    /// Catalog augmentors applied to training samples. Ignored when
    /// `aug_transform` is set.
    #[serde(default = "default_augmentors")]
    #[derivative(Default(value = "default_augmentors()"))]
    pub augmentors: Vec<String>,
    /// Applied to every split after resizing.
    #[serde(default)]
    pub base_transform: Option<TransformConfig>,
    /// Custom augmentation of the training split.
    #[serde(default)]
    pub aug_transform: Option<TransformConfig>,
    #[serde(default = "default_plot_options")]
    #[derivative(Default(value = "default_plot_options()"))]
    pub plot_options: Option<PlotOptions>,
    /// Limit on the number of items in preview plots.
    #[serde(default)]
    pub preview_batch_limit: Option<usize>,
}

impl CommonDataConfig {
    pub fn num_classes(&self) -> usize {
        self.class_names.len()
    }

    pub fn update<R>(&mut self, rng: &mut R) -> ConfigResult
    where
        R: Rng,
    {
        if self
            .class_colors
            .as_ref()
            .map_or(true, |colors| colors.is_empty())
        {
            self.class_colors = Some(random_distinct_colors(self.class_names.len(), rng));
        }
        if let Some(plot_options) = &mut self.plot_options {
            plot_options
                .update(self.img_channels)
                .map_err(|err| err.within("plot_options"))?;
        }
        Ok(())
    }

    pub fn validate_config(&self) -> ConfigResult {
        if self.aug_transform.is_none() {
            self.validate_augmentors()?;
        }
        ensure_config!(
            !(self.train_sz.is_some() && self.train_sz_rel.is_some()),
            "only one of train_sz and train_sz_rel should be specified"
        );
        if let Some(colors) = &self.class_colors {
            ensure_config!(
                colors.len() == self.class_names.len(),
                "the number of class_colors ({}) must match the number of class_names ({})",
                colors.len(),
                self.class_names.len()
            );
            for color in colors {
                color
                    .to_rgb()
                    .map_err(|err| ConfigError::new(format!("class_colors: {}", err)))?;
            }
        }
        for (name, transform) in [
            ("base_transform", &self.base_transform),
            ("aug_transform", &self.aug_transform),
        ] {
            if let Some(transform) = transform {
                transform.validate_config().map_err(|err| err.within(name))?;
            }
        }
        if let Some(plot_options) = &self.plot_options {
            plot_options
                .validate_config()
                .map_err(|err| err.within("plot_options"))?;
        }
        Ok(())
    }

    pub fn validate_augmentors(&self) -> ConfigResult {
        for name in &self.augmentors {
            ensure_config!(
                Augmentor::from_str(name).is_ok(),
                "augmentors: '{}' is not one of {:?}",
                name,
                Augmentor::names()
            );
        }
        Ok(())
    }

    /// The transform without augmentation and the one with it.
    ///
    /// Both start by resizing to `img_sz` followed by `base_transform`.
    /// The augmented one then applies `aug_transform`, or the catalog
    /// augmentors if it is unset.
    pub fn get_data_transforms(&self) -> (TransformConfig, TransformConfig) {
        let mut base_transforms = vec![TransformConfig::resize(self.img_sz)];
        base_transforms.extend(self.base_transform.clone());
        let base_transform = TransformConfig::Compose {
            transforms: base_transforms,
        };

        let aug_transforms = match &self.aug_transform {
            Some(aug_transform) => vec![base_transform.clone(), aug_transform.clone()],
            None => {
                let catalog = self.augmentors.iter().filter_map(|name| {
                    match Augmentor::from_str(name) {
                        Ok(augmentor) => Some(augmentor.transform()),
                        Err(_) => {
                            warn!(
                                "{} is an unknown augmentor, continuing without it. Known augmentors are {:?}",
                                name,
                                Augmentor::names()
                            );
                            None
                        }
                    }
                });
                std::iter::once(base_transform.clone())
                    .chain(catalog)
                    .collect()
            }
        };

        (
            base_transform,
            TransformConfig::Compose {
                transforms: aug_transforms,
            },
        )
    }
}

/// A URI, or a list of zip file URIs.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum UriSpec {
    One(String),
    Many(Vec<String>),
}

impl From<&str> for UriSpec {
    fn from(uri: &str) -> Self {
        Self::One(uri.to_string())
    }
}

impl From<Vec<String>> for UriSpec {
    fn from(uris: Vec<String>) -> Self {
        Self::Many(uris)
    }
}

/// A single value shared by all groups, or one value per group.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum OneOrMany<T> {
    One(T),
    Many(Vec<T>),
}

impl<T> OneOrMany<T>
where
    T: Clone,
{
    /// Expand to exactly `count` values.
    pub fn expand(&self, count: usize) -> Vec<T> {
        match self {
            Self::One(value) => vec![value.clone(); count],
            Self::Many(values) => values.clone(),
        }
    }

    /// The number of values, unless a single value is shared.
    pub fn explicit_len(&self) -> Option<usize> {
        match self {
            Self::One(_) => None,
            Self::Many(values) => Some(values.len()),
        }
    }
}

/// The cap on the training samples drawn from a group.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum GroupSize {
    Count(usize),
    Fraction(Proportion),
}

/// A dataset of chip directories, zips of them, or directories of zips.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ImageDataConfig {
    #[serde(flatten)]
    pub common: CommonDataConfig,
    /// Name of the dataset format.
    #[serde(default)]
    pub data_format: Option<String>,
    /// One of the following:
    ///
    /// 1. a directory containing `train`, `valid` and optionally `test`
    ///    subdirectories,
    /// 2. a zip file of (1),
    /// 3. a list of (2),
    /// 4. a directory containing zip files of (1).
    #[serde(default)]
    pub uri: Option<UriSpec>,
    /// Groups of sources of the same forms as `uri`, set instead of `uri`
    /// to cap training samples per group.
    #[serde(default)]
    pub group_uris: Option<Vec<UriSpec>>,
    #[serde(default)]
    pub group_train_sz: Option<OneOrMany<usize>>,
    #[serde(default)]
    pub group_train_sz_rel: Option<OneOrMany<Proportion>>,
}

impl ImageDataConfig {
    pub fn new(uri: impl Into<UriSpec>, class_names: Vec<String>) -> Self {
        Self {
            common: CommonDataConfig {
                class_names,
                ..Default::default()
            },
            data_format: None,
            uri: Some(uri.into()),
            group_uris: None,
            group_train_sz: None,
            group_train_sz_rel: None,
        }
    }

    pub fn update<R>(&mut self, rng: &mut R) -> ConfigResult
    where
        R: Rng,
    {
        self.common.update(rng)
    }

    pub fn validate_config(&self) -> ConfigResult {
        self.common.validate_config()?;
        self.validate_group_uris()
    }

    pub fn validate_group_uris(&self) -> ConfigResult {
        let has_group_train_sz = self.group_train_sz.is_some();
        let has_group_train_sz_rel = self.group_train_sz_rel.is_some();
        let num_groups = self.group_uris.as_ref().map(|groups| groups.len());

        ensure_config!(
            !(has_group_train_sz && has_group_train_sz_rel),
            "only one of group_train_sz and group_train_sz_rel should be specified"
        );
        ensure_config!(
            !has_group_train_sz || num_groups.is_some(),
            "group_train_sz specified without group_uris"
        );
        ensure_config!(
            !has_group_train_sz_rel || num_groups.is_some(),
            "group_train_sz_rel specified without group_uris"
        );
        if let (Some(sizes), Some(num_groups)) = (&self.group_train_sz, num_groups) {
            if let Some(len) = sizes.explicit_len() {
                ensure_config!(
                    len == num_groups,
                    "len(group_train_sz) ({}) != len(group_uris) ({})",
                    len,
                    num_groups
                );
            }
        }
        if let (Some(sizes), Some(num_groups)) = (&self.group_train_sz_rel, num_groups) {
            if let Some(len) = sizes.explicit_len() {
                ensure_config!(
                    len == num_groups,
                    "len(group_train_sz_rel) ({}) != len(group_uris) ({})",
                    len,
                    num_groups
                );
            }
        }
        Ok(())
    }

    /// The training cap of each group, in group order.
    pub fn group_sizes(&self) -> Vec<Option<GroupSize>> {
        let num_groups = self.group_uris.as_ref().map_or(0, |groups| groups.len());
        match (&self.group_train_sz, &self.group_train_sz_rel) {
            (Some(sizes), _) => sizes
                .expand(num_groups)
                .into_iter()
                .map(|size| Some(GroupSize::Count(size)))
                .collect(),
            (None, Some(fractions)) => fractions
                .expand(num_groups)
                .into_iter()
                .map(|fraction| Some(GroupSize::Fraction(fraction)))
                .collect(),
            (None, None) => vec![None; num_groups],
        }
    }
}

fn default_img_sz() -> NonZeroUsize {
    NonZeroUsize::new(256).unwrap()
}

fn default_num_workers() -> usize {
    4
}

fn default_plot_options() -> Option<PlotOptions> {
    Some(PlotOptions::default())
}
