use crate::{common::*, Backbone, ExternalModuleConfig, ModuleLoader};

/// Builds the built-in model of a concrete task.
pub trait ModelBuilder {
    type Model;

    fn build_default_model(
        &self,
        config: &ModelConfig,
        num_classes: usize,
        in_channels: usize,
    ) -> Result<Self::Model>;
}

/// Config related to models.
#[derive(Debug, Clone, PartialEq, Derivative, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default)]
pub struct ModelConfig {
    /// The torchvision backbone to use.
    pub backbone: Backbone,
    /// Start from ImageNet weights instead of a random initialization.
    #[derivative(Default(value = "true"))]
    pub pretrained: bool,
    /// URI of model weights used to initialize the model. If set, it
    /// supersedes `pretrained`.
    pub init_weights: Option<String>,
    /// Require the keys of `init_weights` to match the model exactly.
    #[derivative(Default(value = "true"))]
    pub load_strict: bool,
    /// If set, the model is built from this external definition.
    pub external_def: Option<ExternalModuleConfig>,
}

impl ModelConfig {
    pub fn update(&mut self) {}

    pub fn validate_config(&self) -> ConfigResult {
        if let Some(external_def) = &self.external_def {
            external_def
                .validate_config()
                .map_err(|err| err.within("external_def"))?;
        }
        Ok(())
    }

    pub fn backbone_str(&self) -> &'static str {
        self.backbone.into()
    }

    /// Build the model, either from the external definition or with the
    /// task's default builder.
    ///
    /// `save_dir` is where an external definition is fetched to, and
    /// `hubconf_dir` points to an already fetched one.
    #[allow(clippy::too_many_arguments)]
    pub fn build<B, L>(
        &self,
        num_classes: usize,
        in_channels: usize,
        save_dir: Option<&Path>,
        hubconf_dir: Option<&Path>,
        builder: &B,
        loader: &L,
        file_system: &dyn FileSystem,
    ) -> Result<B::Model>
    where
        B: ModelBuilder,
        L: ModuleLoader<Output = B::Model>,
    {
        match &self.external_def {
            Some(_) => {
                let save_dir = save_dir
                    .ok_or_else(|| format_err!("save_dir is required to build an external model"))?;
                self.build_external_model(save_dir, hubconf_dir, loader, file_system)
            }
            None => builder.build_default_model(self, num_classes, in_channels),
        }
    }

    pub fn build_external_model<L>(
        &self,
        save_dir: &Path,
        hubconf_dir: Option<&Path>,
        loader: &L,
        file_system: &dyn FileSystem,
    ) -> Result<L::Output>
    where
        L: ModuleLoader,
    {
        let external_def = self
            .external_def
            .as_ref()
            .ok_or_else(|| format_err!("external_def is not set"))?;
        external_def.build(save_dir, hubconf_dir, loader, file_system)
    }
}
