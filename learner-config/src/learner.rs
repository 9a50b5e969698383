//! The root learner configuration.

use crate::{
    common::*,
    upgrade::{upgrade_learner_config, CONFIG_VERSION},
    DataConfig, ModelConfig, SolverConfig,
};
use uri_fs::join_uri;

/// The name of the model bundle under the output URI.
pub const MODEL_BUNDLE_NAME: &str = "model-bundle.zip";

/// Ties the model, solver and data configs together.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerConfig {
    #[serde(default = "default_version")]
    pub version: u64,
    #[serde(default)]
    pub model: ModelConfig,
    #[serde(default)]
    pub solver: SolverConfig,
    pub data: DataConfig,
    /// Skip training, load the model and run the final evaluation.
    #[serde(default)]
    pub predict_mode: bool,
    /// Use the test epoch count and batch size, and load data without
    /// worker threads. Meant to check that a job runs before the real one.
    #[serde(default)]
    pub test_mode: bool,
    /// Use half the image size and optimize a single batch repeatedly for
    /// `overfit_num_steps` steps instead of epoch-based training.
    #[serde(default)]
    pub overfit_mode: bool,
    /// Also evaluate on the training set at the end.
    #[serde(default)]
    pub eval_train: bool,
    /// Save the model and this config as a bundle at the end of training.
    #[serde(default = "default_true")]
    pub save_model_bundle: bool,
    #[serde(default = "default_true")]
    pub log_tensorboard: bool,
    /// Serve the tensorboard logs during training.
    #[serde(default)]
    pub run_tensorboard: bool,
    /// URI of where to save output.
    #[serde(default)]
    pub output_uri: Option<String>,
}

impl LearnerConfig {
    pub fn new(data: DataConfig) -> Self {
        Self {
            version: CONFIG_VERSION,
            model: ModelConfig::default(),
            solver: SolverConfig::default(),
            data,
            predict_mode: false,
            test_mode: false,
            overfit_mode: false,
            eval_train: false,
            save_model_bundle: true,
            log_tensorboard: true,
            run_tensorboard: false,
            output_uri: None,
        }
    }

    /// Load a JSON5 config file, upgrading it if written by an older version.
    pub fn load<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        let text = fs::read_to_string(path)
            .with_context(|| format!("unable to read '{}'", path.display()))?;
        Self::from_json5_str(&text)
            .with_context(|| format!("unable to load the config '{}'", path.display()))
    }

    pub fn from_json5_str(text: &str) -> Result<Self> {
        let value: Value = json5::from_str(text)?;
        let value = upgrade_learner_config(value)?;
        let config = serde_json::from_value(value)?;
        Ok(config)
    }

    pub fn to_json_string_pretty(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn save<P>(&self, path: P) -> Result<()>
    where
        P: AsRef<Path>,
    {
        let path = path.as_ref();
        fs::write(path, self.to_json_string_pretty()?)
            .with_context(|| format!("unable to write '{}'", path.display()))?;
        Ok(())
    }

    /// Apply mode overrides and fill derived values.
    ///
    /// Call once before [validate_config](Self::validate_config).
    pub fn update_with_rng<R>(&mut self, rng: &mut R) -> ConfigResult
    where
        R: Rng,
    {
        if self.overfit_mode {
            let common = self.data.common_mut();
            let half = common.img_sz.get() / 2;
            common.img_sz = NonZeroUsize::new(half).unwrap_or(common.img_sz);
            if self.test_mode {
                self.solver.overfit_num_steps = self.solver.test_overfit_num_steps;
            }
        }

        if self.test_mode {
            self.solver.num_epochs = self.solver.test_num_epochs;
            self.solver.batch_sz = self.solver.test_batch_sz;
            self.data.common_mut().num_workers = 0;
        }

        self.model.update();
        self.solver.update();
        self.data.update(rng).map_err(|err| err.within("data"))?;
        Ok(())
    }

    /// [update_with_rng](Self::update_with_rng) with the thread-local generator.
    pub fn update(&mut self) -> ConfigResult {
        self.update_with_rng(&mut rand::thread_rng())
    }

    pub fn validate_config(&self) -> ConfigResult {
        ensure_config!(
            !self.run_tensorboard || self.log_tensorboard,
            "cannot run_tensorboard if log_tensorboard is false"
        );
        self.validate_class_loss_weights()?;

        self.model
            .validate_config()
            .map_err(|err| err.within("model"))?;
        self.solver
            .validate_config()
            .map_err(|err| err.within("solver"))?;
        self.data
            .validate_config()
            .map_err(|err| err.within("data"))?;
        Ok(())
    }

    pub fn validate_class_loss_weights(&self) -> ConfigResult {
        if let Some(weights) = &self.solver.class_loss_weights {
            let num_weights = weights.len();
            let num_classes = self.data.num_classes();
            ensure_config!(
                num_weights == num_classes,
                "class_loss_weights ({}) must be same length as the number of classes ({})",
                num_weights,
                num_classes
            );
        }
        Ok(())
    }

    /// The URI the model bundle is written to.
    pub fn get_model_bundle_uri(&self) -> Result<String> {
        let output_uri = self
            .output_uri
            .as_deref()
            .ok_or_else(|| format_err!("output_uri is not set"))?;
        Ok(join_uri(output_uri, MODEL_BUNDLE_NAME))
    }
}

fn default_version() -> u64 {
    CONFIG_VERSION
}

fn default_true() -> bool {
    true
}
