use crate::{common::*, ExternalModuleConfig, ModuleLoader};

/// Config related to the solver, aka the optimizer.
#[derive(Debug, Clone, PartialEq, Derivative, Serialize, Deserialize)]
#[derivative(Default)]
#[serde(default)]
pub struct SolverConfig {
    /// Learning rate. Must be positive.
    #[derivative(Default(value = "r64(1e-4)"))]
    pub lr: R64,
    /// Number of sweeps through the whole training set.
    #[derivative(Default(value = "nonzero(10)"))]
    pub num_epochs: NonZeroUsize,
    /// Number of epochs in test mode.
    #[derivative(Default(value = "nonzero(2)"))]
    pub test_num_epochs: NonZeroUsize,
    /// Batch size in test mode.
    #[derivative(Default(value = "nonzero(4)"))]
    pub test_batch_sz: NonZeroUsize,
    /// Number of optimizer steps in overfit mode.
    #[derivative(Default(value = "nonzero(1)"))]
    pub overfit_num_steps: NonZeroUsize,
    /// Number of optimizer steps in overfit mode when test mode is also on.
    #[derivative(Default(value = "nonzero(1)"))]
    pub test_overfit_num_steps: NonZeroUsize,
    /// The interval in epochs between syncs to the output URI.
    #[derivative(Default(value = "nonzero(1)"))]
    pub sync_interval: NonZeroUsize,
    #[derivative(Default(value = "nonzero(32)"))]
    pub batch_sz: NonZeroUsize,
    /// Use a triangular LR schedule with a single cycle across all epochs,
    /// starting and ending at lr/10 and peaking at lr.
    #[derivative(Default(value = "true"))]
    pub one_cycle: bool,
    /// Epoch indices at which the LR is divided by 10.
    pub multi_stage: Vec<usize>,
    /// Class weights for weighted loss.
    pub class_loss_weights: Option<Vec<R64>>,
    pub ignore_last_class: IgnoreLastClass,
    /// If set, the loss is built from this external definition.
    pub external_loss_def: Option<ExternalModuleConfig>,
}

impl SolverConfig {
    pub fn update(&mut self) {}

    pub fn validate_config(&self) -> ConfigResult {
        ensure_config!(self.lr > 0.0, "lr must be positive, but get {}", self.lr);

        if let Some(external_loss_def) = &self.external_loss_def {
            ensure_config!(
                self.ignore_last_class != IgnoreLastClass::Yes,
                "ignore_last_class=true is not supported with external_loss_def, \
                 consider ignore_last_class='force' and making the external loss \
                 ignore the last index"
            );
            ensure_config!(
                self.class_loss_weights.is_none(),
                "class_loss_weights is not supported with external_loss_def"
            );
            external_loss_def
                .validate_config()
                .map_err(|err| err.within("external_loss_def"))?;
        }
        Ok(())
    }

    pub fn build_external_loss<L>(
        &self,
        save_dir: &Path,
        hubconf_dir: Option<&Path>,
        loader: &L,
        file_system: &dyn FileSystem,
    ) -> Result<L::Output>
    where
        L: ModuleLoader,
    {
        let external_loss_def = self
            .external_loss_def
            .as_ref()
            .ok_or_else(|| format_err!("external_loss_def is not set"))?;
        external_loss_def.build(save_dir, hubconf_dir, loader, file_system)
    }
}

/// Whether the last class is excluded from the loss.
///
/// `Force` keeps the request even when an external loss is used. Serialized
/// as `false`, `true` or `"force"`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(from = "IgnoreLastClassRepr", into = "IgnoreLastClassRepr")]
pub enum IgnoreLastClass {
    No,
    Yes,
    Force,
}

impl IgnoreLastClass {
    pub fn is_ignored(&self) -> bool {
        !matches!(self, Self::No)
    }
}

impl Default for IgnoreLastClass {
    fn default() -> Self {
        Self::No
    }
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(untagged)]
enum IgnoreLastClassRepr {
    Flag(bool),
    Literal(ForceLiteral),
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
enum ForceLiteral {
    #[serde(rename = "force")]
    Force,
}

impl From<IgnoreLastClassRepr> for IgnoreLastClass {
    fn from(repr: IgnoreLastClassRepr) -> Self {
        match repr {
            IgnoreLastClassRepr::Flag(false) => Self::No,
            IgnoreLastClassRepr::Flag(true) => Self::Yes,
            IgnoreLastClassRepr::Literal(ForceLiteral::Force) => Self::Force,
        }
    }
}

impl From<IgnoreLastClass> for IgnoreLastClassRepr {
    fn from(value: IgnoreLastClass) -> Self {
        match value {
            IgnoreLastClass::No => Self::Flag(false),
            IgnoreLastClass::Yes => Self::Flag(true),
            IgnoreLastClass::Force => Self::Literal(ForceLiteral::Force),
        }
    }
}

/// Per-step learning rates derived from a [SolverConfig].
#[derive(Debug, Clone)]
pub struct LrScheduler {
    base_lr: f64,
    steps_per_epoch: usize,
    total_steps: usize,
    one_cycle: bool,
    multi_stage: Vec<usize>,
    step: usize,
}

impl LrScheduler {
    pub fn new(
        config: &SolverConfig,
        steps_per_epoch: usize,
        init_step: impl Into<Option<usize>>,
    ) -> Result<Self> {
        ensure!(config.lr > 0.0, "the lr must be positive");
        ensure!(steps_per_epoch > 0, "steps_per_epoch must be positive");

        let mut multi_stage = config.multi_stage.clone();
        multi_stage.sort_unstable();

        Ok(Self {
            base_lr: config.lr.raw(),
            steps_per_epoch,
            total_steps: config.num_epochs.get() * steps_per_epoch,
            one_cycle: config.one_cycle,
            multi_stage,
            step: init_step.into().unwrap_or(0),
        })
    }

    pub fn set_step(&mut self, step: usize) {
        self.step = step;
    }

    pub fn step(&self) -> usize {
        self.step
    }

    /// The learning rate at the current step.
    pub fn lr(&self) -> f64 {
        self.lr_at_step(self.step)
    }

    /// Return the current learning rate and advance by one step.
    pub fn next(&mut self) -> f64 {
        let lr = self.lr();
        self.step += 1;
        lr
    }

    pub fn lr_at(&self, epoch: usize, step_in_epoch: usize) -> f64 {
        self.lr_at_step(epoch * self.steps_per_epoch + step_in_epoch)
    }

    fn lr_at_step(&self, step: usize) -> f64 {
        let lr = if self.one_cycle {
            let min_lr = self.base_lr / 10.0;
            let step_size_up = (self.total_steps / 2).max(1);
            let cycle_pos = step.min(self.total_steps);
            let scale = if cycle_pos <= step_size_up {
                cycle_pos as f64 / step_size_up as f64
            } else {
                let step_size_down = (self.total_steps - step_size_up).max(1);
                1.0 - (cycle_pos - step_size_up) as f64 / step_size_down as f64
            };
            min_lr + (self.base_lr - min_lr) * scale.clamp(0.0, 1.0)
        } else {
            self.base_lr
        };

        let epoch = step / self.steps_per_epoch;
        let num_decays = self
            .multi_stage
            .iter()
            .take_while(|&&milestone| milestone <= epoch)
            .count();
        lr * 0.1f64.powi(num_decays as i32)
    }
}

fn nonzero(value: usize) -> NonZeroUsize {
    NonZeroUsize::new(value).unwrap()
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn ignore_last_class_serde() {
        let parse = |text: &str| serde_json::from_str::<IgnoreLastClass>(text);
        assert_eq!(parse("false").unwrap(), IgnoreLastClass::No);
        assert_eq!(parse("true").unwrap(), IgnoreLastClass::Yes);
        assert_eq!(parse("\"force\"").unwrap(), IgnoreLastClass::Force);
        assert!(parse("\"always\"").is_err());
        assert_eq!(
            serde_json::to_string(&IgnoreLastClass::Force).unwrap(),
            "\"force\""
        );
    }

    #[test]
    fn solver_defaults() {
        let config: SolverConfig = serde_json::from_str("{}").unwrap();
        assert_eq!(config, SolverConfig::default());
        assert_abs_diff_eq!(config.lr.raw(), 1e-4);
        assert_eq!(config.num_epochs.get(), 10);
        assert_eq!(config.batch_sz.get(), 32);
        assert!(config.one_cycle);
        assert!(config.validate_config().is_ok());

        assert!(serde_json::from_str::<SolverConfig>(r#"{"batch_sz": 0}"#).is_err());
        let config = SolverConfig {
            lr: r64(0.0),
            ..Default::default()
        };
        assert!(config.validate_config().is_err());
    }

    #[test]
    fn one_cycle_schedule() {
        let config = SolverConfig {
            lr: r64(1.0),
            num_epochs: nonzero(2),
            ..Default::default()
        };
        let scheduler = LrScheduler::new(&config, 5, None).unwrap();
        assert_abs_diff_eq!(scheduler.lr_at(0, 0), 0.1);
        assert_abs_diff_eq!(scheduler.lr_at(1, 0), 1.0);
        assert_abs_diff_eq!(scheduler.lr_at(2, 0), 0.1);
        assert!(scheduler.lr_at(0, 3) < scheduler.lr_at(0, 4));
        assert!(scheduler.lr_at(1, 2) > scheduler.lr_at(1, 3));
    }

    #[test]
    fn multi_stage_schedule() {
        let config = SolverConfig {
            lr: r64(1.0),
            num_epochs: nonzero(6),
            one_cycle: false,
            multi_stage: vec![4, 2],
            ..Default::default()
        };
        let mut scheduler = LrScheduler::new(&config, 3, None).unwrap();
        assert_abs_diff_eq!(scheduler.lr_at(1, 2), 1.0);
        assert_abs_diff_eq!(scheduler.lr_at(2, 0), 0.1);
        assert_abs_diff_eq!(scheduler.lr_at(5, 1), 0.01, epsilon = 1e-12);

        scheduler.set_step(6);
        assert_abs_diff_eq!(scheduler.next(), 0.1);
        assert_eq!(scheduler.step(), 7);
    }
}
