//! Classification backbones from `tch::vision`.

use crate::common::*;
use learner_config::{Backbone, ModelBuilder, ModelConfig};
use tch::{nn, vision, Device};

/// A classification network with the variables it owns.
pub struct TchModel {
    pub vs: nn::VarStore,
    pub net: Box<dyn nn::ModuleT>,
}

impl Debug for TchModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TchModel")
            .field("device", &self.vs.device())
            .field("net", &self.net)
            .finish()
    }
}

/// Builds the backbones available in `tch::vision`.
#[derive(Debug, Clone)]
pub struct TchBackboneBuilder {
    pub device: Device,
    pub file_system: Arc<dyn FileSystem>,
    /// Where remote initial weights are downloaded to.
    pub download_dir: PathBuf,
}

impl ModelBuilder for TchBackboneBuilder {
    type Model = TchModel;

    fn build_default_model(
        &self,
        config: &ModelConfig,
        num_classes: usize,
        in_channels: usize,
    ) -> Result<TchModel> {
        ensure!(
            in_channels == 3,
            "the {} backbone takes 3 input channels, but get {}",
            config.backbone,
            in_channels
        );

        info!("initializing {} model", config.backbone);
        let mut vs = nn::VarStore::new(self.device);
        let root = vs.root();
        let n = num_classes as i64;

        use Backbone as B;
        let net: Box<dyn nn::ModuleT> = match config.backbone {
            B::resnet18 => Box::new(vision::resnet::resnet18(&root, n)),
            B::resnet34 => Box::new(vision::resnet::resnet34(&root, n)),
            B::resnet50 => Box::new(vision::resnet::resnet50(&root, n)),
            B::resnet101 => Box::new(vision::resnet::resnet101(&root, n)),
            B::resnet152 => Box::new(vision::resnet::resnet152(&root, n)),
            B::densenet121 => Box::new(vision::densenet::densenet121(&root, n)),
            B::densenet161 => Box::new(vision::densenet::densenet161(&root, n)),
            B::densenet169 => Box::new(vision::densenet::densenet169(&root, n)),
            B::densenet201 => Box::new(vision::densenet::densenet201(&root, n)),
            B::vgg11 => Box::new(vision::vgg::vgg11(&root, n)),
            B::vgg11_bn => Box::new(vision::vgg::vgg11_bn(&root, n)),
            B::vgg13 => Box::new(vision::vgg::vgg13(&root, n)),
            B::vgg13_bn => Box::new(vision::vgg::vgg13_bn(&root, n)),
            B::vgg16 => Box::new(vision::vgg::vgg16(&root, n)),
            B::vgg16_bn => Box::new(vision::vgg::vgg16_bn(&root, n)),
            B::vgg19 => Box::new(vision::vgg::vgg19(&root, n)),
            B::vgg19_bn => Box::new(vision::vgg::vgg19_bn(&root, n)),
            B::squeezenet1_0 => Box::new(vision::squeezenet::v1_0(&root, n)),
            B::squeezenet1_1 => Box::new(vision::squeezenet::v1_1(&root, n)),
            B::alexnet => Box::new(vision::alexnet::alexnet(&root, n)),
            B::mobilenet_v2 => Box::new(vision::mobilenet::v2(&root, n)),
            B::inception_v3 => Box::new(vision::inception::v3(&root, n)),
            other => bail!("the {} backbone is not available", other),
        };

        match &config.init_weights {
            Some(uri) => {
                let path = self.file_system.download_if_needed(uri, &self.download_dir)?;
                if config.load_strict {
                    vs.load(&path)?;
                } else {
                    let missing = vs.load_partial(&path)?;
                    if !missing.is_empty() {
                        warn!("variables missing in '{}': {}", uri, missing.join(", "));
                    }
                }
            }
            None if config.pretrained => {
                warn!("pretrained weights are not bundled, set init_weights to load them")
            }
            None => {}
        }

        Ok(TchModel { vs, net })
    }
}
