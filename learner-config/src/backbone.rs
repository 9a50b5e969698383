use crate::common::*;

/// The torchvision backbone architectures.
///
/// The declaration order is the historical numbering: the first variant is
/// id 1. Older configs stored that id instead of the name.
#[allow(non_camel_case_types)]
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    Serialize,
    Deserialize,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
pub enum Backbone {
    alexnet,
    densenet121,
    densenet169,
    densenet201,
    densenet161,
    googlenet,
    inception_v3,
    mnasnet0_5,
    mnasnet0_75,
    mnasnet1_0,
    mnasnet1_3,
    mobilenet_v2,
    resnet18,
    resnet34,
    resnet50,
    resnet101,
    resnet152,
    resnext50_32x4d,
    resnext101_32x8d,
    wide_resnet50_2,
    wide_resnet101_2,
    shufflenet_v2_x0_5,
    shufflenet_v2_x1_0,
    shufflenet_v2_x1_5,
    shufflenet_v2_x2_0,
    squeezenet1_0,
    squeezenet1_1,
    vgg11,
    vgg11_bn,
    vgg13,
    vgg13_bn,
    vgg16,
    vgg16_bn,
    vgg19_bn,
    vgg19,
}

pub const NUM_BACKBONES: usize = 35;

impl Backbone {
    /// Look up a backbone by its legacy 1-based id.
    pub fn from_index(index: usize) -> Result<Self> {
        index
            .checked_sub(1)
            .and_then(|index| Self::iter().nth(index))
            .ok_or_else(|| {
                format_err!(
                    "backbone id must be within 1..={}, but get {}",
                    NUM_BACKBONES,
                    index
                )
            })
    }

    /// The legacy 1-based id.
    pub fn index(&self) -> usize {
        Self::iter()
            .position(|backbone| backbone == *self)
            .map(|position| position + 1)
            .unwrap_or(0)
    }
}

impl Default for Backbone {
    fn default() -> Self {
        Self::resnet18
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn legacy_ids() {
        assert_eq!(Backbone::iter().count(), NUM_BACKBONES);
        assert_eq!(Backbone::from_index(1).unwrap(), Backbone::alexnet);
        assert_eq!(Backbone::from_index(13).unwrap(), Backbone::resnet18);
        assert_eq!(Backbone::from_index(34).unwrap(), Backbone::vgg19_bn);
        assert_eq!(Backbone::from_index(35).unwrap(), Backbone::vgg19);
        assert!(Backbone::from_index(0).is_err());
        assert!(Backbone::from_index(36).is_err());
        assert!(Backbone::iter().all(|backbone| Backbone::from_index(backbone.index()).unwrap() == backbone));
    }

    #[test]
    fn names() {
        assert_eq!(Backbone::resnext50_32x4d.as_ref(), "resnext50_32x4d");
        assert_eq!(
            "wide_resnet101_2".parse::<Backbone>().unwrap(),
            Backbone::wide_resnet101_2
        );
        assert_eq!(
            serde_json::to_string(&Backbone::mobilenet_v2).unwrap(),
            "\"mobilenet_v2\""
        );
    }
}
