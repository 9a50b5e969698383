//! Declarative image transform pipelines.

use crate::{common::*, Proportion};

/// A serialized image transform.
///
/// The probability `p` is the chance that a random transform is applied to
/// a given sample.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum TransformConfig {
    /// Resize to a fixed height and width. Always applied.
    Resize {
        height: NonZeroUsize,
        width: NonZeroUsize,
    },
    /// Box blur with a random odd kernel size in `3..=blur_limit`.
    Blur {
        #[serde(default = "default_blur_limit")]
        blur_limit: usize,
        #[serde(default = "default_p")]
        p: Proportion,
    },
    /// Rotate by a random multiple of 90 degrees.
    RandomRotate90 {
        #[serde(default = "default_p")]
        p: Proportion,
    },
    HorizontalFlip {
        #[serde(default = "default_p")]
        p: Proportion,
    },
    VerticalFlip {
        #[serde(default = "default_p")]
        p: Proportion,
    },
    /// Gaussian blur with a random odd kernel size within `blur_limit`.
    GaussianBlur {
        #[serde(default = "default_gaussian_blur_limit")]
        blur_limit: (usize, usize),
        #[serde(default = "default_p")]
        p: Proportion,
    },
    /// Additive gaussian noise with a random variance within `var_limit`.
    GaussNoise {
        #[serde(default = "default_var_limit")]
        var_limit: (R64, R64),
        #[serde(default = "default_mean")]
        mean: R64,
        #[serde(default = "default_p")]
        p: Proportion,
    },
    /// Shift each of the first three channels by a random offset.
    RgbShift {
        #[serde(default = "default_shift_limit")]
        r_shift_limit: u8,
        #[serde(default = "default_shift_limit")]
        g_shift_limit: u8,
        #[serde(default = "default_shift_limit")]
        b_shift_limit: u8,
        #[serde(default = "default_p")]
        p: Proportion,
    },
    /// Replace the first three channels by their luminance.
    ToGray {
        #[serde(default = "default_p")]
        p: Proportion,
    },
    /// Rescale every channel linearly onto `[min_val, max_val]`.
    MinMaxNormalize {
        #[serde(default)]
        min_val: u8,
        #[serde(default = "default_max_val")]
        max_val: u8,
    },
    /// Apply the transforms in sequence.
    Compose { transforms: Vec<TransformConfig> },
}

impl TransformConfig {
    pub fn resize(size: NonZeroUsize) -> Self {
        Self::Resize {
            height: size,
            width: size,
        }
    }

    pub fn min_max_normalize() -> Self {
        Self::MinMaxNormalize {
            min_val: 0,
            max_val: default_max_val(),
        }
    }

    /// Structural checks that serde cannot express.
    pub fn validate_config(&self) -> ConfigResult {
        match self {
            Self::Blur { blur_limit, .. } => {
                ensure_config!(
                    *blur_limit >= 3,
                    "blur_limit must be at least 3, but get {}",
                    blur_limit
                );
            }
            Self::GaussianBlur {
                blur_limit: (min, max),
                ..
            } => {
                ensure_config!(
                    *min >= 3 && min <= max,
                    "blur_limit must be an ordered range starting from 3, but get ({}, {})",
                    min,
                    max
                );
            }
            Self::GaussNoise {
                var_limit: (min, max),
                ..
            } => {
                ensure_config!(
                    *min >= 0.0 && min <= max,
                    "var_limit must be a non-negative ordered range, but get ({}, {})",
                    min,
                    max
                );
            }
            Self::MinMaxNormalize { min_val, max_val } => {
                ensure_config!(
                    min_val < max_val,
                    "min_val must be less than max_val, but get ({}, {})",
                    min_val,
                    max_val
                );
            }
            Self::Compose { transforms } => {
                transforms
                    .iter()
                    .enumerate()
                    .try_for_each(|(index, transform)| {
                        transform
                            .validate_config()
                            .map_err(|err| err.within(&format!("transforms[{}]", index)))
                    })?;
            }
            _ => {}
        }
        Ok(())
    }
}

/// The catalog of augmentors that can be selected by name.
#[derive(
    Debug,
    Clone,
    Copy,
    PartialEq,
    Eq,
    Hash,
    AsRefStr,
    Display,
    EnumString,
    EnumIter,
    IntoStaticStr,
)]
pub enum Augmentor {
    Blur,
    RandomRotate90,
    HorizontalFlip,
    VerticalFlip,
    GaussianBlur,
    GaussNoise,
    #[strum(serialize = "RGBShift")]
    RgbShift,
    ToGray,
}

impl Augmentor {
    pub fn names() -> Vec<&'static str> {
        Self::iter().map(|augmentor| augmentor.into()).collect()
    }

    /// The transform with its default parameters.
    pub fn transform(&self) -> TransformConfig {
        let p = default_p();
        match self {
            Self::Blur => TransformConfig::Blur {
                blur_limit: default_blur_limit(),
                p,
            },
            Self::RandomRotate90 => TransformConfig::RandomRotate90 { p },
            Self::HorizontalFlip => TransformConfig::HorizontalFlip { p },
            Self::VerticalFlip => TransformConfig::VerticalFlip { p },
            Self::GaussianBlur => TransformConfig::GaussianBlur {
                blur_limit: default_gaussian_blur_limit(),
                p,
            },
            Self::GaussNoise => TransformConfig::GaussNoise {
                var_limit: default_var_limit(),
                mean: default_mean(),
                p,
            },
            Self::RgbShift => TransformConfig::RgbShift {
                r_shift_limit: default_shift_limit(),
                g_shift_limit: default_shift_limit(),
                b_shift_limit: default_shift_limit(),
                p,
            },
            Self::ToGray => TransformConfig::ToGray { p },
        }
    }
}

pub fn default_augmentors() -> Vec<String> {
    [
        Augmentor::RandomRotate90,
        Augmentor::HorizontalFlip,
        Augmentor::VerticalFlip,
    ]
    .iter()
    .map(|augmentor| augmentor.to_string())
    .collect()
}

fn default_p() -> Proportion {
    Proportion::new(0.5).unwrap()
}

fn default_blur_limit() -> usize {
    7
}

fn default_gaussian_blur_limit() -> (usize, usize) {
    (3, 7)
}

fn default_var_limit() -> (R64, R64) {
    (r64(10.0), r64(50.0))
}

fn default_mean() -> R64 {
    r64(0.0)
}

fn default_shift_limit() -> u8 {
    20
}

fn default_max_val() -> u8 {
    u8::MAX
}
