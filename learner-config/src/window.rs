use crate::common::*;

/// How windows are drawn from a scene.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, AsRefStr, Display, EnumString,
)]
#[serde(rename_all = "snake_case")]
#[strum(serialize_all = "snake_case")]
pub enum GeoDataWindowMethod {
    Sliding,
    Random,
}

impl Default for GeoDataWindowMethod {
    fn default() -> Self {
        Self::Sliding
    }
}

/// A side length, or a (height, width) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Size {
    Square(NonZeroUsize),
    Rect(NonZeroUsize, NonZeroUsize),
}

impl Size {
    pub fn hw(&self) -> (usize, usize) {
        match *self {
            Self::Square(size) => (size.get(), size.get()),
            Self::Rect(h, w) => (h.get(), w.get()),
        }
    }
}

impl From<NonZeroUsize> for Size {
    fn from(size: NonZeroUsize) -> Self {
        Self::Square(size)
    }
}

/// A padding on both axes, or a (height, width) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Padding {
    Uniform(usize),
    Rect(usize, usize),
}

impl Padding {
    pub fn hw(&self) -> (usize, usize) {
        match *self {
            Self::Uniform(padding) => (padding, padding),
            Self::Rect(h, w) => (h, w),
        }
    }
}

/// A range of window lengths to sample from.
pub type Lims = (NonZeroUsize, NonZeroUsize);

/// Configures how windows are read from geospatial scenes.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoDataWindowConfig {
    #[serde(default)]
    pub method: GeoDataWindowMethod,
    /// The sliding window size, or, for random windows, the size every
    /// window is resized to.
    pub size: Size,
    /// Stride of the sliding window.
    #[serde(default)]
    pub stride: Option<Size>,
    /// How many pixels windows may overflow the edges of the raster.
    #[serde(default)]
    pub padding: Option<Padding>,
    /// `[min, max)` interval window sizes are sampled from.
    #[serde(default)]
    pub size_lims: Option<Lims>,
    /// `[min, max]` interval window heights are sampled from.
    #[serde(default)]
    pub h_lims: Option<Lims>,
    /// `[min, max]` interval window widths are sampled from.
    #[serde(default)]
    pub w_lims: Option<Lims>,
    /// Max reads from a random window dataset.
    #[serde(default = "default_max_windows")]
    pub max_windows: usize,
    /// Max attempts to find a window inside the AOI of a scene.
    #[serde(default = "default_max_sample_attempts")]
    pub max_sample_attempts: NonZeroUsize,
    /// Sample window positions within the AOI only, instead of rejecting
    /// windows drawn anywhere in the extent.
    #[serde(default = "default_efficient_aoi_sampling")]
    pub efficient_aoi_sampling: bool,
}

impl GeoDataWindowConfig {
    pub fn sliding(size: NonZeroUsize, stride: NonZeroUsize) -> Self {
        Self {
            stride: Some(Size::Square(stride)),
            ..Self::new(GeoDataWindowMethod::Sliding, size)
        }
    }

    pub fn random(size: NonZeroUsize) -> Self {
        Self::new(GeoDataWindowMethod::Random, size)
    }

    fn new(method: GeoDataWindowMethod, size: NonZeroUsize) -> Self {
        Self {
            method,
            size: Size::Square(size),
            stride: None,
            padding: None,
            size_lims: None,
            h_lims: None,
            w_lims: None,
            max_windows: default_max_windows(),
            max_sample_attempts: default_max_sample_attempts(),
            efficient_aoi_sampling: default_efficient_aoi_sampling(),
        }
    }

    /// Fill in a degenerate sampling range for random windows that have none.
    pub fn update(&mut self) {
        if self.method != GeoDataWindowMethod::Random
            || self.size_lims.is_some()
            || self.h_lims.is_some()
        {
            return;
        }

        match self.size {
            Size::Square(size) => {
                self.size_lims = Some((size, size.saturating_add(1)));
            }
            Size::Rect(h, w) => {
                self.h_lims = Some((h, h));
                self.w_lims = Some((w, w));
            }
        }
    }

    /// Check the form this config takes after [update](Self::update).
    pub fn validate_config(&self) -> ConfigResult {
        let mut updated = self.clone();
        updated.update();

        match updated.method {
            GeoDataWindowMethod::Sliding => {
                ensure_config!(
                    updated.stride.is_some(),
                    "stride must be specified if using the sliding method"
                );
            }
            GeoDataWindowMethod::Random => {
                let has_size_lims = updated.size_lims.is_some();
                let has_h_lims = updated.h_lims.is_some();
                let has_w_lims = updated.w_lims.is_some();
                ensure_config!(
                    has_size_lims != (has_h_lims || has_w_lims),
                    "specify either size_lims or h_lims and w_lims"
                );
                ensure_config!(
                    has_h_lims == has_w_lims,
                    "h_lims and w_lims must both be specified"
                );
                if let Some((min, max)) = updated.size_lims {
                    ensure_config!(
                        min < max,
                        "size_lims must be a non-empty [min, max) range, but get ({}, {})",
                        min,
                        max
                    );
                }
                for (name, lims) in [("h_lims", updated.h_lims), ("w_lims", updated.w_lims)] {
                    if let Some((min, max)) = lims {
                        ensure_config!(
                            min <= max,
                            "{} must be an ordered [min, max] range, but get ({}, {})",
                            name,
                            min,
                            max
                        );
                    }
                }
            }
        }
        Ok(())
    }

    pub fn size_hw(&self) -> (usize, usize) {
        self.size.hw()
    }

    pub fn stride_hw(&self) -> Option<(usize, usize)> {
        self.stride.map(|stride| stride.hw())
    }

    pub fn padding_hw(&self) -> Option<(usize, usize)> {
        self.padding.map(|padding| padding.hw())
    }
}

fn default_max_windows() -> usize {
    10_000
}

fn default_max_sample_attempts() -> NonZeroUsize {
    NonZeroUsize::new(100).unwrap()
}

fn default_efficient_aoi_sampling() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    fn nz(value: usize) -> NonZeroUsize {
        NonZeroUsize::new(value).unwrap()
    }

    #[test]
    fn window_config_from_json() {
        let config: GeoDataWindowConfig =
            serde_json::from_str(r#"{"size": [100, 200], "stride": 50, "padding": 10}"#).unwrap();
        assert_eq!(config.method, GeoDataWindowMethod::Sliding);
        assert_eq!(config.size_hw(), (100, 200));
        assert_eq!(config.stride_hw(), Some((50, 50)));
        assert_eq!(config.padding_hw(), Some((10, 10)));
        assert_eq!(config.max_windows, 10_000);
        assert_eq!(config.max_sample_attempts.get(), 100);
        assert!(config.efficient_aoi_sampling);
        assert!(config.validate_config().is_ok());
    }

    #[test]
    fn rectangular_random_size_gets_hw_lims() {
        let mut config = GeoDataWindowConfig {
            size: Size::Rect(nz(64), nz(32)),
            ..GeoDataWindowConfig::random(nz(1))
        };
        config.update();
        assert_eq!(config.size_lims, None);
        assert_eq!(config.h_lims, Some((nz(64), nz(64))));
        assert_eq!(config.w_lims, Some((nz(32), nz(32))));
        assert!(config.validate_config().is_ok());
    }

    #[test]
    fn random_lims_are_exclusive() {
        let config = GeoDataWindowConfig {
            size_lims: Some((nz(10), nz(20))),
            h_lims: Some((nz(10), nz(20))),
            w_lims: Some((nz(10), nz(20))),
            ..GeoDataWindowConfig::random(nz(16))
        };
        assert!(config.validate_config().is_err());

        let config = GeoDataWindowConfig {
            h_lims: Some((nz(10), nz(20))),
            ..GeoDataWindowConfig::random(nz(16))
        };
        assert!(config.validate_config().is_err());

        let config = GeoDataWindowConfig {
            size_lims: Some((nz(20), nz(20))),
            ..GeoDataWindowConfig::random(nz(16))
        };
        assert!(config.validate_config().is_err());
    }
}
