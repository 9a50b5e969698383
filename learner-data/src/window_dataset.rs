//! Datasets of windows read from a scene.

use crate::{
    common::*,
    dataset::{with_transform, BoxedDataset, DataRecord, RandomAccessDataset},
    scene::Scene,
    transform::resize,
};
use learner_config::{GeoDataWindowConfig, GeoDataWindowMethod};

/// Builds the dataset of one scene.
pub trait SceneToDataset
where
    Self: Debug + Send + Sync,
{
    fn scene_to_dataset(
        &self,
        scene: Arc<Scene>,
        opts: &GeoDataWindowConfig,
        transform: Option<&TransformConfig>,
    ) -> Result<BoxedDataset>;
}

/// Reads sliding or random windows as the window options ask, labeled by
/// the scene's ground truth.
#[derive(Debug, Clone, Default)]
pub struct WindowDatasetBuilder {
    /// Makes random windows and transforms reproducible.
    pub seed: Option<u64>,
}

impl SceneToDataset for WindowDatasetBuilder {
    fn scene_to_dataset(
        &self,
        scene: Arc<Scene>,
        opts: &GeoDataWindowConfig,
        transform: Option<&TransformConfig>,
    ) -> Result<BoxedDataset> {
        let dataset: BoxedDataset = match opts.method {
            GeoDataWindowMethod::Sliding => Arc::new(SlidingWindowDataset::new(scene, opts)?),
            GeoDataWindowMethod::Random => {
                let dataset = RandomWindowDataset::new(scene, opts)?;
                let dataset = match self.seed {
                    Some(seed) => dataset.with_seed(seed),
                    None => dataset,
                };
                Arc::new(dataset)
            }
        };
        with_transform(dataset, transform)
    }
}

/// Windows tiling the scene extent with a fixed stride, restricted to the AOI.
#[derive(Debug, Clone)]
pub struct SlidingWindowDataset {
    scene: Arc<Scene>,
    windows: Vec<PixelBox>,
}

impl SlidingWindowDataset {
    pub fn new(scene: Arc<Scene>, opts: &GeoDataWindowConfig) -> Result<Self> {
        let stride = opts
            .stride_hw()
            .ok_or_else(|| format_err!("stride must be specified for sliding windows"))?;
        let windows: Vec<_> = scene
            .extent()
            .get_windows(opts.size_hw(), stride, opts.padding_hw())?
            .into_iter()
            .filter(|window| scene.is_in_aoi(window))
            .collect();
        debug!(
            "scene '{}' has {} sliding windows",
            scene.id,
            windows.len()
        );
        Ok(Self { scene, windows })
    }

    pub fn windows(&self) -> &[PixelBox] {
        &self.windows
    }
}

impl RandomAccessDataset for SlidingWindowDataset {
    fn num_records(&self) -> usize {
        self.windows.len()
    }

    fn nth(&self, index: usize) -> Result<DataRecord> {
        let window = self
            .windows
            .get(index)
            .ok_or_else(|| format_err!("index {} is out of range", index))?;
        read_window(&self.scene, window)
    }
}

/// Randomly placed windows of random sizes, each resized to the window size.
#[derive(Debug, Clone)]
pub struct RandomWindowDataset {
    scene: Arc<Scene>,
    opts: GeoDataWindowConfig,
    seed: Option<u64>,
}

impl RandomWindowDataset {
    pub fn new(scene: Arc<Scene>, opts: &GeoDataWindowConfig) -> Result<Self> {
        let mut opts = opts.clone();
        opts.update();
        opts.validate_config()?;
        ensure!(
            opts.size_lims.is_some() || (opts.h_lims.is_some() && opts.w_lims.is_some()),
            "random windows need size_lims, or h_lims and w_lims"
        );
        Ok(Self {
            scene,
            opts,
            seed: None,
        })
    }

    /// Draw the nth window from a generator seeded by `seed` and `n`.
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..self
        }
    }

    /// Draw a (height, width) within the size limits.
    fn sample_size<R>(&self, rng: &mut R) -> (usize, usize)
    where
        R: Rng,
    {
        match (self.opts.size_lims, self.opts.h_lims, self.opts.w_lims) {
            (Some((min, max)), _, _) => {
                let size = rng.gen_range(min.get()..max.get().max(min.get() + 1));
                (size, size)
            }
            (None, Some((h_min, h_max)), Some((w_min, w_max))) => (
                rng.gen_range(h_min.get()..=h_max.get().max(h_min.get())),
                rng.gen_range(w_min.get()..=w_max.get().max(w_min.get())),
            ),
            _ => self.opts.size_hw(),
        }
    }

    /// Draw a window of the size whose top-left corner lies in `region`,
    /// allowing it to overflow the far edges by the padding.
    fn sample_in<R>(
        region: &PixelBox,
        (height, width): (usize, usize),
        padding: (usize, usize),
        rng: &mut R,
    ) -> PixelBox
    where
        R: Rng,
    {
        let (pad_h, pad_w) = padding;
        let ymax = (region.ymax() + pad_h as i64 - height as i64).max(region.ymin());
        let xmax = (region.xmax() + pad_w as i64 - width as i64).max(region.xmin());
        let ymin = rng.gen_range(region.ymin()..=ymax);
        let xmin = rng.gen_range(region.xmin()..=xmax);
        PixelBox::from_hw(height, width).shift(ymin, xmin)
    }

    /// Draw a window inside the AOI of the scene.
    pub fn sample_window<R>(&self, rng: &mut R) -> Result<PixelBox>
    where
        R: Rng,
    {
        let size = self.sample_size(rng);
        let padding = self.opts.padding_hw().unwrap_or((0, 0));
        let extent = self.scene.extent();
        let polygons = &self.scene.aoi_polygons;

        if polygons.is_empty() {
            return Ok(Self::sample_in(&extent, size, padding, rng));
        }

        for _ in 0..self.opts.max_sample_attempts.get() {
            let window = if self.opts.efficient_aoi_sampling {
                let polygon = polygons
                    .choose_weighted(rng, |polygon| polygon.area())
                    .ok()
                    .or_else(|| polygons.first())
                    .ok_or_else(|| format_err!("the scene has no AOI polygons"))?;
                Self::sample_in(&polygon.bounds(), size, (0, 0), rng)
            } else {
                Self::sample_in(&extent, size, padding, rng)
            };
            if self.scene.is_in_aoi(&window) {
                return Ok(window);
            }
        }

        bail!(
            "no window of size {:?} inside the AOI of scene '{}' is found after {} attempts",
            size,
            self.scene.id,
            self.opts.max_sample_attempts
        )
    }
}

impl RandomAccessDataset for RandomWindowDataset {
    fn num_records(&self) -> usize {
        self.opts.max_windows
    }

    fn nth(&self, index: usize) -> Result<DataRecord> {
        ensure!(
            index < self.opts.max_windows,
            "index {} is out of range for {} windows",
            index,
            self.opts.max_windows
        );
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
            None => StdRng::from_rng(rand::thread_rng())?,
        };
        let window = self.sample_window(&mut rng)?;
        let DataRecord { chip, class_id } = read_window(&self.scene, &window)?;
        let (height, width) = self.opts.size_hw();
        Ok(DataRecord {
            chip: resize(&chip, height, width)?,
            class_id,
        })
    }
}

fn read_window(scene: &Scene, window: &PixelBox) -> Result<DataRecord> {
    Ok(DataRecord {
        chip: scene.raster_source.get_chip(window)?,
        class_id: scene.class_for_window(window)?,
    })
}
