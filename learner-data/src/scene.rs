//! Scenes: a raster with its labels and areas of interest.

use crate::{common::*, image_dir::load_chip};
use learner_config::{ClassConfig, SceneConfig};
use ndarray::concatenate;

/// A source of pixels addressed by windows in pixel coordinates.
pub trait RasterSource
where
    Self: Debug + Send + Sync,
{
    /// The box covering every pixel of the raster.
    fn extent(&self) -> PixelBox;

    fn num_channels(&self) -> usize;

    /// Read the pixels under the window as a (height, width, channel) array.
    ///
    /// Pixels outside the extent read as zero.
    fn get_chip(&self, window: &PixelBox) -> Result<Array3<u8>>;

    fn get_image_array(&self) -> Result<Array3<u8>> {
        self.get_chip(&self.extent())
    }
}

/// A raster held in memory, decoded from image files.
#[derive(Debug, Clone)]
pub struct ImageRasterSource {
    image: Array3<u8>,
}

impl ImageRasterSource {
    /// Wrap an image array, keeping the channels in `channel_order` if given.
    pub fn new(image: Array3<u8>, channel_order: Option<&[usize]>) -> Result<Self> {
        let image = match channel_order {
            Some(order) => {
                let num_channels = image.dim().2;
                if let Some(&channel) = order.iter().find(|&&channel| channel >= num_channels) {
                    bail!(
                        "channel_order refers to channel {}, but the raster has {} channels",
                        channel,
                        num_channels
                    );
                }
                image.select(Axis(2), order)
            }
            None => image,
        };
        Ok(Self { image })
    }

    /// Read the images at the URIs and stack their channels in order.
    pub fn from_uris(
        uris: &[String],
        channel_order: Option<&[usize]>,
        file_system: &dyn FileSystem,
        tmp_dir: &Path,
    ) -> Result<Self> {
        ensure!(!uris.is_empty(), "a raster source needs at least one URI");
        let images: Vec<Array3<u8>> = uris
            .iter()
            .map(|uri| -> Result<_> {
                let path = file_system.download_if_needed(uri, tmp_dir)?;
                load_chip(&path)
            })
            .collect::<Result<_>>()?;

        let (height, width, _) = images[0].dim();
        if let Some((uri, image)) = uris
            .iter()
            .zip(&images)
            .find(|(_, image)| (image.dim().0, image.dim().1) != (height, width))
        {
            bail!(
                "'{}' is {}x{}, but the raster is {}x{}",
                uri,
                image.dim().0,
                image.dim().1,
                height,
                width
            );
        }
        let views: Vec<_> = images.iter().map(|image| image.view()).collect();
        let image = concatenate(Axis(2), &views)?;
        Self::new(image, channel_order)
    }
}

impl RasterSource for ImageRasterSource {
    fn extent(&self) -> PixelBox {
        let (height, width, _) = self.image.dim();
        PixelBox::from_hw(height, width)
    }

    fn num_channels(&self) -> usize {
        self.image.dim().2
    }

    fn get_chip(&self, window: &PixelBox) -> Result<Array3<u8>> {
        let mut chip = Array3::zeros((window.height(), window.width(), self.num_channels()));
        if let Some(overlap) = window.intersection(&self.extent()) {
            if !overlap.is_empty() {
                let source = self.image.slice(s![
                    overlap.ymin() as usize..overlap.ymax() as usize,
                    overlap.xmin() as usize..overlap.xmax() as usize,
                    ..
                ]);
                let top = (overlap.ymin() - window.ymin()) as usize;
                let left = (overlap.xmin() - window.xmin()) as usize;
                chip.slice_mut(s![
                    top..top + overlap.height(),
                    left..left + overlap.width(),
                    ..
                ])
                .assign(&source);
            }
        }
        Ok(chip)
    }
}

/// A labeled cell as it is stored in label files.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LabeledCell {
    #[serde(rename = "box")]
    pub cell: PixelBox,
    pub class_id: usize,
}

/// Class ids assigned to cells of a scene, in insertion order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "Vec<LabeledCell>", into = "Vec<LabeledCell>")]
pub struct ClassificationLabels {
    cells: IndexMap<PixelBox, usize>,
}

impl ClassificationLabels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = LabeledCell> + '_ {
        self.cells.iter().map(|(&cell, &class_id)| LabeledCell { cell, class_id })
    }

    /// Assign the class to the cell, replacing the previous assignment.
    pub fn set_cell(&mut self, cell: PixelBox, class_id: usize) {
        self.cells.insert(cell, class_id);
    }

    pub fn get_cell_class_id(&self, cell: &PixelBox) -> Option<usize> {
        self.cells.get(cell).copied()
    }

    /// The labels of cells overlapping the window.
    pub fn get_labels(&self, window: &PixelBox) -> Self {
        let cells = self
            .cells
            .iter()
            .filter(|(cell, _)| {
                cell.intersection(window)
                    .map_or(false, |overlap| !overlap.is_empty())
            })
            .map(|(&cell, &class_id)| (cell, class_id))
            .collect();
        Self { cells }
    }

    /// The class of the cell overlapping the window the most.
    pub fn class_for_window(&self, window: &PixelBox) -> Option<usize> {
        self.cells
            .iter()
            .filter_map(|(cell, &class_id)| {
                let area = cell.intersection(window)?.area();
                (area > 0).then(|| (area, class_id))
            })
            .max_by_key(|&(area, _)| area)
            .map(|(_, class_id)| class_id)
    }

    pub fn extend(&mut self, other: &ClassificationLabels) {
        self.cells.extend(other.cells.iter().map(|(&cell, &class_id)| (cell, class_id)));
    }
}

impl From<Vec<LabeledCell>> for ClassificationLabels {
    fn from(from: Vec<LabeledCell>) -> Self {
        from.into_iter()
            .map(|LabeledCell { cell, class_id }| (cell, class_id))
            .collect()
    }
}

impl From<ClassificationLabels> for Vec<LabeledCell> {
    fn from(from: ClassificationLabels) -> Self {
        from.iter().collect()
    }
}

impl FromIterator<(PixelBox, usize)> for ClassificationLabels {
    fn from_iter<I>(iter: I) -> Self
    where
        I: IntoIterator<Item = (PixelBox, usize)>,
    {
        Self {
            cells: iter.into_iter().collect(),
        }
    }
}

/// Ground-truth labels of a scene.
pub trait LabelSource
where
    Self: Debug + Send + Sync,
{
    /// The labels within the window, or all labels.
    fn get_labels(&self, window: Option<&PixelBox>) -> Result<ClassificationLabels>;
}

/// Labels read from a JSON file of labeled cells.
#[derive(Debug, Clone)]
pub struct JsonLabelSource {
    labels: ClassificationLabels,
}

impl JsonLabelSource {
    pub fn new(labels: ClassificationLabels) -> Self {
        Self { labels }
    }

    pub fn from_uri(
        uri: &str,
        class_config: &ClassConfig,
        file_system: &dyn FileSystem,
        tmp_dir: &Path,
    ) -> Result<Self> {
        let path = file_system.download_if_needed(uri, tmp_dir)?;
        let labels = read_labels(&path)?;
        if let Some(labeled) = labels
            .iter()
            .find(|labeled| labeled.class_id >= class_config.len())
        {
            bail!(
                "'{}' labels {} with class {}, but there are {} classes",
                uri,
                labeled.cell,
                labeled.class_id,
                class_config.len()
            );
        }
        Ok(Self { labels })
    }
}

impl LabelSource for JsonLabelSource {
    fn get_labels(&self, window: Option<&PixelBox>) -> Result<ClassificationLabels> {
        Ok(match window {
            Some(window) => self.labels.get_labels(window),
            None => self.labels.clone(),
        })
    }
}

/// Storage of predicted labels.
pub trait LabelStore
where
    Self: Debug + Send + Sync,
{
    fn get_labels(&self) -> Result<ClassificationLabels>;

    fn save(&self, labels: &ClassificationLabels) -> Result<()>;
}

/// Labels stored as a JSON file at a URI.
#[derive(Debug, Clone)]
pub struct JsonLabelStore {
    uri: String,
    file_system: Arc<dyn FileSystem>,
    tmp_dir: PathBuf,
}

impl JsonLabelStore {
    pub fn new(uri: impl Into<String>, file_system: Arc<dyn FileSystem>, tmp_dir: &Path) -> Self {
        Self {
            uri: uri.into(),
            file_system,
            tmp_dir: tmp_dir.to_owned(),
        }
    }

    pub fn uri(&self) -> &str {
        &self.uri
    }
}

impl LabelStore for JsonLabelStore {
    /// The saved labels, or no labels if nothing was saved yet.
    fn get_labels(&self) -> Result<ClassificationLabels> {
        if !self.file_system.file_exists(&self.uri, false)? {
            return Ok(ClassificationLabels::new());
        }
        let path = self.file_system.download_if_needed(&self.uri, &self.tmp_dir)?;
        read_labels(&path)
    }

    fn save(&self, labels: &ClassificationLabels) -> Result<()> {
        fs::create_dir_all(&self.tmp_dir)?;
        let path = self.tmp_dir.join(uri_fs::uri_basename(&self.uri));
        fs::write(&path, serde_json::to_string(labels)?)?;
        self.file_system.upload_if_needed(&path, &self.uri)?;
        info!("saved {} labels to {}", labels.len(), self.uri);
        Ok(())
    }
}

fn read_labels(path: &Path) -> Result<ClassificationLabels> {
    let text = fs::read_to_string(path)
        .with_context(|| format!("unable to read '{}'", path.display()))?;
    let labels = serde_json::from_str(&text)
        .with_context(|| format!("unable to parse labels in '{}'", path.display()))?;
    Ok(labels)
}

/// A raster with its ground truth, prediction store and areas of interest.
#[derive(Debug, Clone)]
pub struct Scene {
    pub id: String,
    pub raster_source: Arc<dyn RasterSource>,
    pub ground_truth: Option<Arc<dyn LabelSource>>,
    pub prediction_store: Option<Arc<dyn LabelStore>>,
    /// Windows are drawn inside these polygons only, or anywhere if empty.
    pub aoi_polygons: Vec<Polygon>,
}

impl Scene {
    pub fn new(id: impl Into<String>, raster_source: Arc<dyn RasterSource>) -> Self {
        Self {
            id: id.into(),
            raster_source,
            ground_truth: None,
            prediction_store: None,
            aoi_polygons: vec![],
        }
    }

    pub fn extent(&self) -> PixelBox {
        self.raster_source.extent()
    }

    /// Whether the window lies entirely inside one of the AOI polygons.
    pub fn is_in_aoi(&self, window: &PixelBox) -> bool {
        self.aoi_polygons.is_empty()
            || self
                .aoi_polygons
                .iter()
                .any(|polygon| polygon.contains_box(window))
    }

    /// The ground-truth class of the window.
    pub fn class_for_window(&self, window: &PixelBox) -> Result<Option<usize>> {
        Ok(match &self.ground_truth {
            Some(source) => source.get_labels(Some(window))?.class_for_window(window),
            None => None,
        })
    }
}

/// Builds runtime scenes from scene configs.
pub trait SceneBuilder
where
    Self: Debug + Send + Sync,
{
    fn build_scene(
        &self,
        config: &SceneConfig,
        class_config: &ClassConfig,
        tmp_dir: &Path,
    ) -> Result<Scene>;
}

/// Reads image rasters, JSON labels and JSON AOI polygon lists.
#[derive(Debug, Clone)]
pub struct DefaultSceneBuilder {
    pub file_system: Arc<dyn FileSystem>,
}

impl DefaultSceneBuilder {
    pub fn new(file_system: Arc<dyn FileSystem>) -> Self {
        Self { file_system }
    }
}

impl SceneBuilder for DefaultSceneBuilder {
    fn build_scene(
        &self,
        config: &SceneConfig,
        class_config: &ClassConfig,
        tmp_dir: &Path,
    ) -> Result<Scene> {
        let file_system = self.file_system.as_ref();
        let raster_source = ImageRasterSource::from_uris(
            &config.raster_source.uris,
            config.raster_source.channel_order.as_deref(),
            file_system,
            tmp_dir,
        )
        .with_context(|| format!("unable to read the raster of scene '{}'", config.id))?;

        let ground_truth = match &config.label_source {
            Some(source) => {
                let source =
                    JsonLabelSource::from_uri(&source.uri, class_config, file_system, tmp_dir)?;
                let source: Arc<dyn LabelSource> = Arc::new(source);
                Some(source)
            }
            None => None,
        };
        let prediction_store = config.label_store.as_ref().map(|store| {
            let store: Arc<dyn LabelStore> = Arc::new(JsonLabelStore::new(
                &store.uri,
                self.file_system.clone(),
                tmp_dir,
            ));
            store
        });

        let mut aoi_polygons = vec![];
        for uri in &config.aoi_uris {
            let path = file_system.download_if_needed(uri, tmp_dir)?;
            let text = fs::read_to_string(&path)?;
            let polygons: Vec<Polygon> = serde_json::from_str(&text)
                .with_context(|| format!("unable to parse AOI polygons in '{}'", uri))?;
            aoi_polygons.extend(polygons);
        }

        debug!(
            "built scene '{}' with extent {} and {} AOI polygons",
            config.id,
            raster_source.extent(),
            aoi_polygons.len()
        );
        Ok(Scene {
            id: config.id.clone(),
            raster_source: Arc::new(raster_source),
            ground_truth,
            prediction_store,
            aoi_polygons,
        })
    }
}
