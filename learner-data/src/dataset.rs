use crate::{common::*, transform::Transform};

/// An image chip with its optional class label.
#[derive(Debug, Clone, PartialEq)]
pub struct DataRecord {
    /// Pixels in (height, width, channel) layout.
    pub chip: Array3<u8>,
    pub class_id: Option<usize>,
}

/// The dataset that can be random accessed.
pub trait RandomAccessDataset
where
    Self: Debug + Send + Sync,
{
    /// Get number of records in the dataset.
    fn num_records(&self) -> usize;

    /// Get the nth record in the dataset.
    fn nth(&self, index: usize) -> Result<DataRecord>;

    fn is_empty(&self) -> bool {
        self.num_records() == 0
    }
}

pub type BoxedDataset = Arc<dyn RandomAccessDataset>;

impl<D> RandomAccessDataset for Arc<D>
where
    D: RandomAccessDataset + ?Sized,
{
    fn num_records(&self) -> usize {
        self.as_ref().num_records()
    }

    fn nth(&self, index: usize) -> Result<DataRecord> {
        self.as_ref().nth(index)
    }
}

/// The training, validation and test datasets.
#[derive(Debug, Clone)]
pub struct DatasetSplits {
    pub train: BoxedDataset,
    pub valid: BoxedDataset,
    pub test: BoxedDataset,
}

/// Datasets chained one after another.
#[derive(Debug, Clone)]
pub struct ConcatDataset {
    datasets: Vec<BoxedDataset>,
    /// Cumulative record counts, starting from zero.
    offsets: Vec<usize>,
}

impl ConcatDataset {
    pub fn new(datasets: Vec<BoxedDataset>) -> Self {
        let offsets = datasets
            .iter()
            .scan(0, |total, dataset| {
                let offset = *total;
                *total += dataset.num_records();
                Some(offset)
            })
            .collect();
        Self { datasets, offsets }
    }

    pub fn datasets(&self) -> &[BoxedDataset] {
        &self.datasets
    }
}

impl RandomAccessDataset for ConcatDataset {
    fn num_records(&self) -> usize {
        match (self.offsets.last(), self.datasets.last()) {
            (Some(offset), Some(dataset)) => offset + dataset.num_records(),
            _ => 0,
        }
    }

    fn nth(&self, index: usize) -> Result<DataRecord> {
        ensure!(
            index < self.num_records(),
            "index {} is out of range for {} records",
            index,
            self.num_records()
        );
        let position = match self.offsets.binary_search(&index) {
            // skip empty datasets sharing the offset
            Ok(position) => {
                position
                    + self.datasets[position..]
                        .iter()
                        .take_while(|dataset| dataset.is_empty())
                        .count()
            }
            Err(position) => position - 1,
        };
        self.datasets[position].nth(index - self.offsets[position])
    }
}

/// The records of a dataset at the given indices.
#[derive(Debug, Clone)]
pub struct SubsetDataset {
    dataset: BoxedDataset,
    indices: Vec<usize>,
}

impl SubsetDataset {
    pub fn new(dataset: BoxedDataset, indices: Vec<usize>) -> Result<Self> {
        let num_records = dataset.num_records();
        if let Some(&index) = indices.iter().find(|&&index| index >= num_records) {
            bail!(
                "subset index {} is out of range for {} records",
                index,
                num_records
            );
        }
        Ok(Self { dataset, indices })
    }

    pub fn indices(&self) -> &[usize] {
        &self.indices
    }
}

impl RandomAccessDataset for SubsetDataset {
    fn num_records(&self) -> usize {
        self.indices.len()
    }

    fn nth(&self, index: usize) -> Result<DataRecord> {
        let inner = *self.indices.get(index).ok_or_else(|| {
            format_err!(
                "index {} is out of range for {} records",
                index,
                self.indices.len()
            )
        })?;
        self.dataset.nth(inner)
    }
}

/// Applies a transform to every record of a dataset.
#[derive(Debug, Clone)]
pub struct TransformedDataset {
    dataset: BoxedDataset,
    transform: Transform,
    seed: Option<u64>,
}

impl TransformedDataset {
    pub fn new(dataset: BoxedDataset, transform: Transform) -> Self {
        Self {
            dataset,
            transform,
            seed: None,
        }
    }

    /// Derive the generator of each record from `seed` and its index, so
    /// reads are reproducible.
    pub fn with_seed(self, seed: u64) -> Self {
        Self {
            seed: Some(seed),
            ..self
        }
    }
}

impl RandomAccessDataset for TransformedDataset {
    fn num_records(&self) -> usize {
        self.dataset.num_records()
    }

    fn nth(&self, index: usize) -> Result<DataRecord> {
        let DataRecord { chip, class_id } = self.dataset.nth(index)?;
        let mut rng = match self.seed {
            Some(seed) => StdRng::seed_from_u64(seed.wrapping_add(index as u64)),
            None => StdRng::from_rng(rand::thread_rng())?,
        };
        let chip = self.transform.apply(chip, &mut rng)?;
        Ok(DataRecord { chip, class_id })
    }
}

/// Wrap the dataset with the transform, if any.
pub fn with_transform(
    dataset: BoxedDataset,
    transform: Option<&TransformConfig>,
) -> Result<BoxedDataset> {
    let config = match transform {
        Some(config) => config,
        None => return Ok(dataset),
    };
    let dataset: BoxedDataset = Arc::new(TransformedDataset::new(dataset, Transform::new(config)?));
    Ok(dataset)
}

/// An in-memory dataset.
#[derive(Debug, Clone, Default)]
pub struct VecDataset {
    records: Vec<DataRecord>,
}

impl VecDataset {
    pub fn new(records: Vec<DataRecord>) -> Self {
        Self { records }
    }
}

impl RandomAccessDataset for VecDataset {
    fn num_records(&self) -> usize {
        self.records.len()
    }

    fn nth(&self, index: usize) -> Result<DataRecord> {
        self.records
            .get(index)
            .cloned()
            .ok_or_else(|| format_err!("index {} is out of range", index))
    }
}
