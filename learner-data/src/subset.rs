use crate::{
    common::*,
    dataset::{BoxedDataset, SubsetDataset},
};

/// The seed of subset shuffling, fixed so that subsets are reproducible across runs.
pub const SUBSET_SEED: u64 = 1234;

/// The first `size` indices of a seeded shuffle of `0..num_records`.
pub fn subset_indices(num_records: usize, size: usize) -> Result<Vec<usize>> {
    ensure!(
        size <= num_records,
        "subset size {} is larger than the dataset ({} records)",
        size,
        num_records
    );
    let mut indices: Vec<usize> = (0..num_records).collect();
    indices.shuffle(&mut StdRng::seed_from_u64(SUBSET_SEED));
    indices.truncate(size);
    Ok(indices)
}

/// Take a reproducible random subset of the dataset.
///
/// At most one of `size` and `fraction` may be given. A fraction is
/// truncated to a record count. The dataset is returned as is if neither is
/// given.
pub fn random_subset_dataset(
    dataset: BoxedDataset,
    size: Option<usize>,
    fraction: Option<Proportion>,
) -> Result<BoxedDataset> {
    let size = match (size, fraction) {
        (None, None) => return Ok(dataset),
        (Some(size), None) => size,
        (None, Some(fraction)) => fraction.of(dataset.num_records()),
        (Some(_), Some(_)) => bail!("specify either size or fraction, but not both"),
    };
    debug!(
        "taking a subset of {} out of {} records",
        size,
        dataset.num_records()
    );
    let indices = subset_indices(dataset.num_records(), size)?;
    Ok(Arc::new(SubsetDataset::new(dataset, indices)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dataset::{DataRecord, RandomAccessDataset, VecDataset};

    fn numbered(count: usize) -> BoxedDataset {
        let records = (0..count)
            .map(|index| DataRecord {
                chip: Array3::zeros((1, 1, 1)),
                class_id: Some(index),
            })
            .collect();
        Arc::new(VecDataset::new(records))
    }

    fn labels(dataset: &BoxedDataset) -> Vec<Option<usize>> {
        (0..dataset.num_records())
            .map(|index| dataset.nth(index).unwrap().class_id)
            .collect()
    }

    #[test]
    fn subsets_are_reproducible() -> Result<()> {
        let first = random_subset_dataset(numbered(100), Some(10), None)?;
        let second = random_subset_dataset(numbered(100), Some(10), None)?;
        assert_eq!(first.num_records(), 10);
        assert_eq!(labels(&first), labels(&second));
        assert_eq!(labels(&first).iter().unique().count(), 10);
        Ok(())
    }

    #[test]
    fn fraction_is_truncated() -> Result<()> {
        let subset = random_subset_dataset(numbered(10), None, Some(Proportion::new(0.25)?))?;
        assert_eq!(subset.num_records(), 2);

        let full = random_subset_dataset(numbered(10), None, Some(Proportion::new(1.0)?))?;
        let mut all = labels(&full);
        all.sort();
        assert_eq!(all, (0..10).map(Some).collect::<Vec<_>>());
        Ok(())
    }

    #[test]
    fn size_and_fraction_are_exclusive() {
        let result = random_subset_dataset(numbered(10), Some(2), Some(Proportion::new(0.5).unwrap()));
        assert!(result.is_err());
        assert!(random_subset_dataset(numbered(10), Some(11), None).is_err());
        assert_eq!(
            random_subset_dataset(numbered(10), None, None)
                .unwrap()
                .num_records(),
            10
        );
    }
}
