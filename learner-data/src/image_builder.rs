//! Builds the datasets of an [ImageDataConfig].

use crate::{
    common::*,
    data_dirs::{get_data_dirs, split_dirs},
    dataset::{BoxedDataset, ConcatDataset, DatasetSplits, RandomAccessDataset},
    image_dir::DirToDataset,
    subset::random_subset_dataset,
};
use learner_config::{GroupSize, ImageDataConfig, UriSpec};

/// Builds training, validation and test datasets out of chip directories.
#[derive(Debug, Clone, Copy)]
pub struct ImageDatasetBuilder<'a> {
    pub config: &'a ImageDataConfig,
    pub dir_to_dataset: &'a dyn DirToDataset,
    pub file_system: &'a dyn FileSystem,
}

impl<'a> ImageDatasetBuilder<'a> {
    pub fn new(
        config: &'a ImageDataConfig,
        dir_to_dataset: &'a dyn DirToDataset,
        file_system: &'a dyn FileSystem,
    ) -> Self {
        Self {
            config,
            dir_to_dataset,
            file_system,
        }
    }

    /// Build the datasets, extracting archives under `tmp_dir`.
    ///
    /// In overfit mode, the training split is not augmented.
    pub fn build(&self, tmp_dir: &Path, overfit_mode: bool) -> Result<DatasetSplits> {
        let common = &self.config.common;

        let splits = match &self.config.group_uris {
            Some(group_uris) => {
                if self.config.uri.is_some() {
                    warn!("both uri and group_uris are specified, only group_uris will be used");
                }
                self.datasets_from_group_uris(group_uris, tmp_dir, overfit_mode)?
            }
            None => {
                let uri = self
                    .config
                    .uri
                    .as_ref()
                    .ok_or_else(|| format_err!("either uri or group_uris must be specified"))?;
                self.datasets_from_uri(uri, tmp_dir, overfit_mode)?
            }
        };

        let DatasetSplits { train, valid, test } = splits;
        let train = random_subset_dataset(train, common.train_sz, common.train_sz_rel)?;
        info!(
            "built image datasets with {} training, {} validation and {} test records",
            train.num_records(),
            valid.num_records(),
            test.num_records()
        );
        Ok(DatasetSplits { train, valid, test })
    }

    /// The datasets of every data directory the URI resolves to.
    pub fn datasets_from_uri(
        &self,
        uri: &UriSpec,
        tmp_dir: &Path,
        overfit_mode: bool,
    ) -> Result<DatasetSplits> {
        let data_dirs = get_data_dirs(uri, tmp_dir, self.file_system)?;

        let (base_transform, aug_transform) = self.config.common.get_data_transforms();
        let train_transform = if overfit_mode {
            &base_transform
        } else {
            &aug_transform
        };

        let make = |split: &str, transform: &TransformConfig| -> Result<BoxedDataset> {
            let datasets: Vec<_> = split_dirs(&data_dirs, split)
                .iter()
                .map(|dir| self.dir_to_dataset.dir_to_dataset(dir, Some(transform)))
                .collect::<Result<_>>()?;
            Ok(Arc::new(ConcatDataset::new(datasets)))
        };

        Ok(DatasetSplits {
            train: make("train", train_transform)?,
            valid: make("valid", &base_transform)?,
            test: make("test", &base_transform)?,
        })
    }

    /// Concatenated datasets of the groups, each group's training split
    /// capped by its own size.
    pub fn datasets_from_group_uris(
        &self,
        group_uris: &[UriSpec],
        tmp_dir: &Path,
        overfit_mode: bool,
    ) -> Result<DatasetSplits> {
        let group_sizes = self.config.group_sizes();
        let mut train = vec![];
        let mut valid = vec![];
        let mut test = vec![];

        for (index, uri) in group_uris.iter().enumerate() {
            let splits = self
                .datasets_from_uri(uri, tmp_dir, overfit_mode)
                .with_context(|| format!("unable to build the datasets of group {}", index))?;
            let group_train = match group_sizes.get(index).copied().flatten() {
                Some(GroupSize::Count(size)) => random_subset_dataset(splits.train, Some(size), None)?,
                Some(GroupSize::Fraction(fraction)) => {
                    random_subset_dataset(splits.train, None, Some(fraction))?
                }
                None => splits.train,
            };
            train.push(group_train);
            valid.push(splits.valid);
            test.push(splits.test);
        }

        Ok(DatasetSplits {
            train: Arc::new(ConcatDataset::new(train)),
            valid: Arc::new(ConcatDataset::new(valid)),
            test: Arc::new(ConcatDataset::new(test)),
        })
    }
}
