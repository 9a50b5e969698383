use anyhow::{format_err, Context, Result};
use clap::Parser;
use learner_config::{DataConfig, LearnerConfig, UriSpec};
use learner_data::get_data_dirs;
use log::info;
use prettytable::{cell, row, Table};
use std::path::{Path, PathBuf};
use uri_fs::LocalFileSystem;

#[derive(Debug, Clone, Parser)]
/// Inspect and maintain learner configuration files.
enum Opts {
    /// Load, update and validate a config, then print a summary.
    Validate {
        /// configuration file
        config_file: PathBuf,
    },
    /// Rewrite a config written by an older version in the current format.
    Upgrade {
        /// configuration file
        config_file: PathBuf,
        /// output file, or stdout if omitted
        output_file: Option<PathBuf>,
    },
    /// Resolve the dataset URIs of an image config to local data directories.
    DataDirs {
        /// configuration file
        config_file: PathBuf,
        /// directory archives are extracted to
        #[clap(long, default_value = "tmp")]
        tmp_dir: PathBuf,
    },
    /// Print the URI the model bundle is saved to.
    BundleUri {
        /// configuration file
        config_file: PathBuf,
    },
}

fn main() -> Result<()> {
    pretty_env_logger::init();

    match Opts::parse() {
        Opts::Validate { config_file } => validate(config_file)?,
        Opts::Upgrade {
            config_file,
            output_file,
        } => upgrade(config_file, output_file)?,
        Opts::DataDirs {
            config_file,
            tmp_dir,
        } => data_dirs(config_file, tmp_dir)?,
        Opts::BundleUri { config_file } => {
            let config = LearnerConfig::load(config_file)?;
            println!("{}", config.get_model_bundle_uri()?);
        }
    }

    Ok(())
}

fn validate(config_file: impl AsRef<Path>) -> Result<()> {
    let mut config = LearnerConfig::load(config_file)?;
    config.update()?;
    config.validate_config()?;

    let common = config.data.common();
    let data_kind = match &config.data {
        DataConfig::Image(_) => "image",
        DataConfig::Geo(_) => "geo",
    };

    let train_sz = common
        .train_sz
        .map(|size| size.to_string())
        .or_else(|| common.train_sz_rel.map(|rel| rel.to_f64().to_string()))
        .unwrap_or_else(|| "all".into());

    let mut table = Table::new();
    table.add_row(row!["field", "value"]);
    table.add_row(row!["version", config.version]);
    table.add_row(row!["backbone", config.model.backbone_str()]);
    table.add_row(row!["data", data_kind]);
    table.add_row(row!["classes", common.class_names.join(", ")]);
    table.add_row(row!["img_sz", common.img_sz]);
    table.add_row(row!["batch_sz", config.solver.batch_sz]);
    table.add_row(row!["num_epochs", config.solver.num_epochs]);
    table.add_row(row!["lr", config.solver.lr]);
    table.add_row(row!["train_sz", train_sz]);
    table.add_row(row!["augmentors", common.augmentors.join(", ")]);
    table.printstd();

    Ok(())
}

fn upgrade(config_file: impl AsRef<Path>, output_file: Option<PathBuf>) -> Result<()> {
    let config = LearnerConfig::load(config_file)?;
    match output_file {
        Some(output_file) => {
            config.save(&output_file)?;
            info!("saved upgraded config to '{}'", output_file.display());
        }
        None => println!("{}", config.to_json_string_pretty()?),
    }
    Ok(())
}

fn data_dirs(config_file: impl AsRef<Path>, tmp_dir: impl AsRef<Path>) -> Result<()> {
    let config = LearnerConfig::load(config_file)?;
    let image_config = config
        .data
        .as_image()
        .ok_or_else(|| format_err!("data dirs are only defined for image data configs"))?;

    let uris: Vec<&UriSpec> = match (&image_config.group_uris, &image_config.uri) {
        (Some(group_uris), _) => group_uris.iter().collect(),
        (None, Some(uri)) => vec![uri],
        (None, None) => vec![],
    };

    let mut table = Table::new();
    table.add_row(row!["uri", "data dir"]);
    for uri in uris {
        let dirs = get_data_dirs(uri, tmp_dir.as_ref(), &LocalFileSystem)
            .with_context(|| format!("unable to resolve {}", uri_label(uri)))?;
        for dir in dirs {
            table.add_row(row![uri_label(uri), dir.display()]);
        }
    }
    table.printstd();

    Ok(())
}

fn uri_label(uri: &UriSpec) -> String {
    match uri {
        UriSpec::One(uri) => uri.clone(),
        UriSpec::Many(uris) => uris.join(", "),
    }
}
