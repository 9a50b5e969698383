use anyhow::Result;
use indexmap::IndexMap;
use learner_config::{
    Backbone, ChannelDisplayGroups, DataConfig, ExternalModuleConfig, GeoDataWindowConfig,
    IgnoreLastClass, LearnerConfig, ModelBuilder, ModelConfig, ModuleLoader, PlotOptions,
    SolverConfig, WindowOpts,
};
use noisy_float::prelude::*;
use rand::prelude::*;
use serde_json::{Map, Value};
use std::{
    cell::RefCell,
    fs,
    io::Write as _,
    num::NonZeroUsize,
    path::{Path, PathBuf},
};
use uri_fs::LocalFileSystem;

lazy_static::lazy_static! {
    static ref CONFIG_DIR: PathBuf = Path::new(env!("CARGO_MANIFEST_DIR")).join("tests").join("cfg");
}

fn nz(value: usize) -> NonZeroUsize {
    NonZeroUsize::new(value).unwrap()
}

fn load(name: &str) -> Result<LearnerConfig> {
    LearnerConfig::load(CONFIG_DIR.join(name))
}

#[test]
fn legacy_config_is_upgraded() -> Result<()> {
    let mut config = load("legacy-image-learner.json5")?;
    assert_eq!(config.version, learner_config::CONFIG_VERSION);
    assert_eq!(config.model.backbone, Backbone::resnet18);
    assert_eq!(config.model.backbone_str(), "resnet18");
    assert!(!config.model.pretrained);

    let image = config.data.as_image().unwrap();
    assert_eq!(image.common.img_sz.get(), 224);
    assert_eq!(image.common.num_workers, 4);

    config.update_with_rng(&mut StdRng::seed_from_u64(1))?;
    config.validate_config()?;
    assert_eq!(
        config.get_model_bundle_uri()?,
        "/tmp/output/model-bundle.zip"
    );
    Ok(())
}

#[test]
fn geo_config_round_trip() -> Result<()> {
    let mut config = load("geo-learner.json5")?;
    config.update_with_rng(&mut StdRng::seed_from_u64(1))?;
    config.validate_config()?;

    let geo = config.data.as_geo().unwrap();
    assert_eq!(geo.common.class_names, ["background", "forest"]);
    assert_eq!(config.data.num_classes(), 2);

    let groups = geo
        .common
        .plot_options
        .as_ref()
        .unwrap()
        .channel_display_groups
        .clone()
        .unwrap();
    assert_eq!(
        groups,
        ChannelDisplayGroups::Named(IndexMap::from([
            ("Channels: [0, 1, 2]".to_string(), vec![0, 1, 2]),
            ("Channels: [3]".to_string(), vec![3]),
        ]))
    );

    let train_window = geo.window_opts.for_scene("train-0").unwrap();
    assert_eq!(train_window.size_lims, Some((nz(256), nz(257))));
    assert_eq!(train_window.max_windows, 500);

    assert_eq!(
        config.get_model_bundle_uri()?,
        "s3://bucket/experiments/forest/model-bundle.zip"
    );

    let text = config.to_json_string_pretty()?;
    let reloaded = LearnerConfig::from_json5_str(&text)?;
    assert_eq!(reloaded, config);
    Ok(())
}

#[test]
fn missing_scene_window_is_rejected() -> Result<()> {
    let mut config = load("geo-learner.json5")?;
    if let DataConfig::Geo(geo) = &mut config.data {
        if let WindowOpts::PerScene(windows) = &mut geo.window_opts {
            windows.shift_remove("valid-0");
        }
    }
    let err = config.validate_config().unwrap_err();
    assert!(err.message().contains("valid-0"));
    Ok(())
}

#[test]
fn test_mode_overrides() -> Result<()> {
    let mut config = load("legacy-image-learner.json5")?;
    let test_num_epochs = config.solver.test_num_epochs;
    config.test_mode = true;
    config.update()?;

    assert_eq!(config.data.common().num_workers, 0);
    assert_eq!(config.solver.num_epochs, test_num_epochs);
    assert_eq!(config.solver.batch_sz, config.solver.test_batch_sz);
    assert_eq!(config.data.common().img_sz.get(), 224);
    Ok(())
}

#[test]
fn overfit_mode_overrides() -> Result<()> {
    let mut config = load("legacy-image-learner.json5")?;
    config.overfit_mode = true;
    config.test_mode = true;
    config.solver.test_overfit_num_steps = nz(3);
    config.update()?;

    assert_eq!(config.data.common().img_sz.get(), 112);
    assert_eq!(config.solver.overfit_num_steps.get(), 3);
    Ok(())
}

#[test]
fn cross_field_rules() -> Result<()> {
    let mut config = load("legacy-image-learner.json5")?;
    config.update()?;

    config.solver.class_loss_weights = Some(vec![r64(1.0)]);
    assert!(config.validate_config().is_err());
    config.solver.class_loss_weights = None;
    assert!(config.validate_config().is_ok());

    config.log_tensorboard = false;
    config.run_tensorboard = true;
    assert!(config.validate_config().is_err());

    config.output_uri = None;
    assert!(config.get_model_bundle_uri().is_err());
    Ok(())
}

#[test]
fn external_loss_rules() {
    let external = ExternalModuleConfig::from_github_repo("someone/losses", "focal_loss");

    let solver = SolverConfig {
        external_loss_def: Some(external.clone()),
        ignore_last_class: IgnoreLastClass::Yes,
        ..Default::default()
    };
    assert!(solver.validate_config().is_err());

    let solver = SolverConfig {
        ignore_last_class: IgnoreLastClass::Force,
        ..solver
    };
    assert!(solver.validate_config().is_ok());

    let solver = SolverConfig {
        class_loss_weights: Some(vec![r64(1.0), r64(0.5)]),
        ..solver
    };
    assert!(solver.validate_config().is_err());

    let solver = SolverConfig {
        external_loss_def: Some(ExternalModuleConfig {
            uri: Some("/defs/loss.zip".into()),
            ..external
        }),
        class_loss_weights: None,
        ..solver
    };
    let err = solver.validate_config().unwrap_err();
    assert!(err.message().starts_with("external_loss_def"));
}

#[test]
fn channel_display_groups() {
    let options = PlotOptions::default();
    let groups = options
        .validate_and_update_channel_display_groups(4)
        .unwrap();
    assert_eq!(
        groups,
        IndexMap::from([("Input".to_string(), vec![0, 1, 2])])
    );

    let options = PlotOptions {
        channel_display_groups: Some(ChannelDisplayGroups::List(vec![vec![0, 1, 2], vec![3]])),
        ..Default::default()
    };
    let groups = options
        .validate_and_update_channel_display_groups(4)
        .unwrap();
    assert_eq!(groups.len(), 2);
    assert_eq!(
        groups.values().cloned().collect::<Vec<_>>(),
        [vec![0, 1, 2], vec![3]]
    );

    let options = PlotOptions {
        channel_display_groups: Some(ChannelDisplayGroups::List(vec![vec![0, 4]])),
        ..Default::default()
    };
    assert!(options.validate_and_update_channel_display_groups(4).is_err());

    let options = PlotOptions {
        channel_display_groups: Some(ChannelDisplayGroups::List(vec![])),
        ..Default::default()
    };
    assert!(options.validate_and_update_channel_display_groups(4).is_err());
}

#[test]
fn window_rules() {
    let mut config = GeoDataWindowConfig::random(nz(256));
    assert!(config.validate_config().is_ok());
    config.update();
    assert_eq!(config.size_lims, Some((nz(256), nz(257))));

    let config = GeoDataWindowConfig {
        stride: None,
        ..GeoDataWindowConfig::sliding(nz(256), nz(128))
    };
    assert!(config.validate_config().is_err());
}

#[derive(Default)]
struct RecordingLoader {
    calls: RefCell<Vec<(String, PathBuf, usize)>>,
}

impl ModuleLoader for RecordingLoader {
    type Output = String;

    fn load_local(
        &self,
        hubconf_dir: &Path,
        entrypoint: &str,
        args: &[Value],
        _kwargs: &Map<String, Value>,
    ) -> Result<String> {
        self.calls
            .borrow_mut()
            .push(("local".into(), hubconf_dir.to_owned(), args.len()));
        Ok(format!("{}:{}", hubconf_dir.display(), entrypoint))
    }

    fn load_github(
        &self,
        repo: &str,
        hubconf_dir: &Path,
        entrypoint: &str,
        _args: &[Value],
        _kwargs: &Map<String, Value>,
        _force_reload: bool,
    ) -> Result<String> {
        self.calls
            .borrow_mut()
            .push((repo.into(), hubconf_dir.to_owned(), 0));
        Ok(format!("{}:{}", repo, entrypoint))
    }
}

struct NamedBackbone;

impl ModelBuilder for NamedBackbone {
    type Model = String;

    fn build_default_model(
        &self,
        config: &ModelConfig,
        num_classes: usize,
        in_channels: usize,
    ) -> Result<String> {
        Ok(format!(
            "{}-{}-{}",
            config.backbone_str(),
            num_classes,
            in_channels
        ))
    }
}

#[test]
fn model_build_dispatch() -> Result<()> {
    let loader = RecordingLoader::default();
    let config = ModelConfig::default();
    let model = config.build(3, 4, None, None, &NamedBackbone, &loader, &LocalFileSystem)?;
    assert_eq!(model, "resnet18-3-4");
    assert!(loader.calls.borrow().is_empty());

    let config = ModelConfig {
        external_def: Some(ExternalModuleConfig::from_github_repo(
            "someone/models:main",
            "unet",
        )),
        ..Default::default()
    };
    assert!(config
        .build(3, 4, None, None, &NamedBackbone, &loader, &LocalFileSystem)
        .is_err());

    let save_dir = tempfile::tempdir()?;
    let model = config.build(
        3,
        4,
        Some(save_dir.path()),
        None,
        &NamedBackbone,
        &loader,
        &LocalFileSystem,
    )?;
    assert_eq!(model, "someone/models:main:unet");
    assert_eq!(loader.calls.borrow()[0].1, save_dir.path().join("models"));
    Ok(())
}

#[test]
fn external_def_from_zip() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let zip_path = dir.path().join("seg_models.zip");
    {
        let mut writer = zip::ZipWriter::new(fs::File::create(&zip_path)?);
        writer.add_directory("seg_models-main/", Default::default())?;
        writer.start_file("seg_models-main/hubconf.py", Default::default())?;
        writer.write_all(b"def unet(): pass\n")?;
        writer.finish()?;
    }

    let config = ExternalModuleConfig {
        entrypoint_args: vec![Value::from(3)],
        ..ExternalModuleConfig::from_uri(zip_path.to_string_lossy(), "unet")
    };
    config.validate_config().unwrap();

    let save_dir = dir.path().join("save");
    let loader = RecordingLoader::default();
    let output = config.build(&save_dir, None, &loader, &LocalFileSystem)?;

    let hubconf_dir = save_dir.join("seg_models");
    assert!(hubconf_dir.join("hubconf.py").is_file());
    assert_eq!(output, format!("{}:unet", hubconf_dir.display()));
    assert_eq!(
        loader.calls.borrow()[0],
        ("local".to_string(), hubconf_dir.clone(), 1)
    );

    let output = config.build(&save_dir, Some(dir.path()), &loader, &LocalFileSystem)?;
    assert_eq!(output, format!("{}:unet", dir.path().display()));
    Ok(())
}
