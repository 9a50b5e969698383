use anyhow::Result;
use geo_window::PixelBox;
use learner_config::{ClassConfig, Color};
use learner_data::{
    ClassificationLabels, ImageRasterSource, JsonLabelSource, LabelStore, JsonLabelStore, Scene,
};
use learner_task::{ChipClassification, ChipClassificationConfig, MlTask};
use ndarray::Array3;
use std::{num::NonZeroUsize, sync::Arc};
use uri_fs::LocalFileSystem;

fn class_config() -> ClassConfig {
    let mut config = ClassConfig::new(["background", "building"]);
    config.colors = Some(vec![Color::Name("blue".into()), Color::Rgb(255, 0, 0)]);
    config
}

fn task() -> ChipClassification {
    let config = ChipClassificationConfig::new(NonZeroUsize::new(8).unwrap(), class_config());
    ChipClassification::new(config, Arc::new(LocalFileSystem))
}

/// A 16x16 scene whose left half is empty.
fn scene() -> Result<Scene> {
    let mut image = Array3::from_elem((16, 16, 3), 60u8);
    image.slice_mut(ndarray::s![.., ..8, ..]).fill(0);
    let raster = ImageRasterSource::new(image, None)?;
    let labels: ClassificationLabels = [
        (PixelBox::new(0, 0, 8, 8)?, 0),
        (PixelBox::new(0, 8, 8, 16)?, 1),
        (PixelBox::new(8, 0, 16, 8)?, 0),
        (PixelBox::new(8, 8, 16, 16)?, 1),
    ]
    .into_iter()
    .collect();

    let mut scene = Scene::new("scene-0", Arc::new(raster));
    scene.ground_truth = Some(Arc::new(JsonLabelSource::new(labels)));
    Ok(scene)
}

#[test]
fn train_windows_and_labels() -> Result<()> {
    let task = task();
    let scene = scene()?;

    let windows = task.get_train_windows(&scene)?;
    assert_eq!(
        windows,
        [PixelBox::new(0, 8, 8, 16)?, PixelBox::new(8, 8, 16, 16)?]
    );
    assert_eq!(task.get_predict_windows(&scene.extent())?.len(), 4);

    let labels = task.get_train_labels(&windows[0], &scene)?;
    assert_eq!(labels.len(), 1);
    assert_eq!(labels.get_cell_class_id(&windows[0]), Some(1));

    let labels = task.post_process_predictions(labels.clone());
    assert_eq!(labels.len(), 1);
    Ok(())
}

#[test]
fn debug_image_is_written() -> Result<()> {
    let dir = tempfile::tempdir()?;
    let tmp_dir = dir.path().join("tmp");
    let debug_dir = dir.path().join("output").join("debug");
    let mut task = task();
    task.config.debug_line_width = 2;

    let mut scene = scene()?;
    let store = JsonLabelStore::new(
        dir.path().join("predictions.json").to_string_lossy(),
        Arc::new(LocalFileSystem),
        &tmp_dir,
    );
    let predictions: ClassificationLabels =
        [(PixelBox::new(0, 8, 8, 16)?, 1)].into_iter().collect();
    store.save(&predictions)?;
    scene.prediction_store = Some(Arc::new(store));

    // a scene without predictions cannot be rendered
    let bare = Scene::new("bare", scene.raster_source.clone());
    assert!(task
        .save_debug_predict_image(&bare, &debug_dir.to_string_lossy(), &tmp_dir)
        .is_err());

    task.save_debug_predict_image(&scene, &debug_dir.to_string_lossy(), &tmp_dir)?;
    let image = image::open(debug_dir.join("scene-0.png"))?.to_rgb8();
    assert_eq!(image.dimensions(), (16, 16));
    assert_eq!(image.get_pixel(8, 0).0, [255, 0, 0]);
    assert_eq!(image.get_pixel(12, 7).0, [255, 0, 0]);
    assert_eq!(image.get_pixel(12, 4).0, [60, 60, 60]);
    assert_eq!(image.get_pixel(0, 0).0, [0, 0, 0]);
    Ok(())
}
