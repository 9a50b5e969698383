//! Migration of serialized configs written by older versions.
//!
//! Upgrades operate on the raw JSON value before it is deserialized, so
//! fields whose type changed between versions can still be read.

use crate::{common::*, Backbone};

/// The version written into new configs.
pub const CONFIG_VERSION: u64 = 3;

/// Upgrade a serialized learner config to [CONFIG_VERSION].
///
/// A missing `version` field means the config is already current.
pub fn upgrade_learner_config(mut value: Value) -> Result<Value> {
    let root = value
        .as_object_mut()
        .ok_or_else(|| format_err!("the learner config must be an object"))?;

    let version = match root.get("version") {
        None | Some(Value::Null) => CONFIG_VERSION,
        Some(version) => version
            .as_u64()
            .ok_or_else(|| format_err!("version must be a non-negative integer, but get {}", version))?,
    };
    ensure!(
        version <= CONFIG_VERSION,
        "config version {} is newer than the supported version {}",
        version,
        CONFIG_VERSION
    );

    if version < CONFIG_VERSION {
        info!(
            "upgrading learner config from version {} to {}",
            version, CONFIG_VERSION
        );
        if let Some(model) = root.get_mut("model") {
            upgrade_model_config(model, version).context("unable to upgrade the model config")?;
        }
        if let Some(data) = root.get_mut("data") {
            upgrade_data_config(data, version).context("unable to upgrade the data config")?;
        }
    }

    root.insert("version".into(), CONFIG_VERSION.into());
    Ok(value)
}

/// Version 0 stored the backbone as its 1-based id.
pub fn upgrade_model_config(model: &mut Value, version: u64) -> Result<()> {
    if version != 0 {
        return Ok(());
    }
    let model = model
        .as_object_mut()
        .ok_or_else(|| format_err!("the model config must be an object"))?;

    if let Some(backbone) = model.get_mut("backbone") {
        if let Some(index) = backbone.as_u64() {
            let name: &'static str = Backbone::from_index(index as usize)?.into();
            *backbone = name.into();
        }
    }
    Ok(())
}

/// Version 1 had image data only. Version 2 lacked `img_channels`.
pub fn upgrade_data_config(data: &mut Value, version: u64) -> Result<()> {
    let data = data
        .as_object_mut()
        .ok_or_else(|| format_err!("the data config must be an object"))?;

    if version < 2 {
        data.insert("type_hint".into(), "image_data".into());
    } else if version < 3 {
        data.entry("img_channels").or_insert(Value::Null);
    }
    Ok(())
}
