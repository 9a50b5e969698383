use crate::{common::*, TransformConfig};

/// Groups of channels displayed together, one subplot per group.
///
/// Either a title-to-channels mapping such as `{"RGB": [0, 1, 2], "IR": [3]}`
/// or a list of groups such as `[[0, 1, 2], [3]]`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ChannelDisplayGroups {
    Named(IndexMap<String, Vec<usize>>),
    List(Vec<Vec<usize>>),
}

impl ChannelDisplayGroups {
    pub fn len(&self) -> usize {
        match self {
            Self::Named(groups) => groups.len(),
            Self::List(groups) => groups.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// The mapping form. List groups are titled by their channels.
    pub fn to_named(&self) -> IndexMap<String, Vec<usize>> {
        match self {
            Self::Named(groups) => groups.clone(),
            Self::List(groups) => groups
                .iter()
                .map(|channels| (format!("Channels: {:?}", channels), channels.clone()))
                .collect(),
        }
    }
}

/// Options to control plotting.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlotOptions {
    /// Applied to each image before it is plotted. The default rescales the
    /// values onto the full display range.
    #[serde(default = "default_plot_transform")]
    pub transform: Option<TransformConfig>,
    #[serde(default)]
    pub channel_display_groups: Option<ChannelDisplayGroups>,
}

impl Default for PlotOptions {
    fn default() -> Self {
        Self {
            transform: default_plot_transform(),
            channel_display_groups: None,
        }
    }
}

impl PlotOptions {
    /// Store the normalized display groups once the channel count is known.
    pub fn update(&mut self, img_channels: Option<NonZeroUsize>) -> ConfigResult {
        if let Some(img_channels) = img_channels {
            let groups = self.validate_and_update_channel_display_groups(img_channels.get())?;
            self.channel_display_groups = Some(ChannelDisplayGroups::Named(groups));
        }
        Ok(())
    }

    pub fn validate_config(&self) -> ConfigResult {
        if let Some(transform) = &self.transform {
            transform
                .validate_config()
                .map_err(|err| err.within("transform"))?;
        }
        Ok(())
    }

    /// Normalize the display groups into a title-to-channels mapping.
    ///
    /// Without explicit groups, the first `min(3, img_channels)` channels are
    /// shown as a single group titled "Input".
    pub fn validate_and_update_channel_display_groups(
        &self,
        img_channels: usize,
    ) -> ConfigResult<IndexMap<String, Vec<usize>>> {
        let groups = match &self.channel_display_groups {
            None => {
                let num_display_channels = img_channels.min(3);
                return Ok(IndexMap::from([(
                    "Input".to_string(),
                    (0..num_display_channels).collect(),
                )]));
            }
            Some(groups) => {
                ensure_config!(
                    !groups.is_empty(),
                    "channel_display_groups cannot be empty, leave it unset instead"
                );
                groups.to_named()
            }
        };

        for (title, channels) in &groups {
            ensure_config!(
                (1..=3).contains(&channels.len()),
                "channel_display_groups[{}]: a group must have 1, 2 or 3 channels",
                title
            );
            ensure_config!(
                channels.iter().all(|&channel| channel < img_channels),
                "invalid channel indices in channel_display_groups[{}]",
                title
            );
        }

        Ok(groups)
    }
}

fn default_plot_transform() -> Option<TransformConfig> {
    Some(TransformConfig::min_max_normalize())
}
