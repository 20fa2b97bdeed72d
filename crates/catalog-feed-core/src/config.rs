use std::collections::{BTreeSet, HashSet};
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::error::{ExportError, Result};
use crate::identifiers::ensure_channel_in_range;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid config: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("channel id {0} is configured more than once")]
    DuplicateChannel(u32),
    #[error("channel id 0 is reserved for unscoped identifiers")]
    ReservedChannel,
}

/// How values of date attributes are collapsed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DateFieldMode {
    #[default]
    All,
    Min,
    Max,
}

impl DateFieldMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            DateFieldMode::All => "all",
            DateFieldMode::Min => "min",
            DateFieldMode::Max => "max",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            DateFieldMode::All => "All Dates",
            DateFieldMode::Min => "Min Date",
            DateFieldMode::Max => "Max Date",
        }
    }
}

impl fmt::Display for DateFieldMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl TryFrom<&str> for DateFieldMode {
    type Error = String;

    fn try_from(value: &str) -> std::result::Result<Self, Self::Error> {
        match value.trim().to_ascii_lowercase().as_str() {
            "all" => Ok(DateFieldMode::All),
            "min" => Ok(DateFieldMode::Min),
            "max" => Ok(DateFieldMode::Max),
            other => Err(format!("unknown date field mode '{other}'")),
        }
    }
}

/// A sales channel (store view) the catalog is exported once per.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Channel {
    pub id: u32,
    pub name: String,
    pub website_id: u32,
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    #[serde(default)]
    pub grouped_export: bool,
    #[serde(default)]
    pub show_out_of_stock: bool,
}

fn default_enabled() -> bool {
    true
}

pub trait ChannelRegistry {
    fn channels(&self) -> &[Channel];
    fn is_single_channel_mode(&self) -> bool;

    fn enabled_channels(&self) -> Vec<&Channel> {
        self.channels().iter().filter(|c| c.enabled).collect()
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExportConfig {
    #[serde(default)]
    pub single_channel_mode: bool,
    #[serde(default)]
    pub date_field: DateFieldMode,
    #[serde(default)]
    pub date_attributes: BTreeSet<String>,
    #[serde(default)]
    pub channels: Vec<Channel>,
}

impl ExportConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.display().to_string(),
            source,
        })?;
        Self::from_toml_str(&text)
    }

    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: ExportConfig = toml::from_str(text).map_err(ConfigError::from)?;
        config.validate()?;
        Ok(config)
    }

    /// Checks every channel id fits the identifier encoding before any row is read.
    pub fn validate(&self) -> Result<()> {
        let mut seen = HashSet::new();
        for channel in &self.channels {
            if channel.id == 0 {
                return Err(ConfigError::ReservedChannel.into());
            }
            ensure_channel_in_range(channel.id)?;
            if !seen.insert(channel.id) {
                return Err(ExportError::Config(ConfigError::DuplicateChannel(channel.id)));
            }
        }
        Ok(())
    }

    pub fn is_date_attribute(&self, name: &str) -> bool {
        self.date_attributes.contains(name)
    }

    /// Per-pass view of the configuration for one channel.
    pub fn channel_context(&self, channel: &Channel) -> ChannelContext {
        ChannelContext {
            channel: channel.clone(),
            single_channel_mode: self.single_channel_mode,
            date_field: self.date_field,
            date_attributes: self.date_attributes.clone(),
        }
    }
}

impl ChannelRegistry for ExportConfig {
    fn channels(&self) -> &[Channel] {
        &self.channels
    }

    fn is_single_channel_mode(&self) -> bool {
        self.single_channel_mode
    }
}

/// Everything an entity needs to answer its eligibility and aggregation questions
/// during one channel pass.
#[derive(Debug, Clone)]
pub struct ChannelContext {
    pub channel: Channel,
    pub single_channel_mode: bool,
    pub date_field: DateFieldMode,
    pub date_attributes: BTreeSet<String>,
}

impl ChannelContext {
    pub fn new(channel: Channel) -> Self {
        Self {
            channel,
            single_channel_mode: false,
            date_field: DateFieldMode::All,
            date_attributes: BTreeSet::new(),
        }
    }

    pub fn channel_id(&self) -> u32 {
        self.channel.id
    }

    pub fn is_date_attribute(&self, name: &str) -> bool {
        self.date_attributes.contains(name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE: &str = r#"
date_field = "min"
date_attributes = ["news_from_date", "created_at"]

[[channels]]
id = 1
name = "Default Store View"
website_id = 1
grouped_export = true

[[channels]]
id = 2
name = "Dutch"
website_id = 1
enabled = false
show_out_of_stock = true
"#;

    #[test]
    fn parses_channels_with_defaults() {
        let config = ExportConfig::from_toml_str(SAMPLE).expect("parse config");
        assert_eq!(config.date_field, DateFieldMode::Min);
        assert!(config.is_date_attribute("created_at"));
        assert!(!config.is_single_channel_mode());
        assert_eq!(config.channels.len(), 2);

        let default_view = &config.channels[0];
        assert!(default_view.enabled);
        assert!(default_view.grouped_export);
        assert!(!default_view.show_out_of_stock);

        let enabled: Vec<u32> = config.enabled_channels().iter().map(|c| c.id).collect();
        assert_eq!(enabled, vec![1]);
    }

    #[test]
    fn empty_config_defaults_to_all_dates() {
        let config = ExportConfig::from_toml_str("").expect("parse empty");
        assert_eq!(config.date_field, DateFieldMode::All);
        assert!(config.channels.is_empty());
    }

    #[test]
    fn channel_beyond_identifier_width_fails_validation() {
        let text = r#"
[[channels]]
id = 10000
name = "Too wide"
website_id = 1
"#;
        let err = ExportConfig::from_toml_str(text).expect_err("out of range");
        assert!(matches!(err, ExportError::IdentifierRange { channel_id: 10000, .. }));
    }

    #[test]
    fn duplicate_and_reserved_channels_are_rejected() {
        let duplicate = r#"
[[channels]]
id = 3
name = "A"
website_id = 1

[[channels]]
id = 3
name = "B"
website_id = 2
"#;
        assert!(matches!(
            ExportConfig::from_toml_str(duplicate),
            Err(ExportError::Config(ConfigError::DuplicateChannel(3)))
        ));

        let reserved = r#"
[[channels]]
id = 0
name = "Admin"
website_id = 0
"#;
        assert!(matches!(
            ExportConfig::from_toml_str(reserved),
            Err(ExportError::Config(ConfigError::ReservedChannel))
        ));
    }

    #[test]
    fn date_field_mode_parses_labels() {
        assert_eq!(DateFieldMode::try_from(" MAX "), Ok(DateFieldMode::Max));
        assert!(DateFieldMode::try_from("median").is_err());
        assert_eq!(DateFieldMode::Min.label(), "Min Date");
    }
}
