
use std::io;
use std::path::Path;
use std::sync::OnceLock;

use serde::Deserialize;
use thiserror::Error;

use crate::controller::mapper::MapperKind;

/// Represents all possible errors loading a [MapperConfig]
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Could not read: {0}")]
    IoError(#[from] io::Error),
    #[error("Unable to deserialize: {0}")]
    DeserializeError(#[from] serde_yaml::Error),
}

/// Top-level configuration for the translation core. Only one key is
/// recognised today: the mapper profile name.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MapperConfig {
    pub mapper: Option<MapperSection>,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "snake_case")]
pub struct MapperSection {
    /// One of the recognised profile names, e.g. "XInputSharedTriggers".
    pub kind: Option<String>,
}

impl MapperConfig {
    /// Load a [MapperConfig] from the given YAML string
    pub fn from_yaml(content: &str) -> Result<MapperConfig, LoadError> {
        let config: MapperConfig = serde_yaml::from_str(content)?;
        Ok(config)
    }

    /// Load a [MapperConfig] from the given YAML file
    pub fn from_yaml_file(path: impl AsRef<Path>) -> Result<MapperConfig, LoadError> {
        let file = std::fs::File::open(path)?;
        let config: MapperConfig = serde_yaml::from_reader(file)?;
        Ok(config)
    }

    /// The profile this configuration selects. Unrecognised or missing
    /// names fall back to the default profile.
    pub fn mapper_kind(&self) -> MapperKind {
        let Some(name) = self.mapper.as_ref().and_then(|mapper| mapper.kind.as_deref()) else {
            return MapperKind::default();
        };
        match MapperKind::from_name(name) {
            Some(kind) => kind,
            None => {
                log::warn!(
                    "Unrecognised mapper kind '{}', using {}",
                    name,
                    MapperKind::default().name()
                );
                MapperKind::default()
            }
        }
    }
}

static CONFIGURED_KIND: OnceLock<MapperKind> = OnceLock::new();

/// Resolve the configured mapper profile, reading the configuration file at
/// most once per process. Every later call observes the first result, so
/// controllers constructed at different times agree on the profile.
pub fn configured_mapper_kind(path: impl AsRef<Path>) -> MapperKind {
    *CONFIGURED_KIND.get_or_init(|| {
        let kind = match MapperConfig::from_yaml_file(path) {
            Ok(config) => config.mapper_kind(),
            Err(err) => {
                log::warn!("Unable to load mapper configuration: {}", err);
                MapperKind::default()
            }
        };
        log::debug!("Using mapper profile {}", kind.name());
        kind
    })
}
