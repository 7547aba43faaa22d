use serde::{Deserialize, Serialize};
use std::path::Path;

/// Seed used when no configuration is supplied.
pub const DEFAULT_WORLD_SEED: u64 = 1337;

/// Errors from loading a [`GridConfig`].
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML error: {0}")]
    Yaml(#[from] serde_yaml::Error),
}

/// World-store configuration, read once at construction.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct GridConfig {
    /// The single value that determines the whole world's content.
    pub world_seed: u64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            world_seed: DEFAULT_WORLD_SEED,
        }
    }
}

impl GridConfig {
    pub fn with_seed(world_seed: u64) -> Self {
        Self { world_seed }
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, ConfigError> {
        Ok(serde_yaml::from_str(text)?)
    }

    /// Load a YAML config file. Missing keys fall back to defaults.
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_yaml_str(&text)
    }
}
