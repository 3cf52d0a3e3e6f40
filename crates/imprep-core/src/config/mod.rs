//! Configuration management for imprep.
//!
//! Configuration is loaded from the platform config directory (falling back to
//! `~/.imprep/config.toml`). Every section has defaults, so a missing file or a
//! partial one is always valid.

mod types;
mod validate;

pub use types::*;

use crate::error::ConfigError;
use crate::pipeline::SensorSizeTable;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Root configuration structure.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Which files are picked up
    pub discovery: DiscoveryConfig,

    /// New file name layout
    pub naming: NamingConfig,

    /// Batch rename behaviour
    pub rename: RenameConfig,

    /// Sensor table settings
    pub intrinsics: IntrinsicsConfig,

    /// Preview rendering
    pub preview: PreviewConfig,

    /// RAW conversion
    pub conversion: ConversionConfig,

    /// Extension-based organizer
    pub organize: OrganizeConfig,

    /// Logging settings
    pub logging: LoggingConfig,
}

impl Config {
    /// Load configuration from the default location.
    ///
    /// Returns default configuration if the file doesn't exist.
    pub fn load() -> Result<Self, ConfigError> {
        let path = Self::default_path();
        if path.exists() {
            Self::load_from(&path)
        } else {
            Ok(Self::default())
        }
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = toml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default config file path.
    ///
    /// - macOS: ~/Library/Application Support/com.imprep.imprep/config.toml
    /// - Linux: ~/.config/imprep/config.toml
    /// - Windows: C:\Users\<User>\AppData\Roaming\imprep\imprep\config\config.toml
    ///
    /// Falls back to ~/.imprep/config.toml if directory detection fails.
    pub fn default_path() -> PathBuf {
        directories::ProjectDirs::from("com", "imprep", "imprep")
            .map(|dirs| dirs.config_dir().to_path_buf().join("config.toml"))
            .unwrap_or_else(|| {
                let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
                PathBuf::from(home).join(".imprep").join("config.toml")
            })
    }

    /// Destination root with `~` expanded.
    pub fn destination(&self) -> PathBuf {
        expand(&self.rename.destination)
    }

    /// Conversion output directory with `~` expanded.
    pub fn conversion_output_dir(&self) -> PathBuf {
        expand(&self.conversion.output_dir)
    }

    /// Build the sensor table: built-in entries plus the configured file, if any.
    pub fn sensor_table(&self) -> Result<Arc<SensorSizeTable>, ConfigError> {
        match &self.intrinsics.sensor_table {
            Some(path) => Ok(Arc::new(SensorSizeTable::with_file(&expand(path))?)),
            None => Ok(SensorSizeTable::shared()),
        }
    }

    /// Serialize the config to a pretty TOML string.
    pub fn to_toml(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::ValidationError(e.to_string()))
    }
}

/// Expand a leading `~` in a path.
pub fn expand(path: &Path) -> PathBuf {
    let path_str = path.to_string_lossy();
    let expanded = shellexpand::tilde(&path_str);
    PathBuf::from(expanded.into_owned())
}
