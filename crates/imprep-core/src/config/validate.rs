//! Configuration validation with range checks.

use crate::error::ConfigError;
use crate::rename::Parallelism;

use super::Config;

impl Config {
    /// Validate configuration values are within acceptable ranges.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.naming.id_width == 0 || self.naming.id_width > 12 {
            return Err(ConfigError::ValidationError(
                "naming.id_width must be between 1 and 12".into(),
            ));
        }
        if self.naming.date_time_format.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "naming.date_time_format must not be empty".into(),
            ));
        }
        for (key, value) in [
            ("separator", &self.naming.separator),
            ("base_name", &self.naming.base_name),
            ("missing_date_token", &self.naming.missing_date_token),
        ] {
            if value.contains(['/', '\\']) {
                return Err(ConfigError::ValidationError(format!(
                    "naming.{key} must not contain path separators"
                )));
            }
        }
        if self.naming.progressive_id && self.rename.parallel == Parallelism::Parallel {
            return Err(ConfigError::ValidationError(
                "naming.progressive_id cannot be combined with rename.parallel = \"parallel\""
                    .into(),
            ));
        }
        if self.rename.workers == Some(0) {
            return Err(ConfigError::ValidationError(
                "rename.workers must be > 0".into(),
            ));
        }
        if self.rename.destination.as_os_str().is_empty() {
            return Err(ConfigError::ValidationError(
                "rename.destination must not be empty".into(),
            ));
        }
        if self.preview.resize_factor.is_nan() || self.preview.resize_factor <= 0.0 {
            return Err(ConfigError::ValidationError(
                "preview.resize_factor must be > 0".into(),
            ));
        }
        if self.preview.font_scale == 0 {
            return Err(ConfigError::ValidationError(
                "preview.font_scale must be > 0".into(),
            ));
        }
        if self.preview.format.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "preview.format must not be empty".into(),
            ));
        }
        for (category, extensions) in &self.organize.rules {
            if category.trim().is_empty() || category.contains(['/', '\\']) {
                return Err(ConfigError::ValidationError(format!(
                    "organize.rules: invalid category name {category:?}"
                )));
            }
            if extensions.is_empty() {
                return Err(ConfigError::ValidationError(format!(
                    "organize.rules.{category} must list at least one extension"
                )));
            }
        }
        match self.logging.format.as_str() {
            "pretty" | "json" => {}
            other => {
                return Err(ConfigError::ValidationError(format!(
                    "logging.format must be \"pretty\" or \"json\", got {other:?}"
                )));
            }
        }
        Ok(())
    }
}
