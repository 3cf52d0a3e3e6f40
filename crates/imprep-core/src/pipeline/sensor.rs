//! Camera model → physical sensor width lookup.

use serde::Deserialize;
use std::collections::HashMap;
use std::path::Path;
use std::sync::{Arc, OnceLock};

use crate::error::ConfigError;

/// Sensor widths in millimetres for cameras commonly found in survey datasets.
const BUILTIN_SENSORS: &[(&str, f64)] = &[
    // DJI aircraft and payloads (EXIF model strings)
    ("FC6310", 13.2),
    ("FC6310R", 13.2),
    ("FC6310S", 13.2),
    ("FC330", 6.17),
    ("FC220", 6.17),
    ("FC300X", 6.17),
    ("FC3170", 6.4),
    ("FC7303", 6.17),
    ("FC3411", 13.2),
    ("L1D-20c", 13.2),
    ("L2D-20c", 17.3),
    ("M3E", 17.3),
    ("FC6520", 17.3),
    ("FC6540", 23.5),
    ("ZenmuseP1", 35.9),
    // Full frame and APS-C bodies
    ("Canon EOS 5D Mark IV", 36.0),
    ("Canon EOS R5", 36.0),
    ("NIKON D810", 35.9),
    ("NIKON D850", 35.9),
    ("ILCE-7RM3", 35.9),
    ("ILCE-7RM4", 35.7),
    ("ILCE-6000", 23.5),
    ("DSC-RX1RM2", 35.9),
];

/// Read-only lookup table from camera model to sensor width.
#[derive(Debug, Clone, Default)]
pub struct SensorSizeTable {
    widths: HashMap<String, f64>,
}

#[derive(Deserialize)]
struct SensorFile {
    #[serde(default)]
    sensors: HashMap<String, f64>,
}

impl SensorSizeTable {
    /// An empty table.
    pub fn new() -> Self {
        Self::default()
    }

    /// The compiled-in table.
    pub fn builtin() -> Self {
        let mut table = Self::new();
        for (model, width) in BUILTIN_SENSORS {
            table.insert(model, *width);
        }
        table
    }

    /// Process-wide built-in table, created on first use.
    pub fn shared() -> Arc<Self> {
        static SHARED: OnceLock<Arc<SensorSizeTable>> = OnceLock::new();
        SHARED.get_or_init(|| Arc::new(Self::builtin())).clone()
    }

    /// Built-in entries extended (and overridden) by a TOML file:
    ///
    /// ```toml
    /// [sensors]
    /// "FC6310" = 13.2
    /// ```
    pub fn with_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let file: SensorFile = toml::from_str(&content)?;
        let mut table = Self::builtin();
        for (model, width) in file.sensors {
            if width <= 0.0 {
                return Err(ConfigError::ValidationError(format!(
                    "sensor width for {model:?} must be > 0"
                )));
            }
            table.insert(&model, width);
        }
        tracing::debug!("Loaded sensor table with {} entries", table.len());
        Ok(table)
    }

    pub fn insert(&mut self, model: &str, width_mm: f64) {
        self.widths.insert(normalize(model), width_mm);
    }

    pub fn len(&self) -> usize {
        self.widths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.widths.is_empty()
    }

    /// Look up a model string, ignoring case and whitespace differences.
    pub fn lookup(&self, model: &str) -> Option<f64> {
        self.widths.get(&normalize(model)).copied()
    }

    /// Look up by model, then by `make model` for tables keyed on both.
    pub fn lookup_camera(&self, make: Option<&str>, model: &str) -> Option<f64> {
        self.lookup(model)
            .or_else(|| make.and_then(|make| self.lookup(&format!("{make} {model}"))))
    }
}

fn normalize(key: &str) -> String {
    key.split_whitespace()
        .collect::<Vec<_>>()
        .join(" ")
        .to_lowercase()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lookup_is_case_and_whitespace_insensitive() {
        let table = SensorSizeTable::builtin();
        assert_eq!(table.lookup("FC6310"), Some(13.2));
        assert_eq!(table.lookup("  fc6310 "), Some(13.2));
        assert_eq!(table.lookup("canon   eos 5d MARK iv"), Some(36.0));
        assert!(table.lookup("Unknown Cam").is_none());
    }

    #[test]
    fn test_lookup_camera_combines_make_and_model() {
        let mut table = SensorSizeTable::new();
        table.insert("Hasselblad L1D-20c", 13.2);
        assert!(table.lookup("L1D-20c").is_none());
        assert_eq!(table.lookup_camera(Some("Hasselblad"), "L1D-20c"), Some(13.2));
    }

    #[test]
    fn test_with_file_extends_builtin() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sensors.toml");
        std::fs::write(&path, "[sensors]\n\"My Cam\" = 7.5\n\"FC6310\" = 13.0\n").unwrap();

        let table = SensorSizeTable::with_file(&path).unwrap();
        assert_eq!(table.lookup("my cam"), Some(7.5));
        assert_eq!(table.lookup("FC6310"), Some(13.0));
        assert_eq!(table.lookup("FC330"), Some(6.17));
    }

    #[test]
    fn test_with_file_rejects_non_positive_width() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("sensors.toml");
        std::fs::write(&path, "[sensors]\n\"Bad\" = 0.0\n").unwrap();
        assert!(SensorSizeTable::with_file(&path).is_err());
    }

    #[test]
    fn test_shared_is_reused() {
        let a = SensorSizeTable::shared();
        let b = SensorSizeTable::shared();
        assert!(Arc::ptr_eq(&a, &b));
    }
}
