//! Sub-configuration structs and their defaults.

use crate::provenance::ProvenanceFormat;
use crate::rename::Parallelism;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Which files a scan picks up.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DiscoveryConfig {
    /// Accepted extensions, case-insensitive. Empty accepts every file.
    pub extensions: Vec<String>,

    /// Descend into subdirectories
    pub recursive: bool,
}

impl Default for DiscoveryConfig {
    fn default() -> Self {
        Self {
            extensions: ["jpg", "jpeg", "png", "tif", "tiff", "dng"]
                .iter()
                .map(|s| s.to_string())
                .collect(),
            recursive: false,
        }
    }
}

/// How new file names are built.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct NamingConfig {
    /// Leading name component; empty omits it
    pub base_name: String,

    /// Append the capture timestamp
    pub use_date_time: bool,

    /// Append a zero-padded counter in input order
    pub progressive_id: bool,

    /// Remove each original after a successful copy
    pub delete_original: bool,

    /// Render captioned previews of the renamed files
    pub overlay_name: bool,

    /// Append the camera model
    pub include_camera_model: bool,

    /// chrono format for the timestamp component
    pub date_time_format: String,

    /// Used in place of the timestamp when none can be read
    pub missing_date_token: String,

    /// Zero-pad width of the progressive counter
    pub id_width: usize,

    /// Joins name components and collision suffixes
    pub separator: String,
}

impl Default for NamingConfig {
    fn default() -> Self {
        Self {
            base_name: "IMG".to_string(),
            use_date_time: true,
            progressive_id: false,
            delete_original: false,
            overlay_name: false,
            include_camera_model: false,
            date_time_format: "%Y%m%d_%H%M%S".to_string(),
            missing_date_token: "nodatetime".to_string(),
            id_width: 4,
            separator: "_".to_string(),
        }
    }
}

/// Batch rename behaviour.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RenameConfig {
    /// Destination root (supports `~`)
    pub destination: PathBuf,

    /// auto, parallel or sequential
    pub parallel: Parallelism,

    /// Worker count for parallel commit; unset uses available parallelism
    pub workers: Option<usize>,

    /// Mirror source subdirectories under the destination
    pub keep_dir_tree: bool,

    /// Replace files already present at the destination
    pub overwrite: bool,

    /// Hash-compare each copy before removing the original.
    /// Unset follows `naming.delete_original`.
    pub verify_copies: Option<bool>,

    /// First progressive id
    pub first_id: u64,

    /// Provenance table format; unset infers it from the file extension
    pub provenance_format: Option<ProvenanceFormat>,
}

impl Default for RenameConfig {
    fn default() -> Self {
        Self {
            destination: PathBuf::from("renamed"),
            parallel: Parallelism::Auto,
            workers: None,
            keep_dir_tree: false,
            overwrite: false,
            verify_copies: None,
            first_id: 0,
            provenance_format: None,
        }
    }
}

/// Camera intrinsics settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct IntrinsicsConfig {
    /// Extra sensor widths in TOML (`[sensors] "Model" = 13.2`)
    pub sensor_table: Option<PathBuf>,
}

/// Caption background colour.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CaptionBackground {
    None,
    White,
    Black,
}

/// Preview rendering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PreviewConfig {
    /// Output file extension; decides the encoder
    pub format: String,

    /// Scale factor applied before captioning; 1.0 keeps the original size
    pub resize_factor: f32,

    /// Pixels per font dot
    pub font_scale: u32,

    /// Outline thickness in pixels
    pub thickness: u32,

    /// Caption offset from the top-left corner
    pub border_px: u32,

    pub background: CaptionBackground,

    /// Padding around the caption inside the background box
    pub buffer: u32,

    /// Append `f=<px>` to the caption when intrinsics resolve
    pub caption_intrinsics: bool,
}

impl Default for PreviewConfig {
    fn default() -> Self {
        Self {
            format: "jpg".to_string(),
            resize_factor: 1.0,
            font_scale: 5,
            thickness: 2,
            border_px: 50,
            background: CaptionBackground::White,
            buffer: 20,
            caption_intrinsics: false,
        }
    }
}

/// RAW conversion settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ConversionConfig {
    /// Converter executable; unset searches `PATH` for `rawtherapee-cli`
    pub executable: Option<PathBuf>,

    /// Processing profile (`.pp3`)
    pub profile: Option<PathBuf>,

    /// Extra arguments placed before `-c`
    pub options: Vec<String>,

    pub keep_dir_tree: bool,

    pub output_dir: PathBuf,
}

impl Default for ConversionConfig {
    fn default() -> Self {
        Self {
            executable: None,
            profile: None,
            options: vec!["-j100".to_string(), "-js3".to_string(), "-Y".to_string()],
            keep_dir_tree: false,
            output_dir: PathBuf::from("converted"),
        }
    }
}

/// Extension-based organizer settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OrganizeConfig {
    /// Category directory → extensions
    pub rules: BTreeMap<String, Vec<String>>,

    /// Move files (true) or copy them (false)
    pub inplace: bool,

    /// Organize each immediate subdirectory instead of the root
    pub recursive: bool,
}

impl Default for OrganizeConfig {
    fn default() -> Self {
        let rule = |exts: &[&str]| exts.iter().map(|s| s.to_string()).collect();
        let mut rules = BTreeMap::new();
        rules.insert("raw".to_string(), rule(&["dng", "cr2", "nef", "arw"]));
        rules.insert("jpg".to_string(), rule(&["jpg", "jpeg"]));
        rules.insert("png".to_string(), rule(&["png"]));
        rules.insert("tif".to_string(), rule(&["tif", "tiff"]));
        Self {
            rules,
            inplace: true,
            recursive: false,
        }
    }
}

/// Logging settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace)
    pub level: String,

    /// Log format (pretty, json)
    pub format: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            format: "pretty".to_string(),
        }
    }
}
