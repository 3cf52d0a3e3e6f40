//! Core data types shared across discovery, naming and provenance.
//!
//! `TagMap` is the structured form of an image's embedded EXIF block.
//! `RenameRecord` is one row of the provenance table written after a batch.

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::path::PathBuf;

/// EXIF timestamp layout, e.g. `2023:05:16 11:34:34`.
pub const EXIF_DATE_TIME_FORMAT: &str = "%Y:%m:%d %H:%M:%S";

/// Timestamp layout used in provenance tables.
pub const RECORD_DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A single metadata value, normalized from the EXIF field types.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum TagValue {
    /// ASCII strings (make, model, timestamps, GPS refs)
    Text(String),
    /// A single rational or floating point number
    Rational(f64),
    /// Short/long/byte integer arrays
    Integers(Vec<i64>),
    /// Multi-valued rationals (GPS coordinates, lens specification)
    Rationals(Vec<f64>),
    /// Opaque blob; only the length is kept
    Bytes(usize),
}

impl TagValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            TagValue::Text(s) => Some(s.as_str()),
            _ => None,
        }
    }

    /// Numeric view of the first element.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TagValue::Rational(v) => Some(*v),
            TagValue::Integers(v) => v.first().map(|&x| x as f64),
            TagValue::Rationals(v) => v.first().copied(),
            TagValue::Text(s) => s.trim().parse().ok(),
            TagValue::Bytes(_) => None,
        }
    }

    pub fn as_u32(&self) -> Option<u32> {
        match self {
            TagValue::Integers(v) => v.first().and_then(|&x| u32::try_from(x).ok()),
            other => other
                .as_f64()
                .filter(|v| *v >= 0.0 && *v <= u32::MAX as f64)
                .map(|v| v.round() as u32),
        }
    }

    pub fn as_f64_list(&self) -> Option<Vec<f64>> {
        match self {
            TagValue::Rationals(v) => Some(v.clone()),
            TagValue::Integers(v) => Some(v.iter().map(|&x| x as f64).collect()),
            TagValue::Rational(v) => Some(vec![*v]),
            _ => None,
        }
    }
}

impl fmt::Display for TagValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TagValue::Text(s) => write!(f, "{s}"),
            TagValue::Rational(v) => write!(f, "{v}"),
            TagValue::Integers(v) => {
                let parts: Vec<String> = v.iter().map(|x| x.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            TagValue::Rationals(v) => {
                let parts: Vec<String> = v.iter().map(|x| x.to_string()).collect();
                write!(f, "[{}]", parts.join(", "))
            }
            TagValue::Bytes(n) => write!(f, "<{n} bytes>"),
        }
    }
}

/// Tag name → value, ordered by name.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TagMap(BTreeMap<String, TagValue>);

impl TagMap {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, name: impl Into<String>, value: TagValue) {
        self.0.insert(name.into(), value);
    }

    pub fn get(&self, name: &str) -> Option<&TagValue> {
        self.0.get(name)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &TagValue)> {
        self.0.iter()
    }

    fn text(&self, name: &str) -> Option<&str> {
        self.get(name)
            .and_then(TagValue::as_text)
            .map(str::trim)
            .filter(|s| !s.is_empty())
    }

    pub fn camera_make(&self) -> Option<&str> {
        self.text("Make")
    }

    pub fn camera_model(&self) -> Option<&str> {
        self.text("Model")
    }

    /// Nominal focal length in millimetres.
    pub fn focal_length_mm(&self) -> Option<f64> {
        self.get("FocalLength").and_then(TagValue::as_f64)
    }

    /// Pixel dimensions, preferring the Exif sub-IFD over the primary IFD.
    pub fn image_size(&self) -> Option<(u32, u32)> {
        let pair = |w: &str, h: &str| {
            let width = self.get(w).and_then(TagValue::as_u32)?;
            let height = self.get(h).and_then(TagValue::as_u32)?;
            Some((width, height))
        };
        pair("PixelXDimension", "PixelYDimension")
            .or_else(|| pair("ImageWidth", "ImageLength"))
            .filter(|(w, h)| *w > 0 && *h > 0)
    }

    /// Capture timestamp, preferring `DateTimeOriginal` over `DateTime`.
    pub fn captured_at(&self) -> Option<NaiveDateTime> {
        ["DateTimeOriginal", "DateTime"]
            .iter()
            .filter_map(|name| self.text(name))
            .find_map(|s| NaiveDateTime::parse_from_str(s, EXIF_DATE_TIME_FORMAT).ok())
    }

    /// GPS position as (latitude, longitude, altitude).
    ///
    /// Latitude and longitude are signed decimal degrees; altitude is metres and
    /// is `None` when the tag is missing.
    pub fn gps(&self) -> Option<(f64, f64, Option<f64>)> {
        let lat = self.gps_coord("GPSLatitude", "GPSLatitudeRef", 'S')?;
        let lon = self.gps_coord("GPSLongitude", "GPSLongitudeRef", 'W')?;
        let alt = self.get("GPSAltitude").and_then(TagValue::as_f64).map(|a| {
            let below_sea = self
                .get("GPSAltitudeRef")
                .and_then(TagValue::as_f64)
                .is_some_and(|r| r == 1.0);
            if below_sea {
                -a
            } else {
                a
            }
        });
        Some((lat, lon, alt))
    }

    fn gps_coord(&self, coord: &str, reference: &str, negative: char) -> Option<f64> {
        let dms = self.get(coord)?.as_f64_list()?;
        if dms.len() < 3 {
            return None;
        }
        let degrees = dms[0] + dms[1] / 60.0 + dms[2] / 3600.0;
        let sign = match self.text(reference) {
            Some(r) if r.contains(negative) => -1.0,
            _ => 1.0,
        };
        Some(sign * degrees)
    }
}

impl FromIterator<(String, TagValue)> for TagMap {
    fn from_iter<I: IntoIterator<Item = (String, TagValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// First-order pinhole intrinsics: focal length in pixels and principal point.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CameraIntrinsics {
    matrix: [[f64; 3]; 3],
}

impl CameraIntrinsics {
    pub fn new(focal_px: f64, cx: f64, cy: f64) -> Self {
        Self {
            matrix: [[focal_px, 0.0, cx], [0.0, focal_px, cy], [0.0, 0.0, 1.0]],
        }
    }

    pub fn matrix(&self) -> [[f64; 3]; 3] {
        self.matrix
    }

    pub fn focal_px(&self) -> f64 {
        self.matrix[0][0]
    }

    pub fn principal_point(&self) -> (f64, f64) {
        (self.matrix[0][2], self.matrix[1][2])
    }
}

impl fmt::Display for CameraIntrinsics {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, row) in self.matrix.iter().enumerate() {
            if i > 0 {
                writeln!(f)?;
            }
            write!(f, "[{:12.4} {:12.4} {:12.4}]", row[0], row[1], row[2])?;
        }
        Ok(())
    }
}

/// Terminal state of one file in a batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RenameStatus {
    Renamed,
    Skipped,
    Failed,
}

impl RenameStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            RenameStatus::Renamed => "renamed",
            RenameStatus::Skipped => "skipped",
            RenameStatus::Failed => "failed",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "renamed" => Some(Self::Renamed),
            "skipped" => Some(Self::Skipped),
            "failed" => Some(Self::Failed),
            _ => None,
        }
    }
}

impl fmt::Display for RenameStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One provenance row: where a file came from, where it went, and how it ended.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RenameRecord {
    pub original_path: PathBuf,
    /// Empty when the file failed before a name was assigned
    pub new_path: PathBuf,
    pub new_name: String,
    pub status: RenameStatus,
    pub error: Option<String>,

    // Supplemental identity columns
    pub progressive_id: Option<u64>,
    pub captured_at: Option<String>,
    pub camera_model: Option<String>,
    pub focal_length_mm: Option<f64>,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    pub gps_altitude: Option<f64>,
    /// Prior classification merged from an external class file
    pub classification: Option<i64>,
}

impl RenameRecord {
    /// A row for a file that never got a name.
    pub fn failed(original_path: PathBuf, error: impl Into<String>) -> Self {
        Self {
            original_path,
            new_path: PathBuf::new(),
            new_name: String::new(),
            status: RenameStatus::Failed,
            error: Some(error.into()),
            progressive_id: None,
            captured_at: None,
            camera_model: None,
            focal_length_mm: None,
            gps_latitude: None,
            gps_longitude: None,
            gps_altitude: None,
            classification: None,
        }
    }

    /// Original file name, used to join prior classifications.
    pub fn original_name(&self) -> Option<&str> {
        self.original_path.file_name().and_then(|n| n.to_str())
    }
}

/// Batch statistics.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct RenameStats {
    pub renamed: usize,
    pub skipped: usize,
    pub failed: usize,
    pub elapsed_seconds: f64,
}

impl RenameStats {
    pub fn from_records(records: &[RenameRecord], elapsed_seconds: f64) -> Self {
        let mut stats = Self {
            elapsed_seconds,
            ..Self::default()
        };
        for record in records {
            match record.status {
                RenameStatus::Renamed => stats.renamed += 1,
                RenameStatus::Skipped => stats.skipped += 1,
                RenameStatus::Failed => stats.failed += 1,
            }
        }
        stats
    }

    pub fn total(&self) -> usize {
        self.renamed + self.skipped + self.failed
    }
}

/// Full result of a batch run: ordered rows plus counts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RenameReport {
    pub records: Vec<RenameRecord>,
    pub stats: RenameStats,
}
