//! Provenance tables: the persisted original → new mapping of a batch.
//!
//! Four interchangeable encodings of the same rows:
//! - **Csv**: header row, empty cells for missing values
//! - **Parquet**: Arrow schema with nullable columns
//! - **Json**: one array of objects
//! - **JsonLines**: one object per line

use arrow::array::{
    Array, ArrayRef, Float64Array, Float64Builder, Int64Array, Int64Builder, StringArray,
    StringBuilder, UInt64Array, UInt64Builder,
};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::arrow_reader::ParquetRecordBatchReaderBuilder;
use parquet::arrow::ArrowWriter;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::fs::File;
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::ProvenanceError;
use crate::types::{RenameRecord, RenameStatus};

/// Table encoding.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProvenanceFormat {
    Csv,
    Parquet,
    Json,
    #[serde(rename = "jsonl")]
    JsonLines,
}

impl ProvenanceFormat {
    /// Infer the format from a file extension.
    pub fn from_path(path: &Path) -> Result<Self, ProvenanceError> {
        path.extension()
            .and_then(|e| e.to_str())
            .and_then(|e| e.parse().ok())
            .ok_or_else(|| ProvenanceError::UnknownFormat(path.to_path_buf()))
    }

    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Parquet => "parquet",
            Self::Json => "json",
            Self::JsonLines => "jsonl",
        }
    }
}

impl FromStr for ProvenanceFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().trim_start_matches('.').to_lowercase().as_str() {
            "csv" => Ok(Self::Csv),
            "parquet" | "pq" => Ok(Self::Parquet),
            "json" => Ok(Self::Json),
            "jsonl" | "jsonlines" | "ndjson" => Ok(Self::JsonLines),
            other => Err(format!(
                "unknown provenance format {other:?} (expected csv, parquet, json or jsonl)"
            )),
        }
    }
}

impl fmt::Display for ProvenanceFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

/// Write `records` to `path`, replacing any existing file.
pub fn write_records(
    path: &Path,
    records: &[RenameRecord],
    format: ProvenanceFormat,
) -> Result<(), ProvenanceError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        std::fs::create_dir_all(parent)?;
    }
    match format {
        ProvenanceFormat::Csv => {
            let mut writer = csv::Writer::from_path(path)?;
            for record in records {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }
        ProvenanceFormat::Json => {
            let mut writer = BufWriter::new(File::create(path)?);
            serde_json::to_writer_pretty(&mut writer, records)?;
            writeln!(writer)?;
            writer.flush()?;
        }
        ProvenanceFormat::JsonLines => {
            let mut writer = BufWriter::new(File::create(path)?);
            for record in records {
                serde_json::to_writer(&mut writer, record)?;
                writeln!(writer)?;
            }
            writer.flush()?;
        }
        ProvenanceFormat::Parquet => write_parquet(path, records)?,
    }
    tracing::info!("Wrote {} provenance rows to {:?}", records.len(), path);
    Ok(())
}

/// Read rows back from `path`.
pub fn read_records(
    path: &Path,
    format: ProvenanceFormat,
) -> Result<Vec<RenameRecord>, ProvenanceError> {
    let records = match format {
        ProvenanceFormat::Csv => {
            let mut reader = csv::Reader::from_path(path)?;
            reader
                .deserialize()
                .collect::<Result<Vec<RenameRecord>, _>>()?
        }
        ProvenanceFormat::Json => serde_json::from_reader(BufReader::new(File::open(path)?))?,
        ProvenanceFormat::JsonLines => {
            let mut records = Vec::new();
            for line in BufReader::new(File::open(path)?).lines() {
                let line = line?;
                if line.trim().is_empty() {
                    continue;
                }
                records.push(serde_json::from_str(&line)?);
            }
            records
        }
        ProvenanceFormat::Parquet => read_parquet(path)?,
    };
    tracing::debug!("Read {} provenance rows from {:?}", records.len(), path);
    Ok(records)
}

fn schema() -> Schema {
    Schema::new(vec![
        Field::new("original_path", DataType::Utf8, false),
        Field::new("new_path", DataType::Utf8, false),
        Field::new("new_name", DataType::Utf8, false),
        Field::new("status", DataType::Utf8, false),
        Field::new("error", DataType::Utf8, true),
        Field::new("progressive_id", DataType::UInt64, true),
        Field::new("captured_at", DataType::Utf8, true),
        Field::new("camera_model", DataType::Utf8, true),
        Field::new("focal_length_mm", DataType::Float64, true),
        Field::new("gps_latitude", DataType::Float64, true),
        Field::new("gps_longitude", DataType::Float64, true),
        Field::new("gps_altitude", DataType::Float64, true),
        Field::new("classification", DataType::Int64, true),
    ])
}

fn string_column<'a>(values: impl Iterator<Item = Option<&'a str>>) -> ArrayRef {
    let mut builder = StringBuilder::new();
    for value in values {
        builder.append_option(value);
    }
    Arc::new(builder.finish())
}

fn float_column(values: impl Iterator<Item = Option<f64>>) -> ArrayRef {
    let mut builder = Float64Builder::new();
    for value in values {
        builder.append_option(value);
    }
    Arc::new(builder.finish())
}

/// Paths are stored as text; a lossy copy could not be undone.
fn path_text(path: &Path) -> Result<&str, ProvenanceError> {
    path.to_str()
        .ok_or_else(|| ProvenanceError::Malformed(format!("path is not valid UTF-8: {path:?}")))
}

fn write_parquet(path: &Path, records: &[RenameRecord]) -> Result<(), ProvenanceError> {
    let schema = Arc::new(schema());

    let mut ids = UInt64Builder::new();
    let mut classes = Int64Builder::new();
    for record in records {
        ids.append_option(record.progressive_id);
        classes.append_option(record.classification);
    }
    let paths = records
        .iter()
        .map(|r| path_text(&r.original_path))
        .collect::<Result<Vec<_>, _>>()?;
    let new_paths = records
        .iter()
        .map(|r| path_text(&r.new_path))
        .collect::<Result<Vec<_>, _>>()?;

    let columns: Vec<ArrayRef> = vec![
        string_column(paths.iter().copied().map(Some)),
        string_column(new_paths.iter().copied().map(Some)),
        string_column(records.iter().map(|r| Some(r.new_name.as_str()))),
        string_column(records.iter().map(|r| Some(r.status.as_str()))),
        string_column(records.iter().map(|r| r.error.as_deref())),
        Arc::new(ids.finish()),
        string_column(records.iter().map(|r| r.captured_at.as_deref())),
        string_column(records.iter().map(|r| r.camera_model.as_deref())),
        float_column(records.iter().map(|r| r.focal_length_mm)),
        float_column(records.iter().map(|r| r.gps_latitude)),
        float_column(records.iter().map(|r| r.gps_longitude)),
        float_column(records.iter().map(|r| r.gps_altitude)),
        Arc::new(classes.finish()),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns)?;

    let file = File::create(path)?;
    let mut writer = ArrowWriter::try_new(file, schema, None)?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(())
}

fn column<'a, T: 'static>(batch: &'a RecordBatch, name: &str) -> Result<&'a T, ProvenanceError> {
    batch
        .column_by_name(name)
        .ok_or_else(|| ProvenanceError::Malformed(format!("missing column {name:?}")))?
        .as_any()
        .downcast_ref::<T>()
        .ok_or_else(|| ProvenanceError::Malformed(format!("column {name:?} has the wrong type")))
}

fn opt_str(array: &StringArray, row: usize) -> Option<String> {
    (!array.is_null(row)).then(|| array.value(row).to_string())
}

fn opt_f64(array: &Float64Array, row: usize) -> Option<f64> {
    (!array.is_null(row)).then(|| array.value(row))
}

fn read_parquet(path: &Path) -> Result<Vec<RenameRecord>, ProvenanceError> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(File::open(path)?)?.build()?;
    let mut records = Vec::new();

    for batch in reader {
        let batch = batch?;
        let original = column::<StringArray>(&batch, "original_path")?;
        let new_path = column::<StringArray>(&batch, "new_path")?;
        let new_name = column::<StringArray>(&batch, "new_name")?;
        let status = column::<StringArray>(&batch, "status")?;
        let error = column::<StringArray>(&batch, "error")?;
        let ids = column::<UInt64Array>(&batch, "progressive_id")?;
        let captured = column::<StringArray>(&batch, "captured_at")?;
        let model = column::<StringArray>(&batch, "camera_model")?;
        let focal = column::<Float64Array>(&batch, "focal_length_mm")?;
        let lat = column::<Float64Array>(&batch, "gps_latitude")?;
        let lon = column::<Float64Array>(&batch, "gps_longitude")?;
        let alt = column::<Float64Array>(&batch, "gps_altitude")?;
        let classes = column::<Int64Array>(&batch, "classification")?;

        for row in 0..batch.num_rows() {
            let status_text = status.value(row);
            let status = RenameStatus::parse(status_text).ok_or_else(|| {
                ProvenanceError::Malformed(format!("unknown status {status_text:?}"))
            })?;
            records.push(RenameRecord {
                original_path: PathBuf::from(original.value(row)),
                new_path: PathBuf::from(new_path.value(row)),
                new_name: new_name.value(row).to_string(),
                status,
                error: opt_str(error, row),
                progressive_id: (!ids.is_null(row)).then(|| ids.value(row)),
                captured_at: opt_str(captured, row),
                camera_model: opt_str(model, row),
                focal_length_mm: opt_f64(focal, row),
                gps_latitude: opt_f64(lat, row),
                gps_longitude: opt_f64(lon, row),
                gps_altitude: opt_f64(alt, row),
                classification: (!classes.is_null(row)).then(|| classes.value(row)),
            });
        }
    }
    Ok(records)
}

/// `(new_path, original_path)` for every renamed row, in table order.
pub fn reverse_plan(records: &[RenameRecord]) -> Vec<(PathBuf, PathBuf)> {
    records
        .iter()
        .filter(|r| r.status == RenameStatus::Renamed)
        .map(|r| (r.new_path.clone(), r.original_path.clone()))
        .collect()
}

/// What happened to one row during undo.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum UndoStatus {
    /// Original restored (or already present) and the renamed copy removed
    Restored,
    /// Dry run: would have been restored
    Planned,
    Failed,
}

#[derive(Debug, Clone, Serialize)]
pub struct UndoOutcome {
    pub new_path: PathBuf,
    pub original_path: PathBuf,
    pub status: UndoStatus,
    pub error: Option<String>,
}

/// Reverse a batch from its provenance rows.
///
/// For each renamed row, copies the file back when the original is gone,
/// then removes the renamed copy. Rows are processed in reverse order.
pub fn undo(records: &[RenameRecord], dry_run: bool) -> Vec<UndoOutcome> {
    let mut outcomes: Vec<UndoOutcome> = reverse_plan(records)
        .into_iter()
        .rev()
        .map(|(new_path, original_path)| {
            let result = if dry_run {
                check_undo(&new_path, &original_path).map(|_| UndoStatus::Planned)
            } else {
                undo_one(&new_path, &original_path).map(|_| UndoStatus::Restored)
            };
            match result {
                Ok(status) => UndoOutcome {
                    new_path,
                    original_path,
                    status,
                    error: None,
                },
                Err(e) => {
                    tracing::error!("Undo failed for {:?}: {e}", new_path);
                    UndoOutcome {
                        new_path,
                        original_path,
                        status: UndoStatus::Failed,
                        error: Some(e),
                    }
                }
            }
        })
        .collect();
    outcomes.reverse();
    outcomes
}

fn check_undo(new_path: &Path, original_path: &Path) -> Result<(), String> {
    if new_path == original_path {
        return Err("renamed path equals original path".into());
    }
    if !new_path.exists() {
        return Err(format!("renamed file {} is missing", new_path.display()));
    }
    Ok(())
}

fn undo_one(new_path: &Path, original_path: &Path) -> Result<(), String> {
    check_undo(new_path, original_path)?;
    if !original_path.exists() {
        if let Some(parent) = original_path.parent() {
            std::fs::create_dir_all(parent)
                .map_err(|e| format!("cannot create {}: {e}", parent.display()))?;
        }
        std::fs::copy(new_path, original_path).map_err(|e| format!("copy back failed: {e}"))?;
    }
    std::fs::remove_file(new_path).map_err(|e| format!("cannot remove renamed file: {e}"))?;
    tracing::debug!("Restored {:?} from {:?}", original_path, new_path);
    Ok(())
}

/// Classes from an earlier labelling pass, keyed by original file name.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PriorClasses(HashMap<String, i64>);

impl PriorClasses {
    pub fn get(&self, name: &str) -> Option<i64> {
        self.0.get(name).copied()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

impl FromIterator<(String, i64)> for PriorClasses {
    fn from_iter<I: IntoIterator<Item = (String, i64)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

/// Read a headerless `name,class` CSV.
pub fn load_prior_classes(path: &Path) -> Result<PriorClasses, ProvenanceError> {
    let mut reader = csv::ReaderBuilder::new()
        .has_headers(false)
        .trim(csv::Trim::All)
        .from_path(path)?;
    let mut classes = HashMap::new();
    for (line, row) in reader.records().enumerate() {
        let row = row?;
        let (Some(name), Some(class)) = (row.get(0), row.get(1)) else {
            return Err(ProvenanceError::Malformed(format!(
                "line {}: expected `name,class`",
                line + 1
            )));
        };
        let class: i64 = class.parse().map_err(|_| {
            ProvenanceError::Malformed(format!("line {}: class {class:?} is not an integer", line + 1))
        })?;
        classes.insert(name.to_string(), class);
    }
    Ok(PriorClasses(classes))
}

/// Fill `classification` by original file name. Returns how many rows matched.
pub fn merge_classes(records: &mut [RenameRecord], classes: &PriorClasses) -> usize {
    let mut merged = 0;
    for record in records.iter_mut() {
        if let Some(class) = record.original_name().and_then(|n| classes.get(n)) {
            record.classification = Some(class);
            merged += 1;
        }
    }
    merged
}
