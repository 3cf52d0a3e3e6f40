//! CLI enum types shared by several commands.

use clap::ValueEnum;
use imprep_core::ProvenanceFormat;

/// Provenance table formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq, ValueEnum)]
pub enum TableFormat {
    /// Comma-separated values with a header row
    Csv,
    /// Columnar Apache Parquet
    Parquet,
    /// Single JSON array
    Json,
    /// One JSON object per line (newline-delimited)
    Jsonl,
}

impl From<TableFormat> for ProvenanceFormat {
    fn from(format: TableFormat) -> Self {
        match format {
            TableFormat::Csv => ProvenanceFormat::Csv,
            TableFormat::Parquet => ProvenanceFormat::Parquet,
            TableFormat::Json => ProvenanceFormat::Json,
            TableFormat::Jsonl => ProvenanceFormat::JsonLines,
        }
    }
}

impl std::fmt::Display for TableFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", ProvenanceFormat::from(*self))
    }
}
