//! Error types for imprep.
//!
//! Errors are split by concern. Per-file failures (`MetadataError`, I/O during
//! commit) never escape a batch: the rename engine turns them into `failed`
//! provenance rows. Only configuration conflicts and invariant violations
//! (`RenameError`) abort a run.

use std::path::PathBuf;
use thiserror::Error;

/// Top-level error type for imprep operations.
#[derive(Error, Debug)]
pub enum ImprepError {
    /// Configuration-related errors
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    /// Directory scanning errors
    #[error("Discovery error: {0}")]
    Discovery(#[from] DiscoveryError),

    /// Metadata extraction errors
    #[error("Metadata error: {0}")]
    Metadata(#[from] MetadataError),

    /// Batch rename errors
    #[error("Rename error: {0}")]
    Rename(#[from] RenameError),

    /// Provenance export/import errors
    #[error("Provenance error: {0}")]
    Provenance(#[from] ProvenanceError),

    /// RAW conversion setup errors
    #[error("Conversion error: {0}")]
    Convert(#[from] ConvertError),

    /// File organizer errors
    #[error("Organize error: {0}")]
    Organize(#[from] OrganizeError),

    /// General I/O errors
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file from disk
    #[error("Failed to read config file: {0}")]
    ReadError(#[from] std::io::Error),

    /// Failed to parse TOML configuration
    #[error("Failed to parse config: {0}")]
    ParseError(#[from] toml::de::Error),

    /// Configuration values are invalid
    #[error("Invalid configuration: {0}")]
    ValidationError(String),
}

/// Errors raised while building an image list.
#[derive(Error, Debug)]
pub enum DiscoveryError {
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Cannot resolve {path}: {source}")]
    Resolve {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Metadata extraction failed for a single file.
#[derive(Error, Debug, Clone)]
pub enum MetadataError {
    #[error("Unreadable metadata in {path}: {message}")]
    Unreadable { path: PathBuf, message: String },
}

impl MetadataError {
    pub fn unreadable(path: &std::path::Path, message: impl Into<String>) -> Self {
        Self::Unreadable {
            path: path.to_path_buf(),
            message: message.into(),
        }
    }
}

/// Batch-level rename failures. Per-file problems are never reported here.
#[derive(Error, Debug)]
pub enum RenameError {
    /// Options that cannot be honoured together; detected before any file is touched
    #[error("Configuration conflict: {0}")]
    ConfigurationConflict(String),

    /// Two entries still share a destination after suffixing
    #[error("Collision could not be resolved for {0}")]
    CollisionUnresolvable(PathBuf),

    /// The destination root could not be prepared
    #[error("Cannot prepare destination {path}: {source}")]
    Destination {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Provenance table errors.
#[derive(Error, Debug)]
pub enum ProvenanceError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Arrow error: {0}")]
    Arrow(#[from] arrow::error::ArrowError),

    #[error("Parquet error: {0}")]
    Parquet(#[from] parquet::errors::ParquetError),

    #[error("Unknown provenance format for {0}")]
    UnknownFormat(PathBuf),

    #[error("Malformed provenance table: {0}")]
    Malformed(String),
}

/// RAW converter setup errors. Per-file conversion failures are outcomes, not errors.
#[derive(Error, Debug)]
pub enum ConvertError {
    #[error("Converter executable not found: {0}")]
    ExecutableNotFound(String),

    #[error("Processing profile does not exist: {0}")]
    ProfileNotFound(PathBuf),

    #[error("Cannot create output directory {path}: {source}")]
    OutputDir {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Organizer errors.
#[derive(Error, Debug)]
pub enum OrganizeError {
    #[error("Not a directory: {0}")]
    NotADirectory(PathBuf),

    #[error("Failed to organize {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
}

/// Convenience type alias for imprep results.
pub type Result<T> = std::result::Result<T, ImprepError>;
