//! imprep core - image preparation library.
//!
//! Turns a directory of camera images into a consistently named, traceable
//! dataset: discovery, EXIF identity, camera intrinsics, collision-safe batch
//! renaming with provenance, plus RAW conversion, organizing and previews.
//!
//! # Architecture
//!
//! ```text
//! Directory → ImageList → EXIF tags → names → collisions → copy/move → provenance
//! ```
//!
//! # Usage
//!
//! ```rust,ignore
//! use imprep_core::{CancelFlag, Config, Imprep};
//!
//! #[tokio::main]
//! async fn main() -> imprep_core::Result<()> {
//!     let imprep = Imprep::new(Config::load()?)?;
//!     let report = imprep.rename("./flight1", &CancelFlag::new()).await?;
//!     println!("{} renamed", report.stats.renamed);
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod convert;
pub mod error;
pub mod organize;
pub mod overlay;
pub mod pipeline;
pub mod provenance;
pub mod rename;
pub mod types;

#[cfg(test)]
pub(crate) mod test_helpers;

pub use config::Config;
pub use convert::{ConversionOutcome, ConversionStatus, RawConverter};
pub use error::{
    ConfigError, ConvertError, DiscoveryError, ImprepError, MetadataError, OrganizeError,
    ProvenanceError, RenameError, Result,
};
pub use organize::{OrganizeSummary, Organizer};
pub use overlay::{overlay_text, OverlayStyle};
pub use pipeline::{ImageIdentity, ImageList, SensorSizeTable};
pub use provenance::{PriorClasses, ProvenanceFormat};
pub use rename::{CancelFlag, Parallelism, RenameEngine, RenameOptions};
pub use types::{CameraIntrinsics, RenameRecord, RenameReport, RenameStats, RenameStatus, TagMap};

use std::path::Path;
use std::sync::Arc;

/// Library version.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Config-driven entry point tying discovery and the rename engine together.
pub struct Imprep {
    config: Config,
    sensors: Arc<SensorSizeTable>,
}

impl Imprep {
    pub fn new(config: Config) -> Result<Self> {
        tracing::debug!("Initializing imprep v{}", VERSION);
        let sensors = config.sensor_table()?;
        Ok(Self { config, sensors })
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn sensors(&self) -> &Arc<SensorSizeTable> {
        &self.sensors
    }

    /// Discover images under `input` with the configured filter.
    pub fn scan(&self, input: impl AsRef<Path>) -> Result<ImageList> {
        let discovery = &self.config.discovery;
        Ok(ImageList::scan(
            input.as_ref(),
            &discovery.extensions,
            discovery.recursive,
        )?)
    }

    /// Scan `input` and rename everything into the configured destination.
    ///
    /// Writes a provenance table next to the renamed files when
    /// `rename.provenance_format` is set.
    pub async fn rename(
        &self,
        input: impl AsRef<Path>,
        cancel: &CancelFlag,
    ) -> Result<RenameReport> {
        let mut list = self.scan(input)?;
        let engine = RenameEngine::new(RenameOptions::from_config(&self.config)?)?;
        let report = engine.run(&mut list, cancel).await?;

        if let Some(format) = self.config.rename.provenance_format {
            let path = self
                .config
                .destination()
                .join(format!("provenance.{}", format.extension()));
            provenance::write_records(&path, &report.records, format)?;
        }
        Ok(report)
    }

    /// Intrinsics for a single file, if its tags and the sensor table allow.
    pub fn intrinsics(&self, path: impl AsRef<Path>) -> Result<Option<CameraIntrinsics>> {
        let mut image = ImageIdentity::new(path.as_ref());
        image.resolve()?;
        Ok(image.intrinsics(&self.sensors))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_helpers::{write_exif_jpeg, ExifFixture};

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[tokio::test]
    async fn test_rename_writes_provenance() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("in");
        std::fs::create_dir_all(&input).unwrap();
        write_exif_jpeg(&input.join("DJI_0001.JPG"), &ExifFixture::dji("2023:05:16 11:34:34"));

        let mut config = Config::default();
        config.rename.destination = dir.path().join("out");
        config.rename.provenance_format = Some(ProvenanceFormat::Csv);

        let imprep = Imprep::new(config).unwrap();
        let report = imprep.rename(&input, &CancelFlag::new()).await.unwrap();
        assert_eq!(report.stats.renamed, 1);

        let table = dir.path().join("out/provenance.csv");
        let rows = provenance::read_records(&table, ProvenanceFormat::Csv).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].status, RenameStatus::Renamed);
    }

    #[test]
    fn test_intrinsics_for_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("a.jpg");
        write_exif_jpeg(&path, &ExifFixture::dji("2023:05:16 11:34:34"));

        let imprep = Imprep::new(Config::default()).unwrap();
        assert!(imprep.intrinsics(&path).unwrap().is_some());
    }
}
