//! One discovered image and its lazily resolved metadata.

use chrono::NaiveDateTime;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use super::intrinsics::IntrinsicsResolver;
use super::metadata::MetadataReader;
use super::sensor::SensorSizeTable;
use crate::error::MetadataError;
use crate::types::{CameraIntrinsics, TagMap};

/// Metadata cache state. Resolution happens at most once per identity.
#[derive(Debug, Clone, Default)]
pub enum TagState {
    #[default]
    Unresolved,
    Resolved(Arc<TagMap>),
}

/// A discovered image file.
///
/// Created during discovery without touching the file; tags are read on the
/// first call to [`ImageIdentity::resolve`] and reused afterwards.
#[derive(Debug, Clone)]
pub struct ImageIdentity {
    path: PathBuf,
    tags: TagState,
}

impl ImageIdentity {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            tags: TagState::Unresolved,
        }
    }

    /// Build an identity whose tags are already known.
    pub fn with_tags(path: impl Into<PathBuf>, tags: TagMap) -> Self {
        Self {
            path: path.into(),
            tags: TagState::Resolved(Arc::new(tags)),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// File name including extension.
    pub fn file_name(&self) -> &str {
        self.path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
    }

    /// File name without extension.
    pub fn stem(&self) -> &str {
        self.path
            .file_stem()
            .and_then(|n| n.to_str())
            .unwrap_or("unknown")
    }

    /// Extension as found on disk, without the dot.
    pub fn extension(&self) -> Option<&str> {
        self.path.extension().and_then(|e| e.to_str())
    }

    pub fn parent(&self) -> Option<&Path> {
        self.path.parent()
    }

    pub fn is_resolved(&self) -> bool {
        matches!(self.tags, TagState::Resolved(_))
    }

    /// Tags if they have already been read.
    pub fn tags(&self) -> Option<&TagMap> {
        match &self.tags {
            TagState::Resolved(tags) => Some(tags.as_ref()),
            TagState::Unresolved => None,
        }
    }

    /// Read the tags on first access; later calls return the cached map.
    ///
    /// A failed read leaves the identity unresolved.
    pub fn resolve(&mut self) -> Result<Arc<TagMap>, MetadataError> {
        if let TagState::Resolved(tags) = &self.tags {
            return Ok(tags.clone());
        }
        let tags = Arc::new(MetadataReader::read(&self.path)?);
        self.tags = TagState::Resolved(tags.clone());
        Ok(tags)
    }

    /// Capture timestamp from resolved tags.
    pub fn captured_at(&self) -> Option<NaiveDateTime> {
        self.tags().and_then(TagMap::captured_at)
    }

    /// Pixel dimensions from tags, or from the image header when the tags
    /// do not carry them.
    pub fn dimensions(&self) -> Option<(u32, u32)> {
        self.tags()
            .and_then(TagMap::image_size)
            .or_else(|| image::image_dimensions(&self.path).ok())
    }

    /// Intrinsics derived from resolved tags; `None` when unresolved or
    /// when required tags are missing.
    pub fn intrinsics(&self, sensors: &SensorSizeTable) -> Option<CameraIntrinsics> {
        let tags = self.tags()?;
        let (width, height) = self.dimensions()?;
        IntrinsicsResolver::resolve_with_size(tags, sensors, width, height)
    }

    /// Intrinsics using dimensions the caller already knows (e.g. from a decode).
    pub fn intrinsics_with_size(
        &self,
        sensors: &SensorSizeTable,
        width: u32,
        height: u32,
    ) -> Option<CameraIntrinsics> {
        IntrinsicsResolver::resolve_with_size(self.tags()?, sensors, width, height)
    }
}
