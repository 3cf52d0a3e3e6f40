//! Per-image stages ahead of renaming.
//!
//! - **discovery**: Find image files and build an ordered [`ImageList`]
//! - **identity**: One image and its lazily resolved tags
//! - **metadata**: Read EXIF fields into a [`crate::types::TagMap`]
//! - **sensor**: Camera model → sensor width table
//! - **intrinsics**: Pinhole camera matrix from tags
//! - **hash**: Content hashes for copy verification

pub mod discovery;
pub mod hash;
pub mod identity;
pub mod intrinsics;
pub mod metadata;
pub mod sensor;

pub use discovery::{common_root, ExtensionFilter, ImageList};
pub use hash::ContentHasher;
pub use identity::{ImageIdentity, TagState};
pub use intrinsics::IntrinsicsResolver;
pub use metadata::MetadataReader;
pub use sensor::SensorSizeTable;
