//! Batch renaming: naming, collision resolution, commit and previews.
//!
//! A batch moves every file through `named → collision-checked → committed`,
//! ending as one [`crate::types::RenameRecord`] per input file:
//!
//! ```text
//! ImageList → plan() → resolve_collisions() → commit() → RenameReport
//! ```

pub mod collision;
pub mod commit;
pub mod engine;
pub mod naming;
pub mod preview;

pub use collision::resolve_collisions;
pub use engine::{RenameEngine, RenameOptions};
pub use naming::NamingScheme;
pub use preview::{make_previews, PreviewOptions, PreviewOutcome};

use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Commit scheduling policy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Parallelism {
    /// Parallel unless progressive ids are requested
    #[default]
    Auto,
    Parallel,
    Sequential,
}

impl FromStr for Parallelism {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "parallel" => Ok(Self::Parallel),
            "sequential" => Ok(Self::Sequential),
            other => Err(format!(
                "unknown parallelism {other:?} (expected auto, parallel or sequential)"
            )),
        }
    }
}

impl fmt::Display for Parallelism {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Auto => "auto",
            Self::Parallel => "parallel",
            Self::Sequential => "sequential",
        })
    }
}

/// Shared cancellation signal. Once raised, no new commit starts.
#[derive(Debug, Clone, Default)]
pub struct CancelFlag(Arc<AtomicBool>);

impl CancelFlag {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }
}

/// Outcome of naming one file.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanTarget {
    /// Candidate file name, before collision checks
    Named(String),
    /// Metadata could not be read; the file gets a `failed` row
    Failed(String),
}

/// Provenance columns captured while planning.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PlanDetails {
    pub captured_at: Option<String>,
    pub camera_model: Option<String>,
    pub focal_length_mm: Option<f64>,
    pub gps_latitude: Option<f64>,
    pub gps_longitude: Option<f64>,
    pub gps_altitude: Option<f64>,
}

/// One file after naming.
#[derive(Debug, Clone, PartialEq)]
pub struct PlannedRename {
    pub source: PathBuf,
    /// Destination subdirectory relative to the destination root
    pub subdir: PathBuf,
    pub progressive_id: Option<u64>,
    pub target: PlanTarget,
    pub details: PlanDetails,
}

impl PlannedRename {
    pub fn candidate(&self) -> Option<&str> {
        match &self.target {
            PlanTarget::Named(name) => Some(name),
            PlanTarget::Failed(_) => None,
        }
    }
}

/// One file after collision resolution. `name` is `None` for failed plans.
#[derive(Debug, Clone, PartialEq)]
pub struct ResolvedRename {
    pub plan: PlannedRename,
    pub name: Option<String>,
}
