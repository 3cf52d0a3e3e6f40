//! Filesystem mutation for resolved renames.
//!
//! Each job copies one source to its destination, optionally verifies the
//! copy, then optionally removes the source. Jobs run one at a time or on a
//! bounded pool; outcomes always come back in job order.

use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;
use tokio::task::JoinHandle;

use super::CancelFlag;
use crate::pipeline::ContentHasher;

/// Reason recorded for entries that never started.
pub const CANCELLED: &str = "cancelled";

/// Callback fired after each finished job.
pub type ProgressFn = Arc<dyn Fn(&Path) + Send + Sync>;

/// One copy-then-maybe-delete operation.
#[derive(Debug, Clone)]
pub struct CommitJob {
    pub source: PathBuf,
    pub dest: PathBuf,
    pub overwrite: bool,
    pub delete_original: bool,
    pub verify: bool,
}

/// How a job ended.
#[derive(Debug, Clone, PartialEq)]
pub enum CommitOutcome {
    Renamed,
    Skipped(String),
    Failed(String),
}

/// Run one job to completion. Blocking.
pub fn commit_file(job: &CommitJob) -> CommitOutcome {
    if let Some(parent) = job.dest.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            return CommitOutcome::Failed(format!("cannot create {}: {e}", parent.display()));
        }
    }

    if job.dest.exists() {
        if same_file(&job.source, &job.dest) {
            return CommitOutcome::Skipped("source and destination are the same file".into());
        }
        if !job.overwrite {
            tracing::debug!("Destination exists, skipping: {:?}", job.dest);
            return CommitOutcome::Skipped("destination exists".into());
        }
    }

    if let Err(e) = std::fs::copy(&job.source, &job.dest) {
        tracing::error!("Copy failed {:?} -> {:?}: {e}", job.source, job.dest);
        return CommitOutcome::Failed(format!("copy failed: {e}"));
    }

    if job.verify {
        match ContentHasher::same_contents(&job.source, &job.dest) {
            Ok(true) => {}
            Ok(false) => {
                let _ = std::fs::remove_file(&job.dest);
                return CommitOutcome::Failed("copy verification failed: contents differ".into());
            }
            Err(e) => return CommitOutcome::Failed(format!("copy verification failed: {e}")),
        }
    }

    if job.delete_original {
        if let Err(e) = std::fs::remove_file(&job.source) {
            tracing::error!("Could not remove original {:?}: {e}", job.source);
            return CommitOutcome::Failed(format!("copied but could not remove original: {e}"));
        }
    }

    tracing::debug!("Committed {:?} -> {:?}", job.source, job.dest);
    CommitOutcome::Renamed
}

fn same_file(a: &Path, b: &Path) -> bool {
    match (a.canonicalize(), b.canonicalize()) {
        (Ok(a), Ok(b)) => a == b,
        _ => false,
    }
}

enum Slot {
    Running(JoinHandle<CommitOutcome>),
    Done(CommitOutcome),
}

/// Run jobs with at most `workers` in flight (1 = sequential).
///
/// Once `cancel` is raised, jobs not yet started end as
/// `Skipped("cancelled")`; running ones finish.
pub async fn commit_all(
    jobs: Vec<CommitJob>,
    workers: usize,
    cancel: &CancelFlag,
    progress: Option<ProgressFn>,
) -> Vec<CommitOutcome> {
    let semaphore = Arc::new(Semaphore::new(workers.max(1)));
    let mut slots = Vec::with_capacity(jobs.len());

    for job in jobs {
        if cancel.is_cancelled() {
            slots.push(Slot::Done(CommitOutcome::Skipped(CANCELLED.into())));
            continue;
        }
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                tracing::warn!("Commit semaphore closed unexpectedly, stopping batch");
                slots.push(Slot::Done(CommitOutcome::Skipped(CANCELLED.into())));
                continue;
            }
        };
        // A permit may free up after cancellation was requested
        if cancel.is_cancelled() {
            drop(permit);
            slots.push(Slot::Done(CommitOutcome::Skipped(CANCELLED.into())));
            continue;
        }

        let progress = progress.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let outcome = commit_file(&job);
            drop(permit);
            if let Some(progress) = progress {
                progress(&job.source);
            }
            outcome
        });
        slots.push(Slot::Running(handle));
    }

    let mut outcomes = Vec::with_capacity(slots.len());
    for slot in slots {
        let outcome = match slot {
            Slot::Done(outcome) => outcome,
            Slot::Running(handle) => match handle.await {
                Ok(outcome) => outcome,
                Err(e) => {
                    tracing::error!("Commit task panicked: {e}");
                    CommitOutcome::Failed(format!("commit task panicked: {e}"))
                }
            },
        };
        outcomes.push(outcome);
    }
    outcomes
}
