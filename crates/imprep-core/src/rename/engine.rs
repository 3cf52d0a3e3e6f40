//! The batch rename engine.

use std::path::{Path, PathBuf};
use std::time::Instant;

use super::collision;
use super::commit::{commit_all, CommitJob, CommitOutcome, ProgressFn};
use super::naming::NamingScheme;
use super::preview::{default_workers, make_previews, PreviewOptions, PreviewOutcome};
use super::{CancelFlag, Parallelism, PlanDetails, PlanTarget, PlannedRename, ResolvedRename};
use crate::config::{Config, NamingConfig};
use crate::error::{ConfigError, RenameError};
use crate::pipeline::ImageList;
use crate::provenance::{merge_classes, PriorClasses};
use crate::types::{
    RenameRecord, RenameReport, RenameStats, RenameStatus, TagMap, RECORD_DATE_TIME_FORMAT,
};

/// Everything a batch needs besides the image list.
#[derive(Debug, Clone)]
pub struct RenameOptions {
    /// Destination root
    pub destination: PathBuf,
    pub naming: NamingConfig,
    pub parallelism: Parallelism,
    /// Commit workers in parallel mode; `None` uses available parallelism
    pub workers: Option<usize>,
    /// Mirror source subdirectories relative to the list root
    pub keep_dir_tree: bool,
    pub overwrite: bool,
    /// Hash-compare copies; `None` verifies exactly when originals are deleted
    pub verify_copies: Option<bool>,
    /// First progressive id
    pub first_id: u64,
    /// Classes merged into the report by original file name
    pub prior_classes: Option<PriorClasses>,
    /// Used when `naming.overlay_name` is set
    pub preview: PreviewOptions,
}

impl Default for RenameOptions {
    fn default() -> Self {
        Self {
            destination: PathBuf::from("renamed"),
            naming: NamingConfig::default(),
            parallelism: Parallelism::Auto,
            workers: None,
            keep_dir_tree: false,
            overwrite: false,
            verify_copies: None,
            first_id: 0,
            prior_classes: None,
            preview: PreviewOptions::default(),
        }
    }
}

impl RenameOptions {
    /// Options from a loaded configuration.
    pub fn from_config(config: &Config) -> Result<Self, ConfigError> {
        let sensors = config.sensor_table()?;
        Ok(Self {
            destination: config.destination(),
            naming: config.naming.clone(),
            parallelism: config.rename.parallel,
            workers: config.rename.workers,
            keep_dir_tree: config.rename.keep_dir_tree,
            overwrite: config.rename.overwrite,
            verify_copies: config.rename.verify_copies,
            first_id: config.rename.first_id,
            prior_classes: None,
            preview: PreviewOptions::from_config(&config.preview, sensors),
        })
    }
}

/// Plans, resolves and commits a batch of renames.
pub struct RenameEngine {
    options: RenameOptions,
    parallel: bool,
    workers: usize,
    progress: Option<ProgressFn>,
}

impl RenameEngine {
    /// Validate options. Nothing on disk is touched.
    pub fn new(options: RenameOptions) -> Result<Self, RenameError> {
        if options.destination.as_os_str().is_empty() {
            return Err(RenameError::ConfigurationConflict(
                "destination path is empty".into(),
            ));
        }
        if options.workers == Some(0) {
            return Err(RenameError::ConfigurationConflict(
                "worker count must be at least 1".into(),
            ));
        }

        let progressive = options.naming.progressive_id;
        let parallel = match options.parallelism {
            Parallelism::Parallel if progressive => {
                return Err(RenameError::ConfigurationConflict(
                    "progressive ids require sequential execution".into(),
                ));
            }
            Parallelism::Parallel => true,
            Parallelism::Sequential => false,
            Parallelism::Auto => {
                tracing::debug!(
                    "Auto parallelism: {}",
                    if progressive { "sequential (progressive ids)" } else { "parallel" }
                );
                !progressive
            }
        };
        let workers = if parallel {
            options.workers.unwrap_or_else(default_workers)
        } else {
            1
        };

        Ok(Self {
            options,
            parallel,
            workers,
            progress: None,
        })
    }

    /// Call `progress` once per file as the commit phase finishes it.
    pub fn with_progress(mut self, progress: ProgressFn) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn options(&self) -> &RenameOptions {
        &self.options
    }

    pub fn is_parallel(&self) -> bool {
        self.parallel
    }

    pub fn workers(&self) -> usize {
        self.workers
    }

    /// Resolve tags and compute a candidate name for every image, in order.
    ///
    /// A metadata failure still consumes its progressive id so ids stay
    /// aligned with input positions.
    pub fn plan(&self, list: &mut ImageList) -> Vec<PlannedRename> {
        let naming = &self.options.naming;
        let root = if self.options.keep_dir_tree {
            list.root().to_path_buf()
        } else {
            PathBuf::new()
        };
        let mut counter = self.options.first_id;
        let mut plans = Vec::with_capacity(list.len());

        for image in list.iter_mut() {
            let progressive_id = naming.progressive_id.then_some(counter);
            counter += 1;

            let subdir = if self.options.keep_dir_tree {
                image
                    .parent()
                    .and_then(|p| p.strip_prefix(&root).ok())
                    .map(Path::to_path_buf)
                    .unwrap_or_default()
            } else {
                PathBuf::new()
            };

            // Sources must round-trip through text provenance tables
            if image.path().to_str().is_none() {
                tracing::error!("Path is not valid UTF-8: {:?}", image.path());
                plans.push(PlannedRename {
                    source: image.path().to_path_buf(),
                    subdir,
                    progressive_id,
                    target: PlanTarget::Failed("path is not valid UTF-8".to_string()),
                    details: PlanDetails::default(),
                });
                continue;
            }

            let (target, details) = match image.resolve() {
                Ok(tags) => {
                    let name =
                        NamingScheme::compute_name(image.path(), &tags, naming, progressive_id);
                    tracing::debug!("Planned {:?} -> {name}", image.path());
                    (PlanTarget::Named(name), details_from(&tags))
                }
                Err(e) => {
                    tracing::error!("{e}");
                    (PlanTarget::Failed(e.to_string()), PlanDetails::default())
                }
            };

            plans.push(PlannedRename {
                source: image.path().to_path_buf(),
                subdir,
                progressive_id,
                target,
                details,
            });
        }
        plans
    }

    /// Make every name unique within its destination directory.
    pub fn resolve_collisions(
        &self,
        plans: &[PlannedRename],
    ) -> Result<Vec<ResolvedRename>, RenameError> {
        collision::resolve_collisions(plans, &self.options.naming.separator)
    }

    /// Final path of a resolved entry, if it was named.
    pub fn destination_for(&self, entry: &ResolvedRename) -> Option<PathBuf> {
        let name = entry.name.as_ref()?;
        Some(self.options.destination.join(&entry.plan.subdir).join(name))
    }

    /// Apply resolved renames. Returns one record per entry, in order.
    pub async fn commit(
        &self,
        resolved: Vec<ResolvedRename>,
        cancel: &CancelFlag,
    ) -> Vec<RenameRecord> {
        let verify = self
            .options
            .verify_copies
            .unwrap_or(self.options.naming.delete_original);

        let mut jobs = Vec::new();
        let mut job_index = Vec::with_capacity(resolved.len());
        for entry in &resolved {
            match self.destination_for(entry) {
                Some(dest) => {
                    job_index.push(Some(jobs.len()));
                    jobs.push(CommitJob {
                        source: entry.plan.source.clone(),
                        dest,
                        overwrite: self.options.overwrite,
                        delete_original: self.options.naming.delete_original,
                        verify,
                    });
                }
                None => {
                    job_index.push(None);
                    if let Some(progress) = &self.progress {
                        progress(&entry.plan.source);
                    }
                }
            }
        }

        let outcomes = commit_all(jobs, self.workers, cancel, self.progress.clone()).await;

        resolved
            .into_iter()
            .zip(job_index)
            .map(|(entry, index)| {
                let dest = self.destination_for(&entry);
                let outcome = index.and_then(|i| outcomes.get(i)).cloned();
                build_record(entry, dest, outcome)
            })
            .collect()
    }

    /// Plan, resolve and commit `list`, then merge classes and render previews.
    ///
    /// Only pre-flight problems (unusable destination, unresolvable
    /// collisions) are errors; per-file problems become `failed` rows.
    pub async fn run(
        &self,
        list: &mut ImageList,
        cancel: &CancelFlag,
    ) -> Result<RenameReport, RenameError> {
        let start = Instant::now();
        self.prepare_destination()?;
        tracing::info!(
            "Renaming {} images into {:?} ({}, {} worker(s))",
            list.len(),
            self.options.destination,
            if self.parallel { "parallel" } else { "sequential" },
            self.workers
        );

        let plans = self.plan(list);
        let resolved = self.resolve_collisions(&plans)?;
        let mut records = self.commit(resolved, cancel).await;

        if let Some(classes) = &self.options.prior_classes {
            let merged = merge_classes(&mut records, classes);
            tracing::debug!("Merged {merged} prior classifications");
        }

        if self.options.naming.overlay_name {
            self.render_previews(&records).await;
        }

        let stats = RenameStats::from_records(&records, start.elapsed().as_secs_f64());
        tracing::info!(
            "Batch finished: {} renamed, {} skipped, {} failed in {:.2}s",
            stats.renamed,
            stats.skipped,
            stats.failed,
            stats.elapsed_seconds
        );
        Ok(RenameReport { records, stats })
    }

    /// Render captioned previews without renaming anything.
    pub async fn make_previews(
        list: &ImageList,
        dest: &Path,
        options: &PreviewOptions,
    ) -> Vec<PreviewOutcome> {
        make_previews(list, dest, options).await
    }

    fn prepare_destination(&self) -> Result<(), RenameError> {
        let dest = &self.options.destination;
        if dest.exists() {
            if !dest.is_dir() {
                return Err(RenameError::Destination {
                    path: dest.clone(),
                    source: std::io::Error::other("exists and is not a directory"),
                });
            }
            tracing::warn!("Destination {:?} already exists", dest);
        }
        std::fs::create_dir_all(dest).map_err(|source| RenameError::Destination {
            path: dest.clone(),
            source,
        })
    }

    async fn render_previews(&self, records: &[RenameRecord]) {
        let list = match ImageList::from_paths(renamed_paths(records)) {
            Ok(list) => list,
            Err(e) => {
                tracing::warn!("Skipping previews: {e}");
                return;
            }
        };
        let dest = self.options.destination.join("previews");
        let outcomes = make_previews(&list, &dest, &self.options.preview).await;
        let failed = outcomes.iter().filter(|o| !o.is_ok()).count();
        if failed > 0 {
            tracing::warn!("{failed} of {} previews failed", outcomes.len());
        }
    }
}

/// New paths of renamed records that are still on disk.
fn renamed_paths(records: &[RenameRecord]) -> Vec<PathBuf> {
    records
        .iter()
        .filter(|r| r.status == RenameStatus::Renamed)
        .filter(|r| {
            let present = r.new_path.is_file();
            if !present {
                tracing::warn!("Renamed file vanished, no preview: {:?}", r.new_path);
            }
            present
        })
        .map(|r| r.new_path.clone())
        .collect()
}

fn details_from(tags: &TagMap) -> PlanDetails {
    let gps = tags.gps();
    PlanDetails {
        captured_at: tags
            .captured_at()
            .map(|ts| ts.format(RECORD_DATE_TIME_FORMAT).to_string()),
        camera_model: tags.camera_model().map(str::to_string),
        focal_length_mm: tags.focal_length_mm(),
        gps_latitude: gps.map(|g| g.0),
        gps_longitude: gps.map(|g| g.1),
        gps_altitude: gps.and_then(|g| g.2),
    }
}

fn build_record(
    entry: ResolvedRename,
    dest: Option<PathBuf>,
    outcome: Option<CommitOutcome>,
) -> RenameRecord {
    let plan = entry.plan;
    let (status, error) = match (&plan.target, outcome) {
        (PlanTarget::Failed(message), _) => (RenameStatus::Failed, Some(message.clone())),
        (_, Some(CommitOutcome::Renamed)) => (RenameStatus::Renamed, None),
        (_, Some(CommitOutcome::Skipped(reason))) => (RenameStatus::Skipped, Some(reason)),
        (_, Some(CommitOutcome::Failed(message))) => (RenameStatus::Failed, Some(message)),
        (_, None) => (RenameStatus::Failed, Some("not committed".to_string())),
    };

    // A row has to be writable as text even when its source name is not
    let original_path = match plan.source.to_str() {
        Some(_) => plan.source,
        None => PathBuf::from(plan.source.to_string_lossy().into_owned()),
    };

    RenameRecord {
        original_path,
        new_path: dest.unwrap_or_default(),
        new_name: entry.name.unwrap_or_default(),
        status,
        error,
        progressive_id: plan.progressive_id,
        captured_at: plan.details.captured_at,
        camera_model: plan.details.camera_model,
        focal_length_mm: plan.details.focal_length_mm,
        gps_latitude: plan.details.gps_latitude,
        gps_longitude: plan.details.gps_longitude,
        gps_altitude: plan.details.gps_altitude,
        classification: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pipeline::SensorSizeTable;
    use crate::provenance::{self, ProvenanceFormat};
    use crate::test_helpers::{write_exif_image, write_exif_jpeg, ExifFixture};
    use std::collections::HashSet;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    const TS: &str = "2023:05:16 11:34:34";

    fn options(dest: &Path, base: &str) -> RenameOptions {
        RenameOptions {
            destination: dest.to_path_buf(),
            naming: NamingConfig {
                base_name: base.into(),
                ..NamingConfig::default()
            },
            workers: Some(4),
            ..RenameOptions::default()
        }
    }

    fn scan(dir: &Path) -> ImageList {
        ImageList::scan(dir, &["jpg".to_string()], true).unwrap()
    }

    #[test]
    fn test_progressive_with_explicit_parallel_is_rejected() {
        let mut opts = options(Path::new("/tmp/out"), "IMG");
        opts.naming.progressive_id = true;
        opts.parallelism = Parallelism::Parallel;
        assert!(matches!(
            RenameEngine::new(opts.clone()),
            Err(RenameError::ConfigurationConflict(_))
        ));

        opts.parallelism = Parallelism::Auto;
        let engine = RenameEngine::new(opts).unwrap();
        assert!(!engine.is_parallel());
        assert_eq!(engine.workers(), 1);
    }

    #[test]
    fn test_invalid_options_are_rejected() {
        let mut opts = options(Path::new(""), "IMG");
        assert!(RenameEngine::new(opts.clone()).is_err());
        opts.destination = PathBuf::from("/tmp/out");
        opts.workers = Some(0);
        assert!(RenameEngine::new(opts).is_err());
    }

    #[tokio::test]
    async fn test_dji_collision_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        write_exif_jpeg(&src.join("DJI_0001.JPG"), &ExifFixture::dji(TS));
        write_exif_jpeg(&src.join("DJI_0002.JPG"), &ExifFixture::dji(TS));

        let dest = dir.path().join("out");
        let engine = RenameEngine::new(options(&dest, "DJI")).unwrap();
        let mut list = ImageList::scan(&src, &["jpg".to_string()], false).unwrap();
        let report = engine.run(&mut list, &CancelFlag::new()).await.unwrap();

        let names: Vec<_> = report.records.iter().map(|r| r.new_name.as_str()).collect();
        assert_eq!(names, vec!["DJI_20230516_113434.jpg", "DJI_20230516_113434_1.jpg"]);
        assert!(dest.join("DJI_20230516_113434.jpg").exists());
        assert!(dest.join("DJI_20230516_113434_1.jpg").exists());
        assert_eq!(report.stats.renamed, 2);

        let first = &report.records[0];
        assert_eq!(first.camera_model.as_deref(), Some("FC6310"));
        assert_eq!(first.captured_at.as_deref(), Some("2023-05-16 11:34:34"));
        assert_eq!(first.focal_length_mm, Some(8.8));
    }

    #[tokio::test]
    async fn test_every_input_gets_exactly_one_record() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        for i in 0..5 {
            write_exif_jpeg(&src.join(format!("{i}.jpg")), &ExifFixture::dji(TS));
        }
        std::fs::write(src.join("broken.jpg"), b"no exif here").unwrap();

        let engine = RenameEngine::new(options(&dir.path().join("out"), "IMG")).unwrap();
        let mut list = scan(&src);
        let report = engine.run(&mut list, &CancelFlag::new()).await.unwrap();

        assert_eq!(report.records.len(), list.len());
        let originals: HashSet<_> = report.records.iter().map(|r| &r.original_path).collect();
        assert_eq!(originals.len(), list.len());

        let broken = report
            .records
            .iter()
            .find(|r| r.original_path.ends_with("broken.jpg"))
            .unwrap();
        assert_eq!(broken.status, RenameStatus::Failed);
        assert!(broken.new_path.as_os_str().is_empty());
        assert!(broken.error.is_some());

        let new_paths: HashSet<_> = report
            .records
            .iter()
            .filter(|r| !r.new_path.as_os_str().is_empty())
            .map(|r| &r.new_path)
            .collect();
        assert_eq!(new_paths.len(), 5);
        assert_eq!(report.stats.total(), 6);
    }

    #[tokio::test]
    async fn test_delete_original_false_keeps_source() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        write_exif_jpeg(&src.join("a.jpg"), &ExifFixture::dji(TS));

        let engine = RenameEngine::new(options(&dir.path().join("out"), "IMG")).unwrap();
        let report = engine.run(&mut scan(&src), &CancelFlag::new()).await.unwrap();

        let record = &report.records[0];
        assert_eq!(record.status, RenameStatus::Renamed);
        assert!(src.join("a.jpg").exists());
        assert!(record.new_path.exists());
    }

    #[tokio::test]
    async fn test_delete_original_true_moves_identical_bytes() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        write_exif_jpeg(&src.join("a.jpg"), &ExifFixture::dji(TS));
        let bytes = std::fs::read(src.join("a.jpg")).unwrap();

        let mut opts = options(&dir.path().join("out"), "IMG");
        opts.naming.delete_original = true;
        let engine = RenameEngine::new(opts).unwrap();
        let report = engine.run(&mut scan(&src), &CancelFlag::new()).await.unwrap();

        let record = &report.records[0];
        assert_eq!(record.status, RenameStatus::Renamed);
        assert!(!src.join("a.jpg").exists());
        assert_eq!(std::fs::read(&record.new_path).unwrap(), bytes);
    }

    #[tokio::test]
    async fn test_parallel_results_keep_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        for i in 0..30 {
            let ts = format!("2023:05:16 11:{:02}:{:02}", i / 60, i % 60);
            write_exif_jpeg(&src.join(format!("{i:03}.jpg")), &ExifFixture::dji(&ts));
        }

        let counter = Arc::new(AtomicUsize::new(0));
        let seen = counter.clone();
        let mut opts = options(&dir.path().join("out"), "IMG");
        opts.parallelism = Parallelism::Parallel;
        let engine = RenameEngine::new(opts)
            .unwrap()
            .with_progress(Arc::new(move |_: &Path| {
                seen.fetch_add(1, Ordering::SeqCst);
            }));
        assert!(engine.is_parallel());

        let mut list = scan(&src);
        let report = engine.run(&mut list, &CancelFlag::new()).await.unwrap();
        let originals: Vec<_> = report.records.iter().map(|r| r.original_path.clone()).collect();
        let expected: Vec<_> = list.paths().map(Path::to_path_buf).collect();
        assert_eq!(originals, expected);
        assert_eq!(report.stats.renamed, 30);
        assert_eq!(counter.load(Ordering::SeqCst), 30);
    }

    #[tokio::test]
    async fn test_cancelled_batch_skips_everything() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        for i in 0..3 {
            write_exif_jpeg(&src.join(format!("{i}.jpg")), &ExifFixture::dji(TS));
        }

        let cancel = CancelFlag::new();
        cancel.cancel();
        let engine = RenameEngine::new(options(&dir.path().join("out"), "IMG")).unwrap();
        let report = engine.run(&mut scan(&src), &cancel).await.unwrap();

        assert_eq!(report.stats.skipped, 3);
        assert!(report
            .records
            .iter()
            .all(|r| r.error.as_deref() == Some("cancelled")));
    }

    #[tokio::test]
    async fn test_missing_camera_model_still_renames() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        write_exif_jpeg(&src.join("a.jpg"), &ExifFixture::timestamp_only(TS));

        let mut list = scan(&src);
        let engine = RenameEngine::new(options(&dir.path().join("out"), "IMG")).unwrap();
        let report = engine.run(&mut list, &CancelFlag::new()).await.unwrap();

        assert_eq!(report.records[0].status, RenameStatus::Renamed);
        assert_eq!(report.records[0].new_name, "IMG_20230516_113434.jpg");
        assert!(list
            .get(0)
            .unwrap()
            .intrinsics(&SensorSizeTable::builtin())
            .is_none());
    }

    #[tokio::test]
    async fn test_progressive_ids_follow_input_order() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        write_exif_jpeg(&src.join("a.jpg"), &ExifFixture::dji(TS));
        std::fs::write(src.join("b.jpg"), b"broken").unwrap();
        write_exif_jpeg(&src.join("c.jpg"), &ExifFixture::dji(TS));

        let mut opts = options(&dir.path().join("out"), "IMG");
        opts.naming.progressive_id = true;
        opts.naming.use_date_time = false;
        let engine = RenameEngine::new(opts).unwrap();
        let report = engine.run(&mut scan(&src), &CancelFlag::new()).await.unwrap();

        let ids: Vec<_> = report.records.iter().map(|r| r.progressive_id).collect();
        assert_eq!(ids, vec![Some(0), Some(1), Some(2)]);
        assert_eq!(report.records[0].new_name, "IMG_0000.jpg");
        assert_eq!(report.records[2].new_name, "IMG_0002.jpg");
    }

    #[tokio::test]
    async fn test_keep_dir_tree_mirrors_subdirectories() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("flight1")).unwrap();
        std::fs::create_dir_all(src.join("flight2")).unwrap();
        write_exif_jpeg(&src.join("flight1/a.jpg"), &ExifFixture::dji(TS));
        write_exif_jpeg(&src.join("flight2/a.jpg"), &ExifFixture::dji(TS));

        let dest = dir.path().join("out");
        let mut opts = options(&dest, "DJI");
        opts.keep_dir_tree = true;
        let engine = RenameEngine::new(opts).unwrap();
        let report = engine.run(&mut scan(&src), &CancelFlag::new()).await.unwrap();

        assert_eq!(report.stats.renamed, 2);
        assert!(dest.join("flight1/DJI_20230516_113434.jpg").exists());
        assert!(dest.join("flight2/DJI_20230516_113434.jpg").exists());
    }

    #[tokio::test]
    async fn test_existing_destination_file_is_skipped() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        let dest = dir.path().join("out");
        std::fs::create_dir_all(&src).unwrap();
        std::fs::create_dir_all(&dest).unwrap();
        write_exif_jpeg(&src.join("a.jpg"), &ExifFixture::dji(TS));
        std::fs::write(dest.join("IMG_20230516_113434.jpg"), b"keep me").unwrap();

        let engine = RenameEngine::new(options(&dest, "IMG")).unwrap();
        let report = engine.run(&mut scan(&src), &CancelFlag::new()).await.unwrap();

        assert_eq!(report.records[0].status, RenameStatus::Skipped);
        assert_eq!(
            std::fs::read(dest.join("IMG_20230516_113434.jpg")).unwrap(),
            b"keep me"
        );
    }

    #[tokio::test]
    async fn test_prior_classes_are_merged() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        write_exif_jpeg(&src.join("a.jpg"), &ExifFixture::dji(TS));

        let mut opts = options(&dir.path().join("out"), "IMG");
        opts.prior_classes = Some(PriorClasses::from_iter([("a.jpg".to_string(), 3)]));
        let engine = RenameEngine::new(opts).unwrap();
        let report = engine.run(&mut scan(&src), &CancelFlag::new()).await.unwrap();
        assert_eq!(report.records[0].classification, Some(3));
    }

    #[tokio::test]
    async fn test_overlay_name_writes_previews() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        write_exif_image(&src.join("a.jpg"), &ExifFixture::dji(TS), 120, 80);

        let dest = dir.path().join("out");
        let mut opts = options(&dest, "IMG");
        opts.naming.overlay_name = true;
        let engine = RenameEngine::new(opts).unwrap();
        let report = engine.run(&mut scan(&src), &CancelFlag::new()).await.unwrap();

        assert_eq!(report.records[0].status, RenameStatus::Renamed);
        assert!(dest.join("previews/IMG_20230516_113434.jpg").exists());
    }

    #[tokio::test]
    async fn test_overlay_previews_keep_same_named_subdirectory_files_apart() {
        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(src.join("f1")).unwrap();
        std::fs::create_dir_all(src.join("f2")).unwrap();
        write_exif_image(&src.join("f1/a.jpg"), &ExifFixture::dji(TS), 40, 30);
        write_exif_image(&src.join("f2/a.jpg"), &ExifFixture::dji(TS), 40, 30);

        let dest = dir.path().join("out");
        let mut opts = options(&dest, "IMG");
        opts.keep_dir_tree = true;
        opts.naming.overlay_name = true;
        let engine = RenameEngine::new(opts).unwrap();
        let report = engine.run(&mut scan(&src), &CancelFlag::new()).await.unwrap();

        assert_eq!(report.stats.renamed, 2);
        assert!(dest.join("previews/f1/IMG_20230516_113434.jpg").exists());
        assert!(dest.join("previews/f2/IMG_20230516_113434.jpg").exists());
    }

    #[test]
    fn test_vanished_renamed_files_are_left_out_of_previews() {
        let dir = tempfile::tempdir().unwrap();
        let kept = dir.path().join("kept.jpg");
        std::fs::write(&kept, b"x").unwrap();
        let record = |path: PathBuf, status: RenameStatus| RenameRecord {
            original_path: PathBuf::from("/in/src.jpg"),
            new_path: path,
            new_name: String::new(),
            status,
            error: None,
            progressive_id: None,
            captured_at: None,
            camera_model: None,
            focal_length_mm: None,
            gps_latitude: None,
            gps_longitude: None,
            gps_altitude: None,
            classification: None,
        };
        let records = vec![
            record(kept.clone(), RenameStatus::Renamed),
            record(dir.path().join("gone.jpg"), RenameStatus::Renamed),
            record(kept.clone(), RenameStatus::Skipped),
        ];

        assert_eq!(renamed_paths(&records), vec![kept.clone()]);
        assert!(ImageList::from_paths(renamed_paths(&records)).is_ok());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_non_utf8_path_fails_without_touching_the_file() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let dir = tempfile::tempdir().unwrap();
        let src = dir.path().join("src");
        std::fs::create_dir_all(&src).unwrap();
        let odd = src.join(OsStr::from_bytes(b"caf\xe9.jpg"));
        // Some filesystems refuse non-UTF-8 names outright
        if std::fs::write(&odd, b"").is_err() {
            return;
        }
        write_exif_jpeg(&odd, &ExifFixture::dji(TS));
        write_exif_jpeg(&src.join("b.jpg"), &ExifFixture::dji(TS));
        let before = std::fs::read(&odd).unwrap();

        let dest = dir.path().join("out");
        let mut opts = options(&dest, "IMG");
        opts.naming.delete_original = true;
        let engine = RenameEngine::new(opts).unwrap();
        let report = engine.run(&mut scan(&src), &CancelFlag::new()).await.unwrap();

        let failed: Vec<_> = report
            .records
            .iter()
            .filter(|r| r.status == RenameStatus::Failed)
            .collect();
        assert_eq!(failed.len(), 1);
        assert_eq!(failed[0].error.as_deref(), Some("path is not valid UTF-8"));
        assert_eq!(std::fs::read(&odd).unwrap(), before);
        assert_eq!(report.stats.renamed, 1);

        let table = dir.path().join("provenance.csv");
        provenance::write_records(&table, &report.records, ProvenanceFormat::Csv).unwrap();
        let back = provenance::read_records(&table, ProvenanceFormat::Csv).unwrap();
        assert_eq!(back.len(), 2);
        assert!(back
            .iter()
            .any(|r| r.status == RenameStatus::Failed && r.original_path == failed[0].original_path));
    }

    #[test]
    fn test_plan_and_resolve_without_commit() {
        let dir = tempfile::tempdir().unwrap();
        write_exif_jpeg(&dir.path().join("a.jpg"), &ExifFixture::dji(TS));
        write_exif_jpeg(&dir.path().join("b.jpg"), &ExifFixture::dji(TS));

        let dest = dir.path().join("out");
        let engine = RenameEngine::new(options(&dest, "IMG")).unwrap();
        let mut list = scan(dir.path());
        let plans = engine.plan(&mut list);
        assert!(list.iter().all(|i| i.is_resolved()));

        let resolved = engine.resolve_collisions(&plans).unwrap();
        assert_eq!(
            engine.destination_for(&resolved[1]),
            Some(dest.join("IMG_20230516_113434_1.jpg"))
        );
        assert!(!dest.exists());
    }
}
