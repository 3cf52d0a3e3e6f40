//! The `imprep rename` command.

use clap::Args;
use imprep_core::provenance::{self, load_prior_classes};
use imprep_core::rename::commit::ProgressFn;
use imprep_core::{Config, ImageList, Parallelism, ProvenanceFormat, RenameEngine, RenameOptions};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Instant;

use super::types::TableFormat;
use super::{cancel_on_ctrl_c, create_progress_bar, print_summary, Summary};

/// Arguments for the `rename` command.
#[derive(Args, Debug, Default)]
pub struct RenameArgs {
    /// Directory of images to rename
    #[arg(required = true)]
    pub input: PathBuf,

    /// Destination directory (defaults to `rename.destination`)
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// Extensions to include, comma separated (defaults to `discovery.extensions`)
    #[arg(long = "ext", value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Base name placed before the other name components
    #[arg(long)]
    pub base_name: Option<String>,

    /// Leave the capture timestamp out of new names
    #[arg(long)]
    pub no_date_time: bool,

    /// Append a zero-padded progressive id (forces sequential execution)
    #[arg(long)]
    pub progressive_id: bool,

    /// First progressive id
    #[arg(long)]
    pub first_id: Option<u64>,

    /// Include the camera model in new names
    #[arg(long)]
    pub camera_model: bool,

    /// Move instead of copy: remove each original after a verified copy
    #[arg(long)]
    pub delete_original: bool,

    /// Also write captioned previews of the renamed files
    #[arg(long)]
    pub overlay_name: bool,

    /// Commit files on a worker pool
    #[arg(long, conflicts_with = "sequential")]
    pub parallel: bool,

    /// Commit files one at a time
    #[arg(long)]
    pub sequential: bool,

    /// Worker count for parallel commits
    #[arg(short, long)]
    pub workers: Option<usize>,

    /// Mirror source subdirectories under the destination
    #[arg(long)]
    pub keep_dir_tree: bool,

    /// Replace files already present at the destination
    #[arg(long)]
    pub overwrite: bool,

    /// Provenance table path (defaults to `<dest>/provenance.<format>`)
    #[arg(long)]
    pub provenance: Option<PathBuf>,

    /// Provenance table format (inferred from --provenance when omitted)
    #[arg(short, long, value_enum)]
    pub format: Option<TableFormat>,

    /// Headerless `name,class` CSV merged into the provenance table
    #[arg(long)]
    pub prior_classes: Option<PathBuf>,

    /// Print the planned names without touching the filesystem
    #[arg(long)]
    pub dry_run: bool,
}

/// Execute the rename command.
pub async fn execute(args: RenameArgs, mut config: Config) -> anyhow::Result<()> {
    apply_overrides(&args, &mut config);
    config.validate()?;

    let mut list = ImageList::scan(
        &args.input,
        &config.discovery.extensions,
        config.discovery.recursive,
    )?;
    if list.is_empty() {
        anyhow::bail!("No images found in {}", args.input.display());
    }
    tracing::info!("Found {} images in {:?}", list.len(), list.root());

    let mut options = RenameOptions::from_config(&config)?;
    if let Some(path) = &args.prior_classes {
        let classes = load_prior_classes(path)?;
        tracing::info!("Loaded {} prior classifications", classes.len());
        options.prior_classes = Some(classes);
    }

    if args.dry_run {
        return dry_run(RenameEngine::new(options)?, &mut list);
    }

    let table = provenance_target(&args, &config)?;
    let pb = create_progress_bar(list.len() as u64);
    pb.set_message("renaming");
    let tick = pb.clone();
    let progress: ProgressFn = Arc::new(move |_: &Path| tick.inc(1));
    let engine = RenameEngine::new(options)?.with_progress(progress);

    let cancel = cancel_on_ctrl_c();
    let start = Instant::now();
    let report = engine.run(&mut list, &cancel).await?;
    pb.finish_and_clear();

    let (path, format) = table;
    provenance::write_records(&path, &report.records, format)?;

    print_summary(&Summary {
        title: "Rename summary",
        rows: vec![
            ("Renamed", report.stats.renamed),
            ("Skipped", report.stats.skipped),
            ("Failed", report.stats.failed),
        ],
        total: report.stats.total(),
        elapsed: Some(start.elapsed()),
    });
    eprintln!("  Provenance: {}", path.display());

    if cancel.is_cancelled() {
        anyhow::bail!("Interrupted; unprocessed files are recorded as skipped");
    }
    Ok(())
}

fn apply_overrides(args: &RenameArgs, config: &mut Config) {
    if let Some(dest) = &args.dest {
        config.rename.destination = dest.clone();
    }
    if !args.extensions.is_empty() {
        config.discovery.extensions = args.extensions.clone();
    }
    if args.recursive {
        config.discovery.recursive = true;
    }

    let naming = &mut config.naming;
    if let Some(base) = &args.base_name {
        naming.base_name = base.clone();
    }
    if args.no_date_time {
        naming.use_date_time = false;
    }
    if args.progressive_id {
        naming.progressive_id = true;
    }
    if args.camera_model {
        naming.include_camera_model = true;
    }
    if args.delete_original {
        naming.delete_original = true;
    }
    if args.overlay_name {
        naming.overlay_name = true;
    }

    let rename = &mut config.rename;
    if args.parallel {
        rename.parallel = Parallelism::Parallel;
    } else if args.sequential {
        rename.parallel = Parallelism::Sequential;
    }
    if args.workers.is_some() {
        rename.workers = args.workers;
    }
    if let Some(first) = args.first_id {
        rename.first_id = first;
    }
    if args.keep_dir_tree {
        rename.keep_dir_tree = true;
    }
    if args.overwrite {
        rename.overwrite = true;
    }
}

/// Where the provenance table goes and in which format.
fn provenance_target(
    args: &RenameArgs,
    config: &Config,
) -> anyhow::Result<(PathBuf, ProvenanceFormat)> {
    let explicit = args.format.map(ProvenanceFormat::from);
    match &args.provenance {
        Some(path) => {
            let format = match explicit {
                Some(format) => format,
                None => ProvenanceFormat::from_path(path)?,
            };
            Ok((path.clone(), format))
        }
        None => {
            let format = explicit
                .or(config.rename.provenance_format)
                .unwrap_or(ProvenanceFormat::Csv);
            let path = config
                .destination()
                .join(format!("provenance.{}", format.extension()));
            Ok((path, format))
        }
    }
}

fn dry_run(engine: RenameEngine, list: &mut ImageList) -> anyhow::Result<()> {
    let plans = engine.plan(list);
    let resolved = engine.resolve_collisions(&plans)?;

    let mut failed = 0;
    for entry in &resolved {
        match engine.destination_for(entry) {
            Some(dest) => println!("{} -> {}", entry.plan.source.display(), dest.display()),
            None => {
                failed += 1;
                println!("{} -> (failed)", entry.plan.source.display());
            }
        }
    }

    print_summary(&Summary {
        title: "Dry run",
        rows: vec![("Planned", resolved.len() - failed), ("Failed", failed)],
        total: resolved.len(),
        elapsed: None,
    });
    Ok(())
}
