//! The `imprep convert` command: develop RAW files with RawTherapee.

use clap::Args;
use imprep_core::{Config, ImageList, RawConverter};
use std::path::PathBuf;
use std::time::Instant;

use super::{create_progress_bar, print_summary, Summary};

/// RAW extensions converted when `--ext` is not given.
const RAW_EXTENSIONS: &[&str] = &["dng", "cr2", "cr3", "nef", "arw", "orf", "rw2", "raf"];

/// Arguments for the `convert` command.
#[derive(Args, Debug, Default)]
pub struct ConvertArgs {
    /// RAW file or directory of RAW files
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output directory (defaults to `conversion.output_dir`)
    #[arg(short, long)]
    pub output: Option<PathBuf>,

    /// Processing profile (.pp3)
    #[arg(short, long)]
    pub profile: Option<PathBuf>,

    /// Extra converter option, repeatable (replaces `conversion.options`)
    #[arg(long = "opt", allow_hyphen_values = true)]
    pub options: Vec<String>,

    /// Mirror input subdirectories under the output directory
    #[arg(long)]
    pub keep_dir_tree: bool,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Extensions to convert, comma separated
    #[arg(long = "ext", value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Converter executable (defaults to `rawtherapee-cli` on PATH)
    #[arg(long, env = "IMPREP_CONVERTER")]
    pub executable: Option<PathBuf>,
}

/// Execute the convert command.
pub async fn execute(args: ConvertArgs, mut config: Config) -> anyhow::Result<()> {
    let conversion = &mut config.conversion;
    if let Some(output) = &args.output {
        conversion.output_dir = output.clone();
    }
    if args.profile.is_some() {
        conversion.profile = args.profile.clone();
    }
    if !args.options.is_empty() {
        conversion.options = args.options.clone();
    }
    if args.keep_dir_tree {
        conversion.keep_dir_tree = true;
    }
    if args.executable.is_some() {
        conversion.executable = args.executable.clone();
    }

    let list = if args.input.is_file() {
        ImageList::from_paths([args.input.clone()])?
    } else {
        let extensions: Vec<String> = if args.extensions.is_empty() {
            RAW_EXTENSIONS.iter().map(|e| e.to_string()).collect()
        } else {
            args.extensions.clone()
        };
        ImageList::scan(&args.input, &extensions, args.recursive)?
    };
    if list.is_empty() {
        anyhow::bail!("No RAW files found in {}", args.input.display());
    }

    let converter = RawConverter::new(&config.conversion)?;
    tracing::info!(
        "Converting {} files with {:?} into {:?}",
        list.len(),
        converter.executable(),
        converter.output_dir()
    );

    let pb = create_progress_bar(list.len() as u64);
    pb.set_message("converting");
    let tick = pb.clone();
    let start = Instant::now();
    let outcomes = tokio::task::spawn_blocking(move || {
        converter.convert_list(&list, |outcome| {
            tick.set_message(outcome.path.display().to_string());
            tick.inc(1);
        })
    })
    .await??;
    pb.finish_and_clear();

    for outcome in outcomes.iter().filter(|o| !o.is_ok()) {
        if let Some(err) = &outcome.error {
            eprintln!("  failed: {} ({err})", outcome.path.display());
        }
    }
    let converted = outcomes.iter().filter(|o| o.is_ok()).count();
    print_summary(&Summary {
        title: "Conversion summary",
        rows: vec![("Converted", converted), ("Failed", outcomes.len() - converted)],
        total: outcomes.len(),
        elapsed: Some(start.elapsed()),
    });
    Ok(())
}
