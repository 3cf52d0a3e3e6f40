//! The `imprep organize` command.

use clap::Args;
use imprep_core::{Config, Organizer};
use std::path::PathBuf;

use super::{print_summary, Summary};

/// Arguments for the `organize` command.
#[derive(Args, Debug)]
pub struct OrganizeArgs {
    /// Directory to organize
    #[arg(required = true)]
    pub dir: PathBuf,

    /// Copy files instead of moving them
    #[arg(long)]
    pub copy: bool,

    /// Organize each immediate subdirectory instead of the directory itself
    #[arg(short, long)]
    pub recursive: bool,
}

/// Execute the organize command.
pub async fn execute(args: OrganizeArgs, mut config: Config) -> anyhow::Result<()> {
    if args.copy {
        config.organize.inplace = false;
    }
    if args.recursive {
        config.organize.recursive = true;
    }
    config.validate()?;

    let organizer = Organizer::from_config(&config.organize);
    let dir = args.dir.clone();
    let summary = tokio::task::spawn_blocking(move || organizer.organize(&dir)).await??;

    print_summary(&Summary {
        title: "Organize summary",
        rows: vec![
            ("Moved", summary.moved),
            ("Copied", summary.copied),
            ("Left", summary.left),
        ],
        total: summary.moved + summary.copied + summary.left,
        elapsed: None,
    });
    Ok(())
}
