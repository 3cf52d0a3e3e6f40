//! The `imprep undo` command: reverse a batch from its provenance table.

use clap::Args;
use imprep_core::provenance::{self, UndoStatus};
use imprep_core::ProvenanceFormat;
use std::path::PathBuf;

use super::types::TableFormat;
use super::{print_summary, Summary};

/// Arguments for the `undo` command.
#[derive(Args, Debug)]
pub struct UndoArgs {
    /// Provenance table written by `imprep rename`
    #[arg(required = true)]
    pub provenance: PathBuf,

    /// Table format (inferred from the extension when omitted)
    #[arg(short, long, value_enum)]
    pub format: Option<TableFormat>,

    /// Show what would be restored without touching any file
    #[arg(long)]
    pub dry_run: bool,
}

/// Execute the undo command.
pub async fn execute(args: UndoArgs) -> anyhow::Result<()> {
    if !args.provenance.is_file() {
        anyhow::bail!("Provenance table not found: {}", args.provenance.display());
    }
    let format = match args.format {
        Some(format) => format.into(),
        None => ProvenanceFormat::from_path(&args.provenance)?,
    };

    let records = provenance::read_records(&args.provenance, format)?;
    let outcomes = provenance::undo(&records, args.dry_run);

    for outcome in &outcomes {
        match (&outcome.status, &outcome.error) {
            (UndoStatus::Failed, Some(err)) => eprintln!(
                "  failed: {} ({err})",
                outcome.new_path.display()
            ),
            _ if args.dry_run => println!(
                "{} -> {}",
                outcome.new_path.display(),
                outcome.original_path.display()
            ),
            _ => {}
        }
    }

    let count = |status: UndoStatus| outcomes.iter().filter(|o| o.status == status).count();
    let done_label = if args.dry_run { "Planned" } else { "Restored" };
    let done = count(if args.dry_run {
        UndoStatus::Planned
    } else {
        UndoStatus::Restored
    });
    print_summary(&Summary {
        title: "Undo summary",
        rows: vec![(done_label, done), ("Failed", count(UndoStatus::Failed))],
        total: outcomes.len(),
        elapsed: None,
    });
    Ok(())
}
