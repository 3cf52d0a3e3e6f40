//! imprep CLI - EXIF-driven image preparation for photogrammetry datasets.
//!
//! Renames camera images into consistent, traceable names, writes a
//! provenance table of every original → new mapping, and bundles the
//! surrounding chores: previews, undo, RAW conversion and organizing.
//!
//! # Usage
//!
//! ```bash
//! # Rename a flight into ./renamed with DJI_<timestamp> names
//! imprep rename ./flight1 --base-name DJI --dest ./renamed
//!
//! # Reverse it
//! imprep undo ./renamed/provenance.csv
//!
//! # Inspect a single file's camera matrix
//! imprep intrinsics ./flight1/DJI_0001.JPG
//! ```

use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};

mod cli;
mod logging;

use cli::config::{ConfigArgs, ConfigCommand};

/// imprep - EXIF-driven image renaming, previews and organizing.
#[derive(Parser, Debug)]
#[command(name = "imprep")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
struct Cli {
    /// Enable verbose (debug) logging
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Output logs in JSON format
    #[arg(long, global = true)]
    json_logs: bool,

    /// Config file (defaults to the platform config directory)
    #[arg(long, global = true, env = "IMPREP_CONFIG")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Commands,
}

/// Available commands.
#[derive(Subcommand, Debug)]
enum Commands {
    /// Rename images from their EXIF metadata and write a provenance table
    Rename(cli::rename::RenameArgs),

    /// Write captioned previews without renaming
    Preview(cli::preview::PreviewArgs),

    /// Reverse a rename batch from its provenance table
    Undo(cli::undo::UndoArgs),

    /// Print a file's identity tags and camera intrinsics
    Intrinsics(cli::intrinsics::IntrinsicsArgs),

    /// Sort files into subdirectories by extension
    Organize(cli::organize::OrganizeArgs),

    /// Develop RAW files with RawTherapee
    Convert(cli::convert::ConvertArgs),

    /// View and manage configuration
    Config(ConfigArgs),
}

fn load_config(path: Option<&Path>) -> Result<imprep_core::Config, imprep_core::ConfigError> {
    match path {
        Some(path) => imprep_core::Config::load_from(path),
        None => imprep_core::Config::load(),
    }
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Logging isn't initialized yet, so config warnings go through eprintln
    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            let validating = matches!(
                cli.command,
                Commands::Config(ConfigArgs {
                    command: ConfigCommand::Validate
                })
            );
            if validating || cli.config.is_some() {
                return Err(e.into());
            }
            eprintln!(
                "Warning: Failed to load config: {e}\n  \
                 Using default configuration. Check your config file with `imprep config path`."
            );
            imprep_core::Config::default()
        }
    };
    logging::init_from_config(&config, cli.verbose, cli.json_logs);

    tracing::debug!("imprep v{}", imprep_core::VERSION);

    match cli.command {
        Commands::Rename(args) => cli::rename::execute(args, config).await,
        Commands::Preview(args) => cli::preview::execute(args, config).await,
        Commands::Undo(args) => cli::undo::execute(args).await,
        Commands::Intrinsics(args) => cli::intrinsics::execute(args, config).await,
        Commands::Organize(args) => cli::organize::execute(args, config).await,
        Commands::Convert(args) => cli::convert::execute(args, config).await,
        Commands::Config(args) => cli::config::execute(args, config).await,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn rename_flags_parse() {
        let cli = Cli::try_parse_from([
            "imprep",
            "rename",
            "./in",
            "--ext",
            "jpg,dng",
            "--progressive-id",
            "--sequential",
            "--format",
            "parquet",
        ])
        .unwrap();
        let Commands::Rename(args) = cli.command else {
            panic!("expected rename");
        };
        assert_eq!(args.extensions, vec!["jpg".to_string(), "dng".to_string()]);
        assert!(args.progressive_id);
        assert!(args.sequential);
        assert_eq!(args.format, Some(cli::types::TableFormat::Parquet));
    }

    #[test]
    fn parallel_and_sequential_conflict() {
        let result = Cli::try_parse_from(["imprep", "rename", "./in", "--parallel", "--sequential"]);
        assert!(result.is_err());
    }

    #[test]
    fn convert_accepts_hyphenated_options() {
        let cli = Cli::try_parse_from(["imprep", "convert", "./raw", "--opt", "-j90", "--opt", "-Y"])
            .unwrap();
        let Commands::Convert(args) = cli.command else {
            panic!("expected convert");
        };
        assert_eq!(args.options, vec!["-j90".to_string(), "-Y".to_string()]);
    }
}
