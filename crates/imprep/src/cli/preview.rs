//! The `imprep preview` command: captioned previews without renaming.

use clap::Args;
use imprep_core::rename::PreviewOptions;
use imprep_core::{Config, ImageList, RenameEngine};
use std::path::PathBuf;
use std::time::Instant;

use super::{print_summary, Summary};

/// Arguments for the `preview` command.
#[derive(Args, Debug, Default)]
pub struct PreviewArgs {
    /// Directory of images
    #[arg(required = true)]
    pub input: PathBuf,

    /// Output directory (defaults to `<rename.destination>/previews`)
    #[arg(short, long)]
    pub dest: Option<PathBuf>,

    /// Extensions to include, comma separated
    #[arg(long = "ext", value_delimiter = ',')]
    pub extensions: Vec<String>,

    /// Descend into subdirectories
    #[arg(short, long)]
    pub recursive: bool,

    /// Scale factor applied before captioning (e.g. 0.25)
    #[arg(long)]
    pub resize: Option<f32>,

    /// Output image format (jpg, png, ...)
    #[arg(long)]
    pub format: Option<String>,

    /// Skip the caption; only resize and re-encode
    #[arg(long)]
    pub no_caption: bool,

    /// Append the focal length in pixels to each caption
    #[arg(long)]
    pub caption_intrinsics: bool,

    /// Worker count
    #[arg(short, long)]
    pub workers: Option<usize>,
}

/// Execute the preview command.
pub async fn execute(args: PreviewArgs, mut config: Config) -> anyhow::Result<()> {
    if !args.extensions.is_empty() {
        config.discovery.extensions = args.extensions.clone();
    }
    if let Some(resize) = args.resize {
        config.preview.resize_factor = resize;
    }
    if let Some(format) = &args.format {
        config.preview.format = format.clone();
    }
    if args.caption_intrinsics {
        config.preview.caption_intrinsics = true;
    }
    config.validate()?;

    let list = ImageList::scan(
        &args.input,
        &config.discovery.extensions,
        args.recursive || config.discovery.recursive,
    )?;
    if list.is_empty() {
        anyhow::bail!("No images found in {}", args.input.display());
    }

    let mut options = PreviewOptions::from_config(&config.preview, config.sensor_table()?);
    options.overlay = !args.no_caption;
    if let Some(workers) = args.workers {
        if workers == 0 {
            anyhow::bail!("--workers must be at least 1");
        }
        options.workers = workers;
    }

    let dest = args
        .dest
        .clone()
        .unwrap_or_else(|| config.destination().join("previews"));
    tracing::info!("Rendering {} previews into {:?}", list.len(), dest);

    let start = Instant::now();
    let outcomes = RenameEngine::make_previews(&list, &dest, &options).await;
    let written = outcomes.iter().filter(|o| o.is_ok()).count();

    print_summary(&Summary {
        title: "Preview summary",
        rows: vec![("Written", written), ("Failed", outcomes.len() - written)],
        total: outcomes.len(),
        elapsed: Some(start.elapsed()),
    });
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn preview_args_default_captions_everything() {
        let args = PreviewArgs::default();
        assert!(!args.no_caption);
        assert!(args.dest.is_none());
        assert!(args.resize.is_none());
        assert!(args.workers.is_none());
    }
}
