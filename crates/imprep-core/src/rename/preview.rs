//! Captioned, optionally downscaled previews of a set of images.
//!
//! Previews are independent of renaming: originals are only read, and no
//! provenance rows are produced. Failures are reported per file.

use image::imageops::FilterType;
use serde::Serialize;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Semaphore;

use crate::config::PreviewConfig;
use crate::overlay::{overlay_text, OverlayStyle};
use crate::pipeline::{ImageIdentity, ImageList, SensorSizeTable};

/// How previews are rendered.
#[derive(Debug, Clone)]
pub struct PreviewOptions {
    /// Output extension; picks the encoder
    pub format: String,
    /// Scale applied before captioning
    pub resize_factor: f32,
    /// Burn the file stem into the image
    pub overlay: bool,
    pub style: OverlayStyle,
    /// Append `f=<px>` to the caption when intrinsics resolve
    pub caption_intrinsics: bool,
    pub workers: usize,
    pub sensors: Arc<SensorSizeTable>,
}

impl Default for PreviewOptions {
    fn default() -> Self {
        Self::from_config(&PreviewConfig::default(), SensorSizeTable::shared())
    }
}

impl PreviewOptions {
    pub fn from_config(config: &PreviewConfig, sensors: Arc<SensorSizeTable>) -> Self {
        Self {
            format: config.format.trim_start_matches('.').to_lowercase(),
            resize_factor: config.resize_factor,
            overlay: true,
            style: OverlayStyle::from(config),
            caption_intrinsics: config.caption_intrinsics,
            workers: default_workers(),
            sensors,
        }
    }
}

pub(crate) fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(|n| n.get())
        .unwrap_or(4)
}

/// Result of rendering one preview.
#[derive(Debug, Clone, Serialize)]
pub struct PreviewOutcome {
    pub source: PathBuf,
    pub output: Option<PathBuf>,
    pub error: Option<String>,
}

impl PreviewOutcome {
    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }
}

/// Render a preview of every image in `list` into `dest`.
///
/// Subdirectories below `list.root()` are mirrored under `dest`, and stems
/// that still clash (`a.jpg` next to `a.png`) get a `_<n>` suffix.
/// Outcomes are in list order. A missing or unwritable `dest` fails every
/// entry instead of aborting.
pub async fn make_previews(
    list: &ImageList,
    dest: &Path,
    options: &PreviewOptions,
) -> Vec<PreviewOutcome> {
    if let Err(e) = std::fs::create_dir_all(dest) {
        tracing::error!("Cannot create preview directory {:?}: {e}", dest);
        return list
            .iter()
            .map(|image| PreviewOutcome {
                source: image.path().to_path_buf(),
                output: None,
                error: Some(format!("cannot create {}: {e}", dest.display())),
            })
            .collect();
    }

    let semaphore = Arc::new(Semaphore::new(options.workers.max(1)));
    let mut handles = Vec::with_capacity(list.len());

    let outputs = preview_outputs(list, dest, &options.format);
    for (image, output) in list.iter().zip(outputs) {
        let source = image.path().to_path_buf();
        let permit = match semaphore.clone().acquire_owned().await {
            Ok(permit) => permit,
            Err(_) => {
                tracing::warn!("Preview semaphore closed unexpectedly, stopping batch");
                break;
            }
        };
        let image = image.clone();
        let options = options.clone();
        let handle = tokio::task::spawn_blocking(move || {
            let outcome = render_preview(image, output, &options);
            drop(permit);
            outcome
        });
        handles.push((source, handle));
    }

    let mut outcomes = Vec::with_capacity(handles.len());
    for (source, handle) in handles {
        let outcome = match handle.await {
            Ok(outcome) => outcome,
            Err(e) => PreviewOutcome {
                source,
                output: None,
                error: Some(format!("preview task panicked: {e}")),
            },
        };
        if let Some(err) = &outcome.error {
            tracing::warn!("Preview failed for {:?}: {err}", outcome.source);
        }
        outcomes.push(outcome);
    }
    outcomes
}

/// Output path of every preview, in list order.
fn preview_outputs(list: &ImageList, dest: &Path, format: &str) -> Vec<PathBuf> {
    let mut taken = HashSet::new();
    list.iter()
        .map(|image| {
            let dir = image
                .parent()
                .and_then(|parent| parent.strip_prefix(list.root()).ok())
                .map(|rel| dest.join(rel))
                .unwrap_or_else(|| dest.to_path_buf());
            let mut output = dir.join(format!("{}.{format}", image.stem()));
            let mut n = 1;
            // Case-insensitive filesystems treat A.jpg and a.jpg as one file
            while !taken.insert(output.to_string_lossy().to_lowercase()) {
                output = dir.join(format!("{}_{n}.{format}", image.stem()));
                n += 1;
            }
            output
        })
        .collect()
}

/// Decode, resize, caption and write one preview. Blocking.
fn render_preview(
    mut image: ImageIdentity,
    output: PathBuf,
    options: &PreviewOptions,
) -> PreviewOutcome {
    let source = image.path().to_path_buf();
    let fail = |message: String| PreviewOutcome {
        source: source.clone(),
        output: None,
        error: Some(message),
    };

    let decoded = match image::open(&source) {
        Ok(img) => img.to_rgb8(),
        Err(e) => return fail(format!("decode failed: {e}")),
    };
    let (orig_w, orig_h) = decoded.dimensions();

    let resized = if (options.resize_factor - 1.0).abs() > f32::EPSILON {
        let w = ((orig_w as f32 * options.resize_factor).round() as u32).max(1);
        let h = ((orig_h as f32 * options.resize_factor).round() as u32).max(1);
        image::imageops::resize(&decoded, w, h, FilterType::Triangle)
    } else {
        decoded
    };

    let rendered = if options.overlay {
        let mut caption = image.stem().to_string();
        if options.caption_intrinsics {
            // Tags are optional here: a file without EXIF still gets a caption
            let _ = image.resolve();
            if let Some(k) = image.intrinsics_with_size(&options.sensors, orig_w, orig_h) {
                caption.push_str(&format!(" f={:.1}", k.focal_px()));
            }
        }
        overlay_text(&resized, &caption, &options.style)
    } else {
        resized
    };

    if output == source || output.canonicalize().is_ok_and(|p| p == source) {
        return fail("preview would overwrite its source".into());
    }
    if let Some(parent) = output.parent() {
        if let Err(e) = std::fs::create_dir_all(parent) {
            return fail(format!("cannot create {}: {e}", parent.display()));
        }
    }
    if let Err(e) = rendered.save(&output) {
        return fail(format!("write failed: {e}"));
    }
    tracing::debug!("Preview written: {:?}", output);

    PreviewOutcome {
        source,
        output: Some(output),
        error: None,
    }
}
