//! The `imprep intrinsics` command: print a file's identity tags and K.

use clap::Args;
use imprep_core::types::RECORD_DATE_TIME_FORMAT;
use imprep_core::{Config, ImageIdentity};
use serde_json::json;
use std::path::PathBuf;

/// Arguments for the `intrinsics` command.
#[derive(Args, Debug)]
pub struct IntrinsicsArgs {
    /// Image file
    #[arg(required = true)]
    pub file: PathBuf,

    /// Print JSON instead of text
    #[arg(long)]
    pub json: bool,

    /// Include every EXIF tag, not just the identity summary
    #[arg(long)]
    pub all_tags: bool,
}

/// Execute the intrinsics command.
pub async fn execute(args: IntrinsicsArgs, config: Config) -> anyhow::Result<()> {
    if !args.file.is_file() {
        anyhow::bail!("Not a file: {}", args.file.display());
    }
    let sensors = config.sensor_table()?;
    let mut image = ImageIdentity::new(&args.file);
    let tags = image.resolve()?;
    let intrinsics = image.intrinsics(&sensors);

    let model = tags.camera_model();
    let captured = image
        .captured_at()
        .map(|ts| ts.format(RECORD_DATE_TIME_FORMAT).to_string());
    let size = tags.image_size();

    if args.json {
        let mut value = json!({
            "path": image.path(),
            "camera_make": tags.camera_make(),
            "camera_model": model,
            "captured_at": captured,
            "focal_length_mm": tags.focal_length_mm(),
            "image_size": size,
            "sensor_width_mm": model.and_then(|m| sensors.lookup_camera(tags.camera_make(), m)),
            "intrinsics": intrinsics.map(|k| k.matrix()),
        });
        if args.all_tags {
            value["tags"] = serde_json::to_value(&*tags)?;
        }
        println!("{}", serde_json::to_string_pretty(&value)?);
        return Ok(());
    }

    let or_dash = |v: Option<String>| v.unwrap_or_else(|| "-".to_string());
    println!("File:          {}", image.path().display());
    println!("Camera:        {}", or_dash(model.map(str::to_string)));
    println!("Captured:      {}", or_dash(captured));
    println!(
        "Focal length:  {}",
        or_dash(tags.focal_length_mm().map(|f| format!("{f:.2} mm")))
    );
    println!(
        "Image size:    {}",
        or_dash(size.map(|(w, h)| format!("{w} x {h}")))
    );
    if let Some((lat, lon, alt)) = tags.gps() {
        let alt = alt.map(|a| format!(", {a:.1} m")).unwrap_or_default();
        println!("GPS:           {lat:.6}, {lon:.6}{alt}");
    }

    match intrinsics {
        Some(k) => println!("K:\n{k}"),
        None => println!("K:             unavailable (camera model, focal length, size or sensor width missing)"),
    }

    if args.all_tags {
        println!();
        for (name, value) in tags.iter() {
            println!("  {name:<28} {value}");
        }
    }
    Ok(())
}
