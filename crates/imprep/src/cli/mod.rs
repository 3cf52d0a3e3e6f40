//! Command handlers and the terminal helpers they share.

pub mod config;
pub mod convert;
pub mod intrinsics;
pub mod organize;
pub mod preview;
pub mod rename;
pub mod types;
pub mod undo;

use imprep_core::CancelFlag;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

pub(crate) fn create_progress_bar(total: u64) -> ProgressBar {
    let pb = ProgressBar::new(total);
    if let Ok(style) = ProgressStyle::default_bar().template(
        "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({percent}%) {msg}",
    ) {
        pb.set_style(style.progress_chars("##-"));
    }
    pb.set_message("starting...");
    pb
}

/// Raise the returned flag on the first Ctrl-C.
pub(crate) fn cancel_on_ctrl_c() -> CancelFlag {
    let cancel = CancelFlag::new();
    let flag = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("Interrupted: finishing files in flight, skipping the rest");
            flag.cancel();
        }
    });
    cancel
}

pub(crate) struct Summary<'a> {
    pub title: &'a str,
    pub rows: Vec<(&'a str, usize)>,
    pub total: usize,
    pub elapsed: Option<Duration>,
}

pub(crate) fn print_summary(summary: &Summary<'_>) {
    eprintln!();
    eprintln!("  ====================================");
    eprintln!("  {:^34}", summary.title);
    eprintln!("  ====================================");
    for (i, (label, count)) in summary.rows.iter().enumerate() {
        // Zero counts are hidden except for the primary one
        if *count > 0 || i == 0 {
            eprintln!("    {:<14}{:>8}", format!("{label}:"), count);
        }
    }
    eprintln!("  ------------------------------------");
    eprintln!("    {:<14}{:>8}", "Total:", summary.total);
    if let Some(elapsed) = summary.elapsed {
        let secs = elapsed.as_secs_f64();
        eprintln!("    {:<14}{:>7.1}s", "Duration:", secs);
        if secs > 0.0 {
            eprintln!(
                "    {:<14}{:>7.1} img/sec",
                "Rate:",
                summary.total as f64 / secs
            );
        }
    }
    eprintln!("  ====================================");
}
