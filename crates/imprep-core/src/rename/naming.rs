//! Deterministic file names from tags and naming settings.

use chrono::NaiveDateTime;
use std::fmt::Write;
use std::path::Path;

use crate::config::NamingConfig;
use crate::types::TagMap;

const PATH_HOSTILE: &[char] = &['/', '\\', ':', '*', '?', '"', '<', '>', '|'];

/// Builds `{base}{sep}{id}{sep}{timestamp}{sep}{model}.{ext}`.
pub struct NamingScheme;

impl NamingScheme {
    /// Compute the new file name for `original`.
    ///
    /// Pure: the same inputs always give the same name. `counter` is only
    /// used when `config.progressive_id` is set. The extension is the
    /// original's, lower-cased.
    pub fn compute_name(
        original: &Path,
        tags: &TagMap,
        config: &NamingConfig,
        counter: Option<u64>,
    ) -> String {
        // Every component is sanitized so no name can reach outside its directory
        let mut parts: Vec<String> = Vec::with_capacity(4);
        let mut push = |value: &str| {
            let value = sanitize_component(value);
            if !value.is_empty() {
                parts.push(value);
            }
        };
        push(&config.base_name);

        if config.progressive_id {
            if let Some(id) = counter {
                push(&format!("{id:0width$}", width = config.id_width));
            }
        }

        if config.use_date_time {
            match tags
                .captured_at()
                .and_then(|ts| format_timestamp(&ts, &config.date_time_format))
            {
                Some(ts) => push(&ts),
                None => {
                    tracing::warn!("No capture timestamp in {:?}", original);
                    push(&config.missing_date_token);
                }
            }
        }

        if config.include_camera_model {
            if let Some(model) = tags.camera_model() {
                push(model);
            }
        }

        let mut stem = parts.join(&config.separator);
        if stem.is_empty() {
            // Every component disabled: keep the original stem rather than emit a dotfile
            stem = original
                .file_stem()
                .and_then(|s| s.to_str())
                .unwrap_or("unnamed")
                .to_string();
        }

        match original.extension().and_then(|e| e.to_str()) {
            Some(ext) if !ext.is_empty() => format!("{stem}.{}", ext.to_lowercase()),
            _ => stem,
        }
    }
}

/// Format with a user-supplied chrono pattern; `None` for an invalid pattern.
pub fn format_timestamp(ts: &NaiveDateTime, pattern: &str) -> Option<String> {
    let mut out = String::new();
    write!(out, "{}", ts.format(pattern)).ok()?;
    Some(out)
}

/// Make a tag value safe to embed in a file name.
pub fn sanitize_component(value: &str) -> String {
    value
        .split_whitespace()
        .collect::<Vec<_>>()
        .join("_")
        .chars()
        .filter(|c| !c.is_control() && !PATH_HOSTILE.contains(c))
        .collect()
}
