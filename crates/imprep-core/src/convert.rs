//! RAW development through an external converter (RawTherapee CLI).
//!
//! The converter is invoked once per file as
//! `<exe> -o <out> [-p <profile>] <options...> -c <file>`.

use serde::Serialize;
use std::path::{Path, PathBuf};
use std::process::Command;

use crate::config::{expand, ConversionConfig};
use crate::error::ConvertError;
use crate::pipeline::ImageList;

/// Executable searched on `PATH` when none is configured.
pub const DEFAULT_CONVERTER: &str = "rawtherapee-cli";

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ConversionStatus {
    Converted,
    Failed,
}

/// Result of converting one file.
#[derive(Debug, Clone, Serialize)]
pub struct ConversionOutcome {
    pub path: PathBuf,
    pub status: ConversionStatus,
    pub error: Option<String>,
}

impl ConversionOutcome {
    pub fn is_ok(&self) -> bool {
        self.status == ConversionStatus::Converted
    }
}

#[derive(Debug, Clone)]
pub struct RawConverter {
    executable: PathBuf,
    output_dir: PathBuf,
    profile: Option<PathBuf>,
    options: Vec<String>,
    keep_dir_tree: bool,
}

impl RawConverter {
    /// Resolve the executable and check the profile.
    pub fn new(config: &ConversionConfig) -> Result<Self, ConvertError> {
        let executable = match &config.executable {
            Some(exe) => {
                let exe = expand(exe);
                which::which(&exe)
                    .map_err(|_| ConvertError::ExecutableNotFound(exe.display().to_string()))?
            }
            None => which::which(DEFAULT_CONVERTER)
                .map_err(|_| ConvertError::ExecutableNotFound(DEFAULT_CONVERTER.to_string()))?,
        };

        let profile = config.profile.as_deref().map(expand);
        if let Some(profile) = &profile {
            if !profile.is_file() {
                return Err(ConvertError::ProfileNotFound(profile.clone()));
            }
        }

        tracing::debug!("Using RAW converter {:?}", executable);
        Ok(Self {
            executable,
            output_dir: expand(&config.output_dir),
            profile,
            options: config.options.clone(),
            keep_dir_tree: config.keep_dir_tree,
        })
    }

    pub fn executable(&self) -> &Path {
        &self.executable
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Argument vector for one file.
    pub fn command_args(&self, file: &Path, out: &Path) -> Vec<String> {
        let mut args = vec!["-o".to_string(), out.display().to_string()];
        if let Some(profile) = &self.profile {
            args.push("-p".to_string());
            args.push(profile.display().to_string());
        }
        args.extend(self.options.iter().cloned());
        args.push("-c".to_string());
        args.push(file.display().to_string());
        args
    }

    /// Convert one file into `out`. Blocking.
    pub fn convert_file(&self, file: &Path, out: &Path) -> ConversionOutcome {
        let fail = |error: String| {
            tracing::error!("Conversion failed for {:?}: {error}", file);
            ConversionOutcome {
                path: file.to_path_buf(),
                status: ConversionStatus::Failed,
                error: Some(error),
            }
        };

        if let Err(e) = std::fs::create_dir_all(out) {
            return fail(format!("cannot create {}: {e}", out.display()));
        }

        let output = match Command::new(&self.executable)
            .args(self.command_args(file, out))
            .output()
        {
            Ok(output) => output,
            Err(e) => return fail(format!("cannot run converter: {e}")),
        };

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr).trim().to_string();
            let code = output
                .status
                .code()
                .map_or_else(|| "signal".to_string(), |c| c.to_string());
            return fail(if stderr.is_empty() {
                format!("converter exited with status {code}")
            } else {
                format!("converter exited with status {code}: {stderr}")
            });
        }

        tracing::debug!("Converted {:?}", file);
        ConversionOutcome {
            path: file.to_path_buf(),
            status: ConversionStatus::Converted,
            error: None,
        }
    }

    /// Convert every file in `list`, in list order.
    ///
    /// With `keep_dir_tree`, each file lands under the output directory at
    /// its path relative to the list root.
    pub fn convert_list(
        &self,
        list: &ImageList,
        mut on_done: impl FnMut(&ConversionOutcome),
    ) -> Result<Vec<ConversionOutcome>, ConvertError> {
        std::fs::create_dir_all(&self.output_dir).map_err(|source| ConvertError::OutputDir {
            path: self.output_dir.clone(),
            source,
        })?;

        let mut outcomes = Vec::with_capacity(list.len());
        for path in list.paths() {
            let out = self.output_for(list.root(), path);
            let outcome = self.convert_file(path, &out);
            on_done(&outcome);
            outcomes.push(outcome);
        }

        let converted = outcomes.iter().filter(|o| o.is_ok()).count();
        tracing::info!(
            "Converted {}/{} files into {:?}",
            converted,
            outcomes.len(),
            self.output_dir
        );
        Ok(outcomes)
    }

    fn output_for(&self, root: &Path, file: &Path) -> PathBuf {
        if !self.keep_dir_tree {
            return self.output_dir.clone();
        }
        match file.parent().and_then(|p| p.strip_prefix(root).ok()) {
            Some(rel) => self.output_dir.join(rel),
            None => self.output_dir.clone(),
        }
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;

    /// A stand-in converter that records its arguments in `<out>/args.txt`.
    fn fake_converter(dir: &Path, exit_code: i32) -> PathBuf {
        let script = dir.join(format!("fake-converter-{exit_code}"));
        std::fs::write(
            &script,
            format!("#!/bin/sh\necho \"$@\" >> \"$2/args.txt\"\necho boom >&2\nexit {exit_code}\n"),
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script
    }

    fn config(exe: PathBuf, out: PathBuf) -> ConversionConfig {
        ConversionConfig {
            executable: Some(exe),
            output_dir: out,
            ..ConversionConfig::default()
        }
    }

    #[test]
    fn test_command_layout() {
        let dir = tempfile::tempdir().unwrap();
        let profile = dir.path().join("neutral.pp3");
        std::fs::write(&profile, "").unwrap();
        let mut cfg = config(fake_converter(dir.path(), 0), dir.path().join("out"));
        cfg.profile = Some(profile.clone());

        let converter = RawConverter::new(&cfg).unwrap();
        let args = converter.command_args(Path::new("/raw/a.dng"), Path::new("/out"));
        assert_eq!(
            args,
            vec![
                "-o".to_string(),
                "/out".into(),
                "-p".into(),
                profile.display().to_string(),
                "-j100".into(),
                "-js3".into(),
                "-Y".into(),
                "-c".into(),
                "/raw/a.dng".into(),
            ]
        );
    }

    #[test]
    fn test_missing_profile_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let mut cfg = config(fake_converter(dir.path(), 0), dir.path().join("out"));
        cfg.profile = Some(dir.path().join("missing.pp3"));
        assert!(matches!(
            RawConverter::new(&cfg),
            Err(ConvertError::ProfileNotFound(_))
        ));
    }

    #[test]
    fn test_missing_executable_is_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let cfg = config(dir.path().join("no-such-converter"), dir.path().join("out"));
        assert!(matches!(
            RawConverter::new(&cfg),
            Err(ConvertError::ExecutableNotFound(_))
        ));
    }

    #[test]
    fn test_convert_list_reports_each_file() {
        let dir = tempfile::tempdir().unwrap();
        let raw = dir.path().join("raw");
        std::fs::create_dir_all(raw.join("flight2")).unwrap();
        std::fs::write(raw.join("a.dng"), b"a").unwrap();
        std::fs::write(raw.join("flight2/b.dng"), b"b").unwrap();
        let list = ImageList::scan(&raw, &["dng".to_string()], true).unwrap();

        let out = dir.path().join("out");
        let mut cfg = config(fake_converter(dir.path(), 0), out.clone());
        cfg.keep_dir_tree = true;
        let converter = RawConverter::new(&cfg).unwrap();

        let mut seen = 0;
        let outcomes = converter.convert_list(&list, |_| seen += 1).unwrap();
        assert_eq!(seen, 2);
        assert!(outcomes.iter().all(ConversionOutcome::is_ok));
        assert!(out.join("args.txt").exists());
        let nested = std::fs::read_to_string(out.join("flight2/args.txt")).unwrap();
        assert!(nested.trim_end().ends_with("b.dng"));
    }

    #[test]
    fn test_failed_conversion_captures_stderr() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("a.dng"), b"a").unwrap();
        let converter =
            RawConverter::new(&config(fake_converter(dir.path(), 3), dir.path().join("out")))
                .unwrap();

        let outcome = converter.convert_file(&dir.path().join("a.dng"), &dir.path().join("out"));
        assert_eq!(outcome.status, ConversionStatus::Failed);
        let error = outcome.error.unwrap();
        assert!(error.contains("status 3"));
        assert!(error.contains("boom"));
    }
}
