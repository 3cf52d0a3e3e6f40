//! Sort files into per-category subdirectories by extension.

use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use crate::config::OrganizeConfig;
use crate::error::OrganizeError;

/// Counts for one organize pass.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct OrganizeSummary {
    pub moved: usize,
    pub copied: usize,
    /// Unclassified files, or files whose target already exists
    pub left: usize,
}

impl OrganizeSummary {
    fn add(&mut self, other: OrganizeSummary) {
        self.moved += other.moved;
        self.copied += other.copied;
        self.left += other.left;
    }
}

/// Extension-based file organizer.
#[derive(Debug, Clone)]
pub struct Organizer {
    /// Lowercase extension → category directory name
    categories: BTreeMap<String, String>,
    inplace: bool,
    recursive: bool,
}

impl Organizer {
    pub fn new(rules: &BTreeMap<String, Vec<String>>, inplace: bool, recursive: bool) -> Self {
        let mut categories = BTreeMap::new();
        for (category, exts) in rules {
            for ext in exts {
                let ext = ext.trim_start_matches('.').to_lowercase();
                // First category wins when two rules claim an extension
                categories.entry(ext).or_insert_with(|| category.clone());
            }
        }
        Self {
            categories,
            inplace,
            recursive,
        }
    }

    pub fn from_config(config: &OrganizeConfig) -> Self {
        Self::new(&config.rules, config.inplace, config.recursive)
    }

    /// Category a file belongs to, if any.
    pub fn category_for(&self, path: &Path) -> Option<&str> {
        let ext = path.extension()?.to_str()?.to_lowercase();
        self.categories.get(&ext).map(String::as_str)
    }

    /// Organize `dir`, or each of its immediate subdirectories when recursive.
    pub fn organize(&self, dir: &Path) -> Result<OrganizeSummary, OrganizeError> {
        if !dir.is_dir() {
            return Err(OrganizeError::NotADirectory(dir.to_path_buf()));
        }
        if !self.recursive {
            return self.organize_one(dir);
        }

        let mut summary = OrganizeSummary::default();
        for sub in sorted_entries(dir)?.into_iter().filter(|p| p.is_dir()) {
            summary.add(self.organize_one(&sub)?);
        }
        tracing::info!(
            "Organized {:?}: {} moved, {} copied, {} left",
            dir,
            summary.moved,
            summary.copied,
            summary.left
        );
        Ok(summary)
    }

    fn organize_one(&self, dir: &Path) -> Result<OrganizeSummary, OrganizeError> {
        let mut summary = OrganizeSummary::default();

        for path in sorted_entries(dir)?.into_iter().filter(|p| p.is_file()) {
            let Some(category) = self.category_for(&path) else {
                summary.left += 1;
                continue;
            };
            let Some(name) = path.file_name() else {
                summary.left += 1;
                continue;
            };

            let target_dir = dir.join(category);
            std::fs::create_dir_all(&target_dir).map_err(|source| OrganizeError::Io {
                path: target_dir.clone(),
                source,
            })?;
            let target = target_dir.join(name);
            if target.exists() {
                tracing::warn!("{:?} already exists, leaving {:?} in place", target, path);
                summary.left += 1;
                continue;
            }

            let io_err = |source| OrganizeError::Io {
                path: path.clone(),
                source,
            };
            if self.inplace {
                move_file(&path, &target).map_err(io_err)?;
                summary.moved += 1;
            } else {
                std::fs::copy(&path, &target).map_err(io_err)?;
                summary.copied += 1;
            }
            tracing::debug!("{:?} -> {:?}", path, target);
        }
        Ok(summary)
    }
}

fn sorted_entries(dir: &Path) -> Result<Vec<PathBuf>, OrganizeError> {
    let io_err = |source| OrganizeError::Io {
        path: dir.to_path_buf(),
        source,
    };
    let mut entries = std::fs::read_dir(dir)
        .map_err(io_err)?
        .map(|entry| entry.map(|e| e.path()))
        .collect::<Result<Vec<_>, _>>()
        .map_err(io_err)?;
    entries.sort();
    Ok(entries)
}

/// Rename, falling back to copy + remove across filesystems.
fn move_file(from: &Path, to: &Path) -> std::io::Result<()> {
    if std::fs::rename(from, to).is_ok() {
        return Ok(());
    }
    std::fs::copy(from, to)?;
    std::fs::remove_file(from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), name.as_bytes()).unwrap();
    }

    #[test]
    fn test_moves_by_extension_case_insensitive() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["a.JPG", "b.jpeg", "c.dng", "d.png", "notes.txt"] {
            touch(dir.path(), name);
        }

        let organizer = Organizer::from_config(&OrganizeConfig::default());
        let summary = organizer.organize(dir.path()).unwrap();

        assert_eq!(summary.moved, 4);
        assert_eq!(summary.left, 1);
        assert!(dir.path().join("jpg/a.JPG").exists());
        assert!(dir.path().join("jpg/b.jpeg").exists());
        assert!(dir.path().join("raw/c.dng").exists());
        assert!(dir.path().join("png/d.png").exists());
        assert!(dir.path().join("notes.txt").exists());
        assert!(!dir.path().join("a.JPG").exists());
    }

    #[test]
    fn test_copy_mode_keeps_originals() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.tif");

        let config = OrganizeConfig {
            inplace: false,
            ..OrganizeConfig::default()
        };
        let summary = Organizer::from_config(&config)
            .organize(dir.path())
            .unwrap();

        assert_eq!(summary.copied, 1);
        assert!(dir.path().join("a.tif").exists());
        assert!(dir.path().join("tif/a.tif").exists());
    }

    #[test]
    fn test_recursive_organizes_each_subdirectory() {
        let dir = tempfile::tempdir().unwrap();
        let one = dir.path().join("flight1");
        let two = dir.path().join("flight2");
        std::fs::create_dir_all(&one).unwrap();
        std::fs::create_dir_all(&two).unwrap();
        touch(&one, "a.jpg");
        touch(&two, "b.png");
        touch(dir.path(), "root.jpg");

        let config = OrganizeConfig {
            recursive: true,
            ..OrganizeConfig::default()
        };
        let summary = Organizer::from_config(&config)
            .organize(dir.path())
            .unwrap();

        assert_eq!(summary.moved, 2);
        assert!(one.join("jpg/a.jpg").exists());
        assert!(two.join("png/b.png").exists());
        assert!(dir.path().join("root.jpg").exists());
    }

    #[test]
    fn test_existing_target_is_left_alone() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::create_dir_all(dir.path().join("jpg")).unwrap();
        std::fs::write(dir.path().join("jpg/a.jpg"), b"old").unwrap();
        touch(dir.path(), "a.jpg");

        let summary = Organizer::from_config(&OrganizeConfig::default())
            .organize(dir.path())
            .unwrap();
        assert_eq!(summary.left, 1);
        assert_eq!(std::fs::read(dir.path().join("jpg/a.jpg")).unwrap(), b"old");
    }

    #[test]
    fn test_rejects_non_directory() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "a.jpg");
        let result = Organizer::from_config(&OrganizeConfig::default())
            .organize(&dir.path().join("a.jpg"));
        assert!(matches!(result, Err(OrganizeError::NotADirectory(_))));
    }
}
