//! Image discovery: builds an ordered, deduplicated [`ImageList`].

use std::collections::HashSet;
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

use super::identity::ImageIdentity;
use crate::error::DiscoveryError;

/// An ordered set of images, unique by canonical path.
///
/// Order is byte-wise lexicographic on the absolute path, so the same
/// filesystem state always yields the same list regardless of traversal order.
#[derive(Debug, Clone, Default)]
pub struct ImageList {
    root: PathBuf,
    images: Vec<ImageIdentity>,
}

impl ImageList {
    /// Scan `root` for files whose extension matches one of `extensions`
    /// (case-insensitive, leading dot optional). An empty extension list
    /// accepts every file. Metadata is not read.
    pub fn scan(
        root: &Path,
        extensions: &[String],
        recursive: bool,
    ) -> Result<Self, DiscoveryError> {
        if !root.is_dir() {
            return Err(DiscoveryError::NotADirectory(root.to_path_buf()));
        }
        let root = root.canonicalize().map_err(|source| DiscoveryError::Resolve {
            path: root.to_path_buf(),
            source,
        })?;
        let filter = ExtensionFilter::new(extensions);
        let max_depth = if recursive { usize::MAX } else { 1 };

        let mut paths = Vec::new();
        for entry in WalkDir::new(&root)
            .min_depth(1)
            .max_depth(max_depth)
            .follow_links(true)
        {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    tracing::warn!("Skipping unreadable entry: {e}");
                    continue;
                }
            };
            if entry.file_type().is_file() && filter.matches(entry.path()) {
                paths.push(entry.into_path());
            }
        }

        let mut list = Self::collect(paths);
        list.root = root;
        tracing::debug!("Discovered {} images under {:?}", list.len(), list.root);
        Ok(list)
    }

    /// Build a list from explicit paths with the same dedup and ordering rules.
    pub fn from_paths<I>(paths: I) -> Result<Self, DiscoveryError>
    where
        I: IntoIterator<Item = PathBuf>,
    {
        let mut resolved = Vec::new();
        for path in paths {
            let canonical = path
                .canonicalize()
                .map_err(|source| DiscoveryError::Resolve { path, source })?;
            resolved.push(canonical);
        }
        let mut list = Self::collect(resolved);
        list.root = common_root(list.images.iter().map(ImageIdentity::path)).unwrap_or_default();
        Ok(list)
    }

    fn collect(paths: Vec<PathBuf>) -> Self {
        let mut seen = HashSet::new();
        let mut unique = Vec::with_capacity(paths.len());
        for path in paths {
            // Walked paths under a canonical root may still pass through symlinks
            let canonical = path.canonicalize().unwrap_or(path);
            if seen.insert(canonical.clone()) {
                unique.push(canonical);
            }
        }
        unique.sort_by(|a, b| a.as_os_str().cmp(b.as_os_str()));

        Self {
            root: PathBuf::new(),
            images: unique.into_iter().map(ImageIdentity::new).collect(),
        }
    }

    /// Directory the list was built from (common ancestor for explicit paths).
    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.images.len()
    }

    pub fn is_empty(&self) -> bool {
        self.images.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&ImageIdentity> {
        self.images.get(index)
    }

    pub fn iter(&self) -> std::slice::Iter<'_, ImageIdentity> {
        self.images.iter()
    }

    pub fn iter_mut(&mut self) -> std::slice::IterMut<'_, ImageIdentity> {
        self.images.iter_mut()
    }

    pub fn paths(&self) -> impl Iterator<Item = &Path> {
        self.images.iter().map(ImageIdentity::path)
    }
}

impl<'a> IntoIterator for &'a ImageList {
    type Item = &'a ImageIdentity;
    type IntoIter = std::slice::Iter<'a, ImageIdentity>;

    fn into_iter(self) -> Self::IntoIter {
        self.images.iter()
    }
}

/// Case-insensitive extension matcher.
#[derive(Debug, Clone)]
pub struct ExtensionFilter {
    extensions: Vec<String>,
}

impl ExtensionFilter {
    pub fn new(extensions: &[String]) -> Self {
        Self {
            extensions: extensions
                .iter()
                .map(|e| e.trim().trim_start_matches('.').to_lowercase())
                .filter(|e| !e.is_empty())
                .collect(),
        }
    }

    /// True when the filter is empty or the extension is listed.
    pub fn matches(&self, path: &Path) -> bool {
        if self.extensions.is_empty() {
            return true;
        }
        path.extension()
            .and_then(|ext| ext.to_str())
            .map(|ext| {
                let ext_lower = ext.to_lowercase();
                self.extensions.iter().any(|e| *e == ext_lower)
            })
            .unwrap_or(false)
    }
}

/// Deepest directory containing every path.
pub fn common_root<'a, I>(paths: I) -> Option<PathBuf>
where
    I: IntoIterator<Item = &'a Path>,
{
    let mut iter = paths.into_iter();
    let first = iter.next()?;
    let mut root: PathBuf = first.parent().unwrap_or(first).to_path_buf();
    for path in iter {
        while !path.starts_with(&root) {
            if !root.pop() {
                return Some(PathBuf::new());
            }
        }
    }
    Some(root)
}
