//! Tree scanning with optional file-type and glob filters.

use crate::error::{PatchError, Result};
use globset::{Glob, GlobSet, GlobSetBuilder};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

/// A regular file found under the scan root.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    pub absolute_path: PathBuf,
    /// Parent directory relative to the root, `"."` for top-level files.
    pub relative_folder: PathBuf,
    pub file_name: String,
}

/// File and folder totals for a tree.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct TreeCensus {
    pub files: usize,
    pub folders: usize,
}

/// Enumerates files under a root directory.
///
/// The scanner holds no traversal state, so [`TreeScanner::scan`] can be
/// called any number of times and each call walks the tree afresh.
#[derive(Debug, Default, Clone)]
pub struct TreeScanner {
    root: PathBuf,
    extensions: Vec<String>,
    include_globs: Vec<String>,
    exclude_globs: Vec<String>,
}

impl TreeScanner {
    /// Creates a scanner rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            ..Self::default()
        }
    }

    /// Restricts the scan to files with the given extension.
    ///
    /// Accepts `xml`, `.xml` or `.XML`.
    pub fn extension(mut self, ext: impl AsRef<str>) -> Self {
        let ext = ext.as_ref().trim().trim_start_matches('.').to_lowercase();
        if !ext.is_empty() {
            self.extensions.push(ext);
        }
        self
    }

    /// Restricts the scan to files with any of the given extensions.
    pub fn extensions(mut self, exts: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        for ext in exts {
            self = self.extension(ext);
        }
        self
    }

    /// Includes only files whose root-relative path matches the glob.
    pub fn include(mut self, pattern: impl Into<String>) -> Self {
        self.include_globs.push(pattern.into());
        self
    }

    /// Excludes files whose root-relative path matches the glob.
    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.exclude_globs.push(pattern.into());
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Starts a lazy walk over the files admitted by the filters.
    pub fn scan(&self) -> Result<Scan> {
        self.ensure_root()?;
        Ok(Scan {
            root: self.root.clone(),
            walker: WalkDir::new(&self.root).sort_by_file_name().into_iter(),
            filter: self.compile()?,
        })
    }

    /// Counts admitted files at any depth and the root's immediate folders.
    pub fn census(&self) -> Result<TreeCensus> {
        self.ensure_root()?;
        let filter = self.compile()?;
        let mut census = TreeCensus::default();

        for entry in WalkDir::new(&self.root).min_depth(1).into_iter() {
            let Ok(entry) = entry else { continue };
            let file_type = entry.file_type();
            if file_type.is_dir() {
                if entry.depth() == 1 {
                    census.folders += 1;
                }
            } else if file_type.is_file() && filter.admits(&self.root, entry.path()) {
                census.files += 1;
            }
        }

        Ok(census)
    }

    fn ensure_root(&self) -> Result<()> {
        if self.root.is_dir() {
            Ok(())
        } else {
            Err(PatchError::RootNotFound(self.root.clone()))
        }
    }

    fn compile(&self) -> Result<ScanFilter> {
        Ok(ScanFilter {
            extensions: self.extensions.clone(),
            include: build_glob_set(&self.include_globs)?,
            exclude: build_glob_set(&self.exclude_globs)?,
        })
    }
}

fn build_glob_set(patterns: &[String]) -> Result<Option<GlobSet>> {
    if patterns.is_empty() {
        return Ok(None);
    }
    let mut builder = GlobSetBuilder::new();
    for pattern in patterns {
        builder.add(Glob::new(pattern)?);
    }
    Ok(Some(builder.build()?))
}

#[derive(Debug, Clone)]
struct ScanFilter {
    extensions: Vec<String>,
    include: Option<GlobSet>,
    exclude: Option<GlobSet>,
}

impl ScanFilter {
    fn admits(&self, root: &Path, path: &Path) -> bool {
        if !self.extensions.is_empty() {
            let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("");
            if !self.extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)) {
                return false;
            }
        }

        let rel_path = path.strip_prefix(root).unwrap_or(path);

        if let Some(include) = &self.include
            && !include.is_match(rel_path)
        {
            return false;
        }

        if let Some(exclude) = &self.exclude
            && exclude.is_match(rel_path)
        {
            return false;
        }

        true
    }
}

/// Lazy iterator returned by [`TreeScanner::scan`].
pub struct Scan {
    root: PathBuf,
    walker: walkdir::IntoIter,
    filter: ScanFilter,
}

impl Iterator for Scan {
    type Item = FileEntry;

    fn next(&mut self) -> Option<FileEntry> {
        loop {
            let entry = match self.walker.next()? {
                Ok(entry) => entry,
                Err(err) => {
                    tracing::debug!(error = %err, "skipping unreadable entry");
                    continue;
                }
            };

            if !entry.file_type().is_file() || !self.filter.admits(&self.root, entry.path()) {
                continue;
            }

            let path = entry.path();
            let relative_folder = path
                .parent()
                .and_then(|p| p.strip_prefix(&self.root).ok())
                .filter(|p| !p.as_os_str().is_empty())
                .map_or_else(|| PathBuf::from("."), Path::to_path_buf);

            return Some(FileEntry {
                absolute_path: path.to_path_buf(),
                relative_folder,
                file_name: entry.file_name().to_string_lossy().into_owned(),
            });
        }
    }
}
