//! Restores journaled line replacements.
//!
//! Deleted files are only reported back; their bytes were never captured.
//! The journal is left untouched, so running a revert again with no
//! mutation in between rewrites the same lines with the same text.

use crate::error::PatchError;
use crate::journal::{Journal, ReplacedLineRecord};
use crate::mutate::ItemFailure;
use crate::text::TextLines;
use indexmap::IndexMap;
use std::path::{Path, PathBuf};

/// A line that was written back.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RestoredLine {
    pub file_path: PathBuf,
    pub line_number: usize,
    /// What the line read before the revert.
    pub previous: String,
    pub restored: String,
}

/// A journal entry that could not be applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevertWarning {
    pub file_path: PathBuf,
    pub line_number: usize,
    /// Line count of the file at revert time.
    pub line_count: usize,
}

impl std::fmt::Display for RevertWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "could not apply line {} to {} (file has {} lines)",
            self.line_number,
            self.file_path.display(),
            self.line_count
        )
    }
}

#[derive(Debug, Default)]
pub struct RevertReport {
    pub restored: Vec<RestoredLine>,
    pub warnings: Vec<RevertWarning>,
    /// Files that could not be read or rewritten.
    pub failures: Vec<ItemFailure>,
    pub files_rewritten: usize,
    /// Deleted files, listed for the user; never restored.
    pub unrestorable: Vec<PathBuf>,
}

/// Replays a journal against the filesystem.
#[derive(Debug, Default)]
pub struct RevertEngine;

impl RevertEngine {
    pub fn new() -> Self {
        Self
    }

    pub fn revert(&self, journal: &Journal) -> RevertReport {
        let mut report = RevertReport::default();

        for (path, records) in group_by_file(&journal.replaced_lines) {
            self.revert_file(path, &records, &mut report);
        }

        report.unrestorable = journal
            .deleted_files
            .iter()
            .map(|d| d.file_path.clone())
            .collect();
        if !report.unrestorable.is_empty() {
            tracing::info!(
                count = report.unrestorable.len(),
                "deleted files cannot be restored automatically"
            );
        }

        report
    }

    fn revert_file(&self, path: &Path, records: &[&ReplacedLineRecord], report: &mut RevertReport) {
        let mut lines = match TextLines::read(path) {
            Ok(lines) => lines,
            Err(source) => {
                tracing::warn!(path = %path.display(), error = %source, "could not read file to revert");
                report.failures.push(ItemFailure {
                    path: path.to_path_buf(),
                    error: PatchError::Io(source),
                });
                return;
            }
        };

        let mut restored = Vec::new();
        for record in records {
            let Some(previous) = lines.get(record.line_number).map(str::to_string) else {
                let warning = RevertWarning {
                    file_path: path.to_path_buf(),
                    line_number: record.line_number,
                    line_count: lines.len(),
                };
                tracing::warn!("{warning}");
                report.warnings.push(warning);
                continue;
            };

            lines.set(record.line_number, record.original_line.clone());
            restored.push(RestoredLine {
                file_path: path.to_path_buf(),
                line_number: record.line_number,
                previous,
                restored: record.original_line.clone(),
            });
        }

        if restored.is_empty() {
            return;
        }

        match lines.write(path) {
            Ok(()) => {
                tracing::info!(path = %path.display(), lines = restored.len(), "reverted");
                report.files_rewritten += 1;
                report.restored.extend(restored);
            }
            Err(source) => {
                tracing::warn!(path = %path.display(), error = %source, "failed to write revert");
                report.failures.push(ItemFailure {
                    path: path.to_path_buf(),
                    error: PatchError::WriteFailure {
                        path: path.to_path_buf(),
                        source,
                    },
                });
            }
        }
    }
}

/// Groups records by file, in order of first appearance, keeping the
/// recording order within each file.
fn group_by_file(records: &[ReplacedLineRecord]) -> IndexMap<&Path, Vec<&ReplacedLineRecord>> {
    let mut groups: IndexMap<&Path, Vec<&ReplacedLineRecord>> = IndexMap::new();
    for record in records {
        groups
            .entry(record.file_path.as_path())
            .or_default()
            .push(record);
    }
    groups
}
