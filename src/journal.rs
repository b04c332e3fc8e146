//! Durable record of executed deletions and line replacements.
//!
//! The journal is a single JSON document:
//!
//! ```json
//! {
//!     "deleted_files": [{ "file_path": "..." }],
//!     "replaced_lines": [{
//!         "file_path": "...",
//!         "line_number": 3,
//!         "original_line": "...",
//!         "keyword": "...",
//!         "replacement": "..."
//!     }]
//! }
//! ```
//!
//! It is loaded whole, extended in memory and saved whole after each batch.
//! There is no locking; only one writer may use a journal at a time.

use crate::error::{PatchError, Result};
use serde::{Deserialize, Serialize};
use std::fs;
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// A file removed by delete-by-filename.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DeletedFileRecord {
    pub file_path: PathBuf,
}

/// A line rewritten by replace-by-keyword.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReplacedLineRecord {
    pub file_path: PathBuf,
    /// 1-based.
    pub line_number: usize,
    /// Exact pre-substitution text without its line terminator.
    pub original_line: String,
    pub keyword: String,
    pub replacement: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Journal {
    #[serde(default)]
    pub deleted_files: Vec<DeletedFileRecord>,
    #[serde(default)]
    pub replaced_lines: Vec<ReplacedLineRecord>,
}

impl Journal {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_deletion(&mut self, file_path: impl Into<PathBuf>) {
        self.deleted_files.push(DeletedFileRecord {
            file_path: file_path.into(),
        });
    }

    pub fn record_replacement(&mut self, record: ReplacedLineRecord) {
        self.replaced_lines.push(record);
    }

    pub fn is_empty(&self) -> bool {
        self.deleted_files.is_empty() && self.replaced_lines.is_empty()
    }
}

/// Location of a persisted journal.
#[derive(Debug, Clone)]
pub struct JournalStore {
    path: PathBuf,
}

impl JournalStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Loads the journal. A missing file yields an empty journal.
    pub fn load(&self) -> Result<Journal> {
        let content = match fs::read_to_string(&self.path) {
            Ok(content) => content,
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::debug!(path = %self.path.display(), "no journal yet, starting empty");
                return Ok(Journal::new());
            }
            Err(err) => return Err(err.into()),
        };

        serde_json::from_str(&content).map_err(|e| PatchError::JournalCorrupt {
            path: self.path.clone(),
            message: e.to_string(),
        })
    }

    /// Replaces the stored journal with `journal`.
    ///
    /// The document is written to a sibling temp file and renamed over the
    /// journal, so an interrupted save leaves the previous journal intact.
    pub fn save(&self, journal: &Journal) -> Result<()> {
        let parent = match self.path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent,
            _ => Path::new("."),
        };
        fs::create_dir_all(parent)?;

        let mut buf = Vec::new();
        let formatter = serde_json::ser::PrettyFormatter::with_indent(b"    ");
        let mut ser = serde_json::Serializer::with_formatter(&mut buf, formatter);
        journal.serialize(&mut ser)?;

        let mut temp = NamedTempFile::new_in(parent)?;
        temp.write_all(&buf)?;
        temp.as_file().sync_all()?;
        temp.persist(&self.path).map_err(|err| err.error)?;
        tracing::debug!(
            path = %self.path.display(),
            deleted = journal.deleted_files.len(),
            replaced = journal.replaced_lines.len(),
            "journal saved"
        );
        Ok(())
    }
}
