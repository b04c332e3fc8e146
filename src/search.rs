//! Read-only keyword search over a tree.

use crate::error::Result;
use crate::matcher::{KeywordSet, TreeScanner};
use crate::text::read_text_lossy;
use serde::Serialize;
use std::path::PathBuf;

/// Whether progress steps are also written to the log.
///
/// Front ends that draw their own progress bar use [`ProgressMode::Quiet`]
/// so the log is not flooded with percentages.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ProgressMode {
    #[default]
    Logged,
    Quiet,
}

/// A single keyword hit.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MatchRecord {
    /// 1-based position in emission order.
    pub sequence: usize,
    pub keyword: String,
    /// 1-based.
    pub line_number: usize,
    pub file_name: String,
    pub folder: PathBuf,
    pub file_path: PathBuf,
}

impl std::fmt::Display for MatchRecord {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "{}. {} found in line {} on {} under {}",
            self.sequence,
            self.keyword,
            self.line_number,
            self.file_name,
            self.folder.display()
        )
    }
}

/// Outcome of a search run.
#[derive(Debug, Default)]
pub struct SearchReport {
    pub matches: Vec<MatchRecord>,
    pub folders_scanned: usize,
    pub files_scanned: usize,
}

type ProgressFn<'a> = Box<dyn FnMut(u8) + 'a>;
type MatchFn<'a> = Box<dyn FnMut(&MatchRecord) + 'a>;

/// Builder for a keyword search.
pub struct Search<'a> {
    scanner: TreeScanner,
    keywords: KeywordSet,
    mode: ProgressMode,
    on_progress: Option<ProgressFn<'a>>,
    on_match: Option<MatchFn<'a>>,
}

impl<'a> Search<'a> {
    /// Creates a search rooted at `root`.
    pub fn in_tree(root: impl Into<PathBuf>) -> Self {
        Self::with_scanner(TreeScanner::new(root))
    }

    /// Creates a search over a pre-configured scanner.
    pub fn with_scanner(scanner: TreeScanner) -> Self {
        Self {
            scanner,
            keywords: KeywordSet::default(),
            mode: ProgressMode::default(),
            on_progress: None,
            on_match: None,
        }
    }

    pub fn keywords(mut self, keywords: KeywordSet) -> Self {
        self.keywords = keywords;
        self
    }

    /// Only reads files with these extensions.
    pub fn file_types(mut self, exts: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        self.scanner = self.scanner.extensions(exts);
        self
    }

    pub fn mode(mut self, mode: ProgressMode) -> Self {
        self.mode = mode;
        self
    }

    /// Called once per processed file with the completed percentage.
    pub fn on_progress(mut self, f: impl FnMut(u8) + 'a) -> Self {
        self.on_progress = Some(Box::new(f));
        self
    }

    /// Called for every match as soon as it is found.
    pub fn on_match(mut self, f: impl FnMut(&MatchRecord) + 'a) -> Self {
        self.on_match = Some(Box::new(f));
        self
    }

    /// Runs the search.
    ///
    /// The tree is walked twice: first to count files so that percentages
    /// are meaningful, then to read them.
    pub fn run(mut self) -> Result<SearchReport> {
        let census = self.scanner.census()?;
        let total = census.files;
        let mut report = SearchReport {
            folders_scanned: census.folders,
            ..SearchReport::default()
        };

        let mut processed = 0usize;
        for entry in self.scanner.scan()? {
            if let Some(text) = read_text_lossy(&entry.absolute_path) {
                for (idx, line) in text.lines().enumerate() {
                    let Some(keyword) = self.keywords.match_line(line) else {
                        continue;
                    };
                    let record = MatchRecord {
                        sequence: report.matches.len() + 1,
                        keyword: keyword.to_string(),
                        line_number: idx + 1,
                        file_name: entry.file_name.clone(),
                        folder: entry.relative_folder.clone(),
                        file_path: entry.absolute_path.clone(),
                    };
                    if let Some(cb) = self.on_match.as_mut() {
                        cb(&record);
                    }
                    report.matches.push(record);
                }
            }

            processed += 1;
            let percent = percent_of(processed, total);
            if self.mode == ProgressMode::Logged {
                tracing::info!(percent, file = %entry.absolute_path.display(), "search progress");
            }
            if let Some(cb) = self.on_progress.as_mut() {
                cb(percent);
            }
        }

        report.files_scanned = processed;
        tracing::debug!(
            matches = report.matches.len(),
            files = report.files_scanned,
            folders = report.folders_scanned,
            "search complete"
        );
        Ok(report)
    }
}

/// Integer percentage, clamped so files appearing between the two walks
/// cannot push it past 100.
fn percent_of(processed: usize, total: usize) -> u8 {
    let total = total.max(processed).max(1);
    ((processed * 100 / total).min(100)) as u8
}
