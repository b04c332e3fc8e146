//! Delete-by-filename and replace-by-keyword, journaled.

use crate::confirm::{ConfirmRequest, ConfirmationPolicy};
use crate::diff::changed_lines;
use crate::error::{PatchError, Result};
use crate::journal::{Journal, JournalStore, ReplacedLineRecord};
use crate::matcher::{Keyword, KeywordSet, TreeScanner};
use crate::text::TextLines;
use regex::{NoExpand, Regex, RegexBuilder};
use std::collections::HashMap;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

/// A per-item failure that did not stop the batch.
#[derive(Debug)]
pub struct ItemFailure {
    pub path: PathBuf,
    pub error: PatchError,
}

impl fmt::Display for ItemFailure {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}: {}", self.path.display(), self.error)
    }
}

/// Counts and failures from one mutation batch.
#[derive(Debug, Default)]
pub struct MutationReport {
    pub files_deleted: usize,
    pub lines_replaced: usize,
    pub files_rewritten: usize,
    /// Items the policy turned down.
    pub declined: usize,
    pub failures: Vec<ItemFailure>,
}

impl MutationReport {
    pub fn has_failures(&self) -> bool {
        !self.failures.is_empty()
    }
}

/// Applies keyword-driven mutations to a tree and journals them.
///
/// Each batch loads the journal, appends what it executed and saves the
/// whole journal back, whatever the outcome of individual items.
pub struct MutationEngine {
    scanner: TreeScanner,
    store: JournalStore,
    policy: Box<dyn ConfirmationPolicy>,
}

impl MutationEngine {
    pub fn new(
        root: impl Into<PathBuf>,
        store: JournalStore,
        policy: impl ConfirmationPolicy + 'static,
    ) -> Self {
        Self::with_scanner(TreeScanner::new(root), store, policy)
    }

    /// Uses a pre-configured scanner, e.g. one restricted to file types.
    pub fn with_scanner(
        scanner: TreeScanner,
        store: JournalStore,
        policy: impl ConfirmationPolicy + 'static,
    ) -> Self {
        Self {
            scanner,
            store,
            policy: Box::new(policy),
        }
    }

    /// Deletes every file whose name contains one of the keywords.
    pub fn delete_by_filename(&mut self, keywords: &KeywordSet) -> Result<MutationReport> {
        let scan = self.scanner.scan()?;
        let mut journal = self.store.load()?;
        let mut report = MutationReport::default();

        for entry in scan.filter(|e| keywords.match_file_name(&e.file_name)) {
            if let Err(failure) = journalable(&entry.absolute_path) {
                report.failures.push(failure);
                continue;
            }

            let request = ConfirmRequest::DeleteFile {
                path: entry.absolute_path.clone(),
            };
            if !self.policy.confirm(&request) {
                report.declined += 1;
                continue;
            }

            match fs::remove_file(&entry.absolute_path) {
                Ok(()) => {
                    tracing::info!(path = %entry.absolute_path.display(), "deleted");
                    journal.record_deletion(&entry.absolute_path);
                    report.files_deleted += 1;
                }
                Err(source) => {
                    tracing::warn!(
                        path = %entry.absolute_path.display(),
                        error = %source,
                        "failed to delete"
                    );
                    report.failures.push(ItemFailure {
                        path: entry.absolute_path.clone(),
                        error: PatchError::WriteFailure {
                            path: entry.absolute_path,
                            source,
                        },
                    });
                }
            }
        }

        self.store.save(&journal)?;
        Ok(report)
    }

    /// Replaces the matched keyword text on every confirmed line.
    ///
    /// Only the first matching keyword of a line is considered. The keyword
    /// text itself is what gets substituted, case-insensitively, and
    /// `replacement` is inserted verbatim.
    pub fn replace_by_keyword(
        &mut self,
        keywords: &KeywordSet,
        replacement: &str,
    ) -> Result<MutationReport> {
        let scan = self.scanner.scan()?;
        let mut batch = ReplaceBatch {
            keywords,
            replacement,
            patterns: KeywordPatterns::default(),
            journal: self.store.load()?,
            report: MutationReport::default(),
        };

        for entry in scan {
            let path = entry.absolute_path;
            if let Err(failure) = journalable(&path) {
                batch.report.failures.push(failure);
                continue;
            }
            let mut lines = match TextLines::read(&path) {
                Ok(lines) => lines,
                Err(err) => {
                    tracing::debug!(path = %path.display(), error = %err, "not text, skipped");
                    continue;
                }
            };
            let original = lines.render();

            if !batch.replace_in_file(&path, &mut lines, self.policy.as_mut())? {
                continue;
            }

            match lines.write(&path) {
                Ok(()) => {
                    tracing::info!(
                        path = %path.display(),
                        lines = changed_lines(&original, &lines.render()),
                        "rewrote file"
                    );
                    batch.report.files_rewritten += 1;
                }
                Err(source) => {
                    tracing::warn!(path = %path.display(), error = %source, "failed to write changes");
                    batch.report.failures.push(ItemFailure {
                        path: path.clone(),
                        error: PatchError::WriteFailure { path, source },
                    });
                }
            }
        }

        self.store.save(&batch.journal)?;
        Ok(batch.report)
    }
}

/// Rejects paths the journal cannot record, so they are never mutated.
fn journalable(path: &Path) -> std::result::Result<(), ItemFailure> {
    if path.to_str().is_some() {
        return Ok(());
    }
    tracing::warn!(path = %path.display(), "path is not valid UTF-8, skipped");
    Err(ItemFailure {
        path: path.to_path_buf(),
        error: PatchError::NonUtf8Path(path.to_path_buf()),
    })
}

/// State carried across the files of one replace batch.
struct ReplaceBatch<'a> {
    keywords: &'a KeywordSet,
    replacement: &'a str,
    patterns: KeywordPatterns,
    journal: Journal,
    report: MutationReport,
}

impl ReplaceBatch<'_> {
    /// Substitutes confirmed lines in memory. Returns true if any changed.
    fn replace_in_file(
        &mut self,
        path: &Path,
        lines: &mut TextLines,
        policy: &mut dyn ConfirmationPolicy,
    ) -> Result<bool> {
        let keywords = self.keywords;
        let replacement = self.replacement;
        let mut edits = Vec::new();

        for (idx, line) in lines.iter().enumerate() {
            let Some(keyword) = keywords.match_line(&line.content) else {
                continue;
            };
            let pattern = self.patterns.get(keyword)?;
            let replaced = pattern
                .replace_all(&line.content, NoExpand(replacement))
                .into_owned();
            if replaced == line.content {
                // Every word occurs but not as one contiguous phrase.
                tracing::debug!(
                    path = %path.display(),
                    line = idx + 1,
                    keyword = %keyword,
                    "phrase not contiguous, nothing to substitute"
                );
                continue;
            }

            let request = ConfirmRequest::ReplaceLine {
                path: path.to_path_buf(),
                line_number: idx + 1,
                line: line.content.clone(),
                replaced: replaced.clone(),
                keyword: keyword.to_string(),
                replacement: replacement.to_string(),
            };
            if !policy.confirm(&request) {
                self.report.declined += 1;
                continue;
            }

            self.journal.record_replacement(ReplacedLineRecord {
                file_path: path.to_path_buf(),
                line_number: idx + 1,
                original_line: line.content.clone(),
                keyword: keyword.to_string(),
                replacement: replacement.to_string(),
            });
            self.report.lines_replaced += 1;
            edits.push((idx + 1, replaced));
        }

        let dirty = !edits.is_empty();
        for (number, content) in edits {
            lines.set(number, content);
        }
        Ok(dirty)
    }
}

/// Case-insensitive literal patterns, compiled once per keyword.
#[derive(Default)]
struct KeywordPatterns {
    compiled: HashMap<String, Regex>,
}

impl KeywordPatterns {
    fn get(&mut self, keyword: &Keyword) -> Result<&Regex> {
        if !self.compiled.contains_key(keyword.as_str()) {
            let regex = RegexBuilder::new(&regex::escape(keyword.as_str()))
                .case_insensitive(true)
                .build()?;
            self.compiled.insert(keyword.as_str().to_string(), regex);
        }
        Ok(&self.compiled[keyword.as_str()])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::{ConfirmAll, DeclineAll};
    use tempfile::TempDir;

    struct Alternate(bool);

    impl ConfirmationPolicy for Alternate {
        fn confirm(&mut self, _request: &ConfirmRequest) -> bool {
            self.0 = !self.0;
            self.0
        }
    }

    fn setup() -> (TempDir, PathBuf, JournalStore) {
        let dir = TempDir::new().unwrap();
        let base = dir.path().join("base");
        fs::create_dir_all(base.join("res/drawable")).unwrap();
        fs::create_dir_all(base.join("res/values")).unwrap();
        let store = JournalStore::new(dir.path().join("modification_log.json"));
        (dir, base, store)
    }

    fn write(path: &Path, content: &str) {
        fs::write(path, content).unwrap();
    }

    #[test]
    fn test_delete_by_filename() {
        let (_dir, base, store) = setup();
        write(&base.join("res/drawable/unused_icon_1.png"), "a");
        write(&base.join("res/drawable/unused_icon_2.png"), "b");
        write(&base.join("res/drawable/logo.png"), "c");

        let mut engine = MutationEngine::new(&base, store.clone(), ConfirmAll);
        let report = engine
            .delete_by_filename(&KeywordSet::new(["unused_icon"]))
            .unwrap();

        assert_eq!(report.files_deleted, 2);
        assert!(base.join("res/drawable/logo.png").exists());
        assert!(!base.join("res/drawable/unused_icon_1.png").exists());

        let journal = store.load().unwrap();
        assert_eq!(journal.deleted_files.len(), 2);
        assert!(journal.replaced_lines.is_empty());
    }

    #[test]
    fn test_declined_deletions_are_not_journaled() {
        let (_dir, base, store) = setup();
        write(&base.join("res/drawable/ad_1.png"), "a");
        write(&base.join("res/drawable/ad_2.png"), "b");

        let mut engine = MutationEngine::new(&base, store.clone(), Alternate(false));
        let report = engine.delete_by_filename(&KeywordSet::new(["ad_"])).unwrap();

        assert_eq!(report.files_deleted, 1);
        assert_eq!(report.declined, 1);
        assert!(!base.join("res/drawable/ad_1.png").exists());
        assert!(base.join("res/drawable/ad_2.png").exists());
        assert_eq!(store.load().unwrap().deleted_files.len(), 1);
    }

    #[test]
    fn test_journal_accumulates_across_batches() {
        let (_dir, base, store) = setup();
        write(&base.join("res/drawable/a.png"), "a");
        write(&base.join("res/drawable/b.png"), "b");

        let mut engine = MutationEngine::new(&base, store.clone(), ConfirmAll);
        engine.delete_by_filename(&KeywordSet::new(["a.png"])).unwrap();
        engine.delete_by_filename(&KeywordSet::new(["b.png"])).unwrap();

        assert_eq!(store.load().unwrap().deleted_files.len(), 2);
    }

    #[test]
    fn test_replace_targets_keyword_text() {
        let (_dir, base, store) = setup();
        let strings = base.join("res/values/strings.xml");
        write(
            &strings,
            "<resources>\n  <!-- banner -->\n<string name=\"ad_banner\">ENABLED</string>\n</resources>\n",
        );

        let mut engine = MutationEngine::new(&base, store.clone(), ConfirmAll);
        let report = engine
            .replace_by_keyword(&KeywordSet::new(["ad_banner"]), "DISABLED")
            .unwrap();

        assert_eq!(report.lines_replaced, 1);
        assert_eq!(report.files_rewritten, 1);
        let content = fs::read_to_string(&strings).unwrap();
        assert_eq!(
            content.lines().nth(2).unwrap(),
            "<string name=\"DISABLED\">ENABLED</string>"
        );

        let journal = store.load().unwrap();
        let record = &journal.replaced_lines[0];
        assert_eq!(record.line_number, 3);
        assert_eq!(record.original_line, "<string name=\"ad_banner\">ENABLED</string>");
        assert_eq!(record.keyword, "ad_banner");
        assert_eq!(record.replacement, "DISABLED");
    }

    #[test]
    fn test_replace_all_occurrences_case_insensitive() {
        let (_dir, base, store) = setup();
        let file = base.join("Ads.smali");
        write(&file, "    const-string v0, \"Ads ADS ads\"\r\n");

        let mut engine = MutationEngine::new(&base, store, ConfirmAll);
        engine
            .replace_by_keyword(&KeywordSet::new(["ads"]), "$0x")
            .unwrap();

        assert_eq!(
            fs::read_to_string(&file).unwrap(),
            "    const-string v0, \"$0x $0x $0x\"\r\n"
        );
    }

    #[test]
    fn test_first_keyword_only() {
        let (_dir, base, store) = setup();
        let file = base.join("a.xml");
        write(&file, "banner ad\n");

        let mut engine = MutationEngine::new(&base, store.clone(), ConfirmAll);
        let report = engine
            .replace_by_keyword(&KeywordSet::new(["banner", "ad"]), "X")
            .unwrap();

        assert_eq!(report.lines_replaced, 1);
        assert_eq!(fs::read_to_string(&file).unwrap(), "X ad\n");
        assert_eq!(store.load().unwrap().replaced_lines[0].keyword, "banner");
    }

    #[test]
    fn test_declined_replacements_leave_file_alone() {
        let (_dir, base, store) = setup();
        let file = base.join("a.xml");
        write(&file, "ad\nad\n");

        let mut engine = MutationEngine::new(&base, store.clone(), DeclineAll);
        let report = engine
            .replace_by_keyword(&KeywordSet::new(["ad"]), "X")
            .unwrap();

        assert_eq!(report.declined, 2);
        assert_eq!(report.files_rewritten, 0);
        assert_eq!(fs::read_to_string(&file).unwrap(), "ad\nad\n");
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_binary_files_skipped_in_replace() {
        let (_dir, base, store) = setup();
        let png = base.join("res/drawable/ad.png");
        fs::write(&png, [0xff, 0xfe, b'a', b'd', 0x80]).unwrap();

        let mut engine = MutationEngine::new(&base, store, ConfirmAll);
        let report = engine
            .replace_by_keyword(&KeywordSet::new(["ad"]), "X")
            .unwrap();

        assert_eq!(report.lines_replaced, 0);
        assert_eq!(fs::read(&png).unwrap(), vec![0xff, 0xfe, b'a', b'd', 0x80]);
    }

    #[test]
    fn test_missing_root() {
        let (dir, _base, store) = setup();
        let mut engine = MutationEngine::new(dir.path().join("nope"), store, ConfirmAll);
        assert!(matches!(
            engine.delete_by_filename(&KeywordSet::new(["x"])),
            Err(PatchError::RootNotFound(_))
        ));
    }

    #[test]
    fn test_corrupt_journal_aborts_before_mutating() {
        let (_dir, base, store) = setup();
        let file = base.join("a.png");
        write(&file, "x");
        write(store.path(), "[broken");

        let mut engine = MutationEngine::new(&base, store, ConfirmAll);
        let result = engine.delete_by_filename(&KeywordSet::new(["a.png"]));

        assert!(matches!(result, Err(PatchError::JournalCorrupt { .. })));
        assert!(file.exists());
    }

    /// Removes `target` itself just before approving it, so the engine's
    /// own deletion fails.
    struct VanishBeforeDelete {
        target: PathBuf,
    }

    impl ConfirmationPolicy for VanishBeforeDelete {
        fn confirm(&mut self, request: &ConfirmRequest) -> bool {
            if let ConfirmRequest::DeleteFile { path } = request
                && *path == self.target
            {
                fs::remove_file(path).unwrap();
            }
            true
        }
    }

    #[test]
    fn test_delete_failure_is_reported_per_file() {
        let (_dir, base, store) = setup();
        let gone = base.join("res/drawable/ad_1.png");
        write(&gone, "a");
        write(&base.join("res/drawable/ad_2.png"), "b");
        write(&base.join("res/drawable/ad_3.png"), "c");

        let policy = VanishBeforeDelete {
            target: gone.clone(),
        };
        let mut engine = MutationEngine::new(&base, store.clone(), policy);
        let report = engine.delete_by_filename(&KeywordSet::new(["ad_"])).unwrap();

        assert_eq!(report.files_deleted, 2);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].path, gone);
        assert!(matches!(
            report.failures[0].error,
            PatchError::WriteFailure { .. }
        ));
        assert!(!base.join("res/drawable/ad_2.png").exists());
        assert!(!base.join("res/drawable/ad_3.png").exists());

        let journaled: Vec<PathBuf> = store
            .load()
            .unwrap()
            .deleted_files
            .into_iter()
            .map(|r| r.file_path)
            .collect();
        assert_eq!(
            journaled,
            vec![
                base.join("res/drawable/ad_2.png"),
                base.join("res/drawable/ad_3.png")
            ]
        );
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn test_non_utf8_paths_are_skipped_not_lost() {
        use std::ffi::OsStr;
        use std::os::unix::ffi::OsStrExt;

        let (_dir, base, store) = setup();
        let good = base.join("a.smali");
        let odd = base.join(OsStr::from_bytes(b"b_\xff.smali"));
        write(&good, "ad\n");
        write(&odd, "ad\n");

        let mut engine = MutationEngine::new(&base, store.clone(), ConfirmAll);
        let report = engine
            .replace_by_keyword(&KeywordSet::new(["ad"]), "X")
            .unwrap();

        assert_eq!(report.lines_replaced, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(matches!(report.failures[0].error, PatchError::NonUtf8Path(_)));
        assert_eq!(fs::read_to_string(&good).unwrap(), "X\n");
        assert_eq!(fs::read_to_string(&odd).unwrap(), "ad\n");

        let journal = store.load().unwrap();
        assert_eq!(journal.replaced_lines.len(), 1);
        assert_eq!(journal.replaced_lines[0].file_path, good);

        let report = engine
            .delete_by_filename(&KeywordSet::new([".smali"]))
            .unwrap();
        assert_eq!(report.files_deleted, 1);
        assert_eq!(report.failures.len(), 1);
        assert!(odd.exists());
        assert_eq!(store.load().unwrap().deleted_files.len(), 1);
    }

    #[cfg(unix)]
    #[test]
    fn test_write_failure_is_reported_per_file() {
        use std::os::unix::fs::PermissionsExt;

        let (_dir, base, store) = setup();
        let locked = base.join("res/values/locked.xml");
        let open = base.join("res/values/open.xml");
        write(&locked, "ad\n");
        write(&open, "ad\n");
        fs::set_permissions(&locked, fs::Permissions::from_mode(0o444)).unwrap();

        // Root ignores permission bits; nothing to observe in that case.
        if fs::OpenOptions::new().write(true).open(&locked).is_ok() {
            return;
        }

        let mut engine = MutationEngine::new(&base, store.clone(), ConfirmAll);
        let report = engine
            .replace_by_keyword(&KeywordSet::new(["ad"]), "X")
            .unwrap();

        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.files_rewritten, 1);
        assert_eq!(fs::read_to_string(&open).unwrap(), "X\n");
        // Both lines were journaled even though one file could not be written.
        assert_eq!(store.load().unwrap().replaced_lines.len(), 2);
    }
}
