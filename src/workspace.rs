//! Workspace layout and cleanup.

use crate::config::PatchConfig;
use crate::confirm::{ConfirmRequest, ConfirmationPolicy};
use crate::error::{PatchError, Result};
use crate::journal::JournalStore;
use crate::mutate::ItemFailure;
use std::fs;
use std::path::{Path, PathBuf};

/// Resolved paths of a patching workspace.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Workspace {
    root: PathBuf,
    base: PathBuf,
    journal: PathBuf,
    dependencies: PathBuf,
}

impl Workspace {
    pub fn from_config(config: &PatchConfig) -> Self {
        let root = config.workspace.clone();
        Self {
            base: root.join(&config.base_dir),
            journal: root.join(&config.journal_file),
            dependencies: root.join(&config.dependencies_dir),
            root,
        }
    }

    /// Overrides the decompiled tree location.
    pub fn with_base(mut self, base: impl Into<PathBuf>) -> Self {
        self.base = base.into();
        self
    }

    /// Overrides the journal location.
    pub fn with_journal(mut self, journal: impl Into<PathBuf>) -> Self {
        self.journal = journal.into();
        self
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn base_path(&self) -> &Path {
        &self.base
    }

    pub fn journal_path(&self) -> &Path {
        &self.journal
    }

    pub fn dependencies_path(&self) -> &Path {
        &self.dependencies
    }

    pub fn journal_store(&self) -> JournalStore {
        JournalStore::new(&self.journal)
    }

    /// Removes every workspace entry except the dependencies folder.
    ///
    /// Asks once for the whole batch. Entries that cannot be removed are
    /// reported and the rest are still cleared.
    pub fn clear(&self, policy: &mut dyn ConfirmationPolicy) -> Result<CleanReport> {
        if !self.root.is_dir() {
            return Err(PatchError::RootNotFound(self.root.clone()));
        }

        let mut entries = Vec::new();
        for entry in fs::read_dir(&self.root)? {
            let path = entry?.path();
            if path != self.dependencies {
                entries.push(path);
            }
        }
        entries.sort();

        let mut report = CleanReport::default();
        if entries.is_empty() {
            return Ok(report);
        }

        let request = ConfirmRequest::ClearWorkspace {
            path: self.root.clone(),
            entries: entries.len(),
        };
        if !policy.confirm(&request) {
            report.declined = true;
            return Ok(report);
        }

        for path in entries {
            let removed = if path.is_dir() {
                fs::remove_dir_all(&path)
            } else {
                fs::remove_file(&path)
            };
            match removed {
                Ok(()) => {
                    tracing::info!(path = %path.display(), "removed");
                    report.removed.push(path);
                }
                Err(source) => {
                    tracing::warn!(path = %path.display(), error = %source, "failed to remove");
                    report.failures.push(ItemFailure {
                        path: path.clone(),
                        error: PatchError::WriteFailure { path, source },
                    });
                }
            }
        }

        Ok(report)
    }
}

#[derive(Debug, Default)]
pub struct CleanReport {
    pub removed: Vec<PathBuf>,
    pub failures: Vec<ItemFailure>,
    pub declined: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::confirm::{ConfirmAll, DeclineAll};
    use tempfile::TempDir;

    fn workspace(dir: &Path) -> Workspace {
        Workspace::from_config(&PatchConfig::new().with_workspace(dir))
    }

    #[test]
    fn test_paths() {
        let ws = workspace(Path::new("/ws"));
        assert_eq!(ws.base_path(), Path::new("/ws/base"));
        assert_eq!(ws.journal_path(), Path::new("/ws/modification_log.json"));
        assert_eq!(ws.dependencies_path(), Path::new("/ws/dependencies"));

        let ws = ws.with_base("/elsewhere/tree");
        assert_eq!(ws.base_path(), Path::new("/elsewhere/tree"));
    }

    #[test]
    fn test_clear_keeps_dependencies() {
        let dir = TempDir::new().unwrap();
        fs::create_dir_all(dir.path().join("dependencies/platform-tools")).unwrap();
        fs::create_dir_all(dir.path().join("base/res")).unwrap();
        fs::write(dir.path().join("app.apk"), "apk").unwrap();
        fs::write(dir.path().join("modification_log.json"), "{}").unwrap();

        let report = workspace(dir.path()).clear(&mut ConfirmAll).unwrap();

        assert_eq!(report.removed.len(), 3);
        assert!(dir.path().join("dependencies/platform-tools").exists());
        assert!(!dir.path().join("base").exists());
        assert!(!dir.path().join("app.apk").exists());
    }

    #[test]
    fn test_clear_declined() {
        let dir = TempDir::new().unwrap();
        fs::write(dir.path().join("app.apk"), "apk").unwrap();

        let report = workspace(dir.path()).clear(&mut DeclineAll).unwrap();

        assert!(report.declined);
        assert!(dir.path().join("app.apk").exists());
    }

    #[test]
    fn test_clear_missing_workspace() {
        let dir = TempDir::new().unwrap();
        let ws = workspace(&dir.path().join("nope"));
        assert!(matches!(
            ws.clear(&mut ConfirmAll),
            Err(PatchError::RootNotFound(_))
        ));
    }
}
