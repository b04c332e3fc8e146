//! Serializable tool configuration.

use crate::error::{PatchError, Result};
use crate::matcher::DEFAULT_DELIMITER;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Where the workspace lives and how input is interpreted.
///
/// Can be loaded from YAML or JSON. Every field is optional in the file.
///
/// # Example YAML
///
/// ```yaml
/// workspace: /home/me/Desktop/Apk_Patch
/// base_dir: base
/// journal_file: modification_log.json
/// file_types:
///   - .smali
///   - .xml
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatchConfig {
    pub workspace: PathBuf,
    /// Decompiled tree, relative to the workspace.
    pub base_dir: PathBuf,
    /// Journal file, relative to the workspace.
    pub journal_file: PathBuf,
    /// Folder kept by workspace cleanup, relative to the workspace.
    pub dependencies_dir: PathBuf,
    /// Extensions searched by default; empty means every file.
    pub file_types: Vec<String>,
    pub delimiter: char,
}

impl Default for PatchConfig {
    fn default() -> Self {
        Self {
            workspace: default_workspace(),
            base_dir: PathBuf::from("base"),
            journal_file: PathBuf::from("modification_log.json"),
            dependencies_dir: PathBuf::from("dependencies"),
            file_types: Vec::new(),
            delimiter: DEFAULT_DELIMITER,
        }
    }
}

/// `<home>/Desktop/Apk_Patch`, or a relative `Apk_Patch` without a home.
fn default_workspace() -> PathBuf {
    dirs::home_dir()
        .map(|home| home.join("Desktop").join("Apk_Patch"))
        .unwrap_or_else(|| PathBuf::from("Apk_Patch"))
}

impl PatchConfig {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_workspace(mut self, workspace: impl Into<PathBuf>) -> Self {
        self.workspace = workspace.into();
        self
    }

    pub fn with_base_dir(mut self, base_dir: impl Into<PathBuf>) -> Self {
        self.base_dir = base_dir.into();
        self
    }

    pub fn with_journal_file(mut self, journal_file: impl Into<PathBuf>) -> Self {
        self.journal_file = journal_file.into();
        self
    }

    pub fn with_file_types(mut self, file_types: Vec<String>) -> Self {
        self.file_types = file_types;
        self
    }

    /// Loads a config, choosing the format by extension (`.json` or YAML).
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("json") => Self::from_json(path),
            _ => Self::from_yaml(path),
        }
    }

    /// Load config from a YAML file.
    pub fn from_yaml(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        serde_yaml::from_str(&content).map_err(|e| {
            PatchError::InvalidConfig(format!("Failed to parse YAML config: {}", e))
        })
    }

    /// Load config from a JSON file.
    pub fn from_json(path: impl AsRef<Path>) -> Result<Self> {
        let content = read_config(path.as_ref())?;
        serde_json::from_str(&content).map_err(|e| {
            PatchError::InvalidConfig(format!("Failed to parse JSON config: {}", e))
        })
    }

    /// Save config to a YAML file.
    pub fn to_yaml(&self, path: impl AsRef<Path>) -> Result<()> {
        let content = serde_yaml::to_string(self).map_err(|e| {
            PatchError::InvalidConfig(format!("Failed to serialize config: {}", e))
        })?;
        std::fs::write(path.as_ref(), content)?;
        Ok(())
    }
}

fn read_config(path: &Path) -> Result<String> {
    std::fs::read_to_string(path).map_err(|e| {
        PatchError::Io(std::io::Error::new(
            e.kind(),
            format!("Failed to read config file {}: {}", path.display(), e),
        ))
    })
}
