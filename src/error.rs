//! Error types for keyword patching.

use std::path::PathBuf;
use thiserror::Error;

/// The main error type for patching operations.
#[derive(Error, Debug)]
pub enum PatchError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Regex error: {0}")]
    Regex(#[from] regex::Error),

    #[error("Glob pattern error: {0}")]
    Glob(#[from] globset::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Root directory not found: {0}")]
    RootNotFound(PathBuf),

    #[error("Failed to write {path}: {source}")]
    WriteFailure {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Path is not valid UTF-8 and cannot be journaled: {0}")]
    NonUtf8Path(PathBuf),

    #[error("Journal at {path} is corrupt: {message}")]
    JournalCorrupt { path: PathBuf, message: String },

    #[error("No keywords provided")]
    NoKeywords,

    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

/// A specialized Result type for patching operations.
pub type Result<T> = std::result::Result<T, PatchError>;
