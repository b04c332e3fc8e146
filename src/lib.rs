//! # APK Patch
//!
//! Keyword search, deletion and replacement over a decompiled APK tree,
//! with a journal that lets replacements be reverted byte-for-byte.
//!
//! This crate provides:
//! - Scanning a tree with optional file-type and glob filters
//! - Matching lines and file names against keyword expressions
//! - Read-only search with progress reporting
//! - Journaled delete-by-filename and replace-by-keyword
//! - Reverting journaled replacements
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use apk_patch::prelude::*;
//!
//! let keywords = KeywordSet::parse("ad banner | tracker", '|')?;
//!
//! let report = Search::in_tree("./base")
//!     .keywords(keywords.clone())
//!     .file_types([".smali", ".xml"])
//!     .on_progress(|percent| eprint!("\rProgress: {percent}%"))
//!     .run()?;
//!
//! for m in &report.matches {
//!     println!("{m}");
//! }
//! # Ok::<(), apk_patch::error::PatchError>(())
//! ```
//!
//! ## Replace and Revert
//!
//! ```rust,no_run
//! use apk_patch::prelude::*;
//!
//! let store = JournalStore::new("./modification_log.json");
//! let mut engine = MutationEngine::new("./base", store.clone(), ConfirmAll);
//!
//! let keywords = KeywordSet::parse("ad_banner", '|')?;
//! let report = engine.replace_by_keyword(&keywords, "DISABLED")?;
//! println!("Replaced {} line(s)", report.lines_replaced);
//!
//! let revert = RevertEngine::new().revert(&store.load()?);
//! println!("Restored {} line(s)", revert.restored.len());
//! # Ok::<(), apk_patch::error::PatchError>(())
//! ```
//!
//! ## Interactive Confirmation
//!
//! Engines ask an injected [`ConfirmationPolicy`](confirm::ConfirmationPolicy).
//! To ask the user from a worker thread, pair an
//! [`AskEach`](confirm::AskEach) policy with [`input_channel`](confirm::input_channel)
//! and answer the requests wherever user interaction lives.

pub mod config;
pub mod confirm;
pub mod diff;
pub mod error;
pub mod journal;
pub mod matcher;
pub mod mutate;
pub mod revert;
pub mod search;
pub mod text;
pub mod workspace;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::PatchConfig;
    pub use crate::confirm::{
        AskEach, ChannelPrompter, ConfirmAll, ConfirmRequest, ConfirmationPolicy, DeclineAll,
        InputRequest, InputRequests, Prompt, PromptKind, Prompter, StdinPrompter, input_channel,
        is_affirmative,
    };
    pub use crate::diff::render_line_change;
    pub use crate::error::{PatchError, Result};
    pub use crate::journal::{DeletedFileRecord, Journal, JournalStore, ReplacedLineRecord};
    pub use crate::matcher::{
        FileEntry, Keyword, KeywordSet, TreeCensus, TreeScanner, match_file_name, match_line,
    };
    pub use crate::mutate::{ItemFailure, MutationEngine, MutationReport};
    pub use crate::revert::{RestoredLine, RevertEngine, RevertReport, RevertWarning};
    pub use crate::search::{MatchRecord, ProgressMode, Search, SearchReport};
    pub use crate::workspace::{CleanReport, Workspace};
}

pub use prelude::*;
