//! Tree scanning and keyword matching.

pub mod file;
pub mod keyword;

pub use file::{FileEntry, Scan, TreeCensus, TreeScanner};
pub use keyword::{DEFAULT_DELIMITER, Keyword, KeywordSet, match_file_name, match_line};
