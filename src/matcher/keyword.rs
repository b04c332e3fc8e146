//! Keyword expressions and the line / file-name predicates built on them.

use crate::error::{PatchError, Result};
use std::fmt;

/// Default separator between keyword expressions in user input.
pub const DEFAULT_DELIMITER: char = '|';

/// One keyword expression: a case-folded, whitespace-normalized phrase.
///
/// A line matches when every word of the expression occurs in it
/// (case-insensitive substring test). File names are matched against the
/// whole phrase instead.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Keyword {
    text: String,
    words: Vec<String>,
}

impl Keyword {
    /// Creates a keyword from raw text. Returns `None` for blank input.
    pub fn new(raw: &str) -> Option<Self> {
        let words: Vec<String> = raw.split_whitespace().map(str::to_lowercase).collect();
        if words.is_empty() {
            return None;
        }
        Some(Self {
            text: words.join(" "),
            words,
        })
    }

    /// The normalized expression text.
    pub fn as_str(&self) -> &str {
        &self.text
    }

    /// The individual words of the expression.
    pub fn words(&self) -> &[String] {
        &self.words
    }

    /// True if every word is a case-insensitive substring of `line`.
    pub fn matches_line(&self, line: &str) -> bool {
        let lower = line.to_lowercase();
        self.matches_lowered(&lower)
    }

    fn matches_lowered(&self, lower_line: &str) -> bool {
        self.words.iter().all(|w| lower_line.contains(w.as_str()))
    }

    /// True if the whole phrase is a case-insensitive substring of `name`.
    pub fn matches_file_name(&self, name: &str) -> bool {
        name.to_lowercase().contains(self.text.as_str())
    }
}

impl fmt::Display for Keyword {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.text)
    }
}

/// An ordered list of keyword expressions.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct KeywordSet {
    keywords: Vec<Keyword>,
}

impl KeywordSet {
    /// Creates a set from individual expressions, dropping blank ones.
    pub fn new(exprs: impl IntoIterator<Item = impl AsRef<str>>) -> Self {
        Self {
            keywords: exprs
                .into_iter()
                .filter_map(|e| Keyword::new(e.as_ref()))
                .collect(),
        }
    }

    /// Parses delimiter-separated user input such as `"ad banner | tracker"`.
    pub fn parse(input: &str, delimiter: char) -> Result<Self> {
        let set = Self::new(input.split(delimiter));
        if set.is_empty() {
            return Err(PatchError::NoKeywords);
        }
        Ok(set)
    }

    /// Returns the first expression matching `line`, in caller order.
    pub fn match_line(&self, line: &str) -> Option<&Keyword> {
        let lower = line.to_lowercase();
        self.keywords.iter().find(|k| k.matches_lowered(&lower))
    }

    /// True if any expression is a substring of the file name.
    pub fn match_file_name(&self, name: &str) -> bool {
        self.keywords.iter().any(|k| k.matches_file_name(name))
    }

    pub fn iter(&self) -> impl Iterator<Item = &Keyword> {
        self.keywords.iter()
    }

    pub fn len(&self) -> usize {
        self.keywords.len()
    }

    pub fn is_empty(&self) -> bool {
        self.keywords.is_empty()
    }
}

impl<'a> IntoIterator for &'a KeywordSet {
    type Item = &'a Keyword;
    type IntoIter = std::slice::Iter<'a, Keyword>;

    fn into_iter(self) -> Self::IntoIter {
        self.keywords.iter()
    }
}

/// Returns the first expression in `keywords` that matches `line`.
pub fn match_line<'a>(line: &str, keywords: &'a KeywordSet) -> Option<&'a Keyword> {
    keywords.match_line(line)
}

/// True if any expression in `keywords` is contained in the file name.
pub fn match_file_name(name: &str, keywords: &KeywordSet) -> bool {
    keywords.match_file_name(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_normalizes_input() {
        let set = KeywordSet::parse("  Ad   Banner | |TRACKER  ", '|').unwrap();
        let texts: Vec<&str> = set.iter().map(Keyword::as_str).collect();
        assert_eq!(texts, vec!["ad banner", "tracker"]);
    }

    #[test]
    fn test_parse_empty_input() {
        assert!(matches!(
            KeywordSet::parse(" | |", '|'),
            Err(PatchError::NoKeywords)
        ));
    }

    #[test]
    fn test_all_words_required() {
        let set = KeywordSet::new(["show ads"]);
        assert!(set.match_line("if (ADS) { show(); }").is_some());
        assert!(set.match_line("if (ads) { hide(); }").is_none());
    }

    #[test]
    fn test_substring_not_word_boundary() {
        let set = KeywordSet::new(["cat"]);
        assert!(set.match_line("<item category=\"x\"/>").is_some());
    }

    #[test]
    fn test_first_match_wins() {
        let set = KeywordSet::new(["banner", "ad"]);
        let hit = set.match_line("ad_banner").unwrap();
        assert_eq!(hit.as_str(), "banner");
    }

    #[test]
    fn test_file_name_uses_whole_phrase() {
        let set = KeywordSet::new(["unused icon"]);
        assert!(!set.match_file_name("unused_icon.png"));
        assert!(set.match_file_name("Unused Icon.png"));

        let set = KeywordSet::new(["unused_icon"]);
        assert!(set.match_file_name("UNUSED_ICON_1.png"));
        assert!(!set.match_file_name("logo.png"));
    }

    #[test]
    fn test_custom_delimiter() {
        let set = KeywordSet::parse("a;b", ';').unwrap();
        assert_eq!(set.len(), 2);
    }
}
