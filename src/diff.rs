//! Inline previews of single-line edits.

use similar::{ChangeTag, TextDiff};
use std::fmt::Write;

const RED: &str = "\x1b[31m";
const GREEN: &str = "\x1b[32m";
const RESET: &str = "\x1b[0m";

/// Renders `before` -> `after` as one line with word-level markers.
///
/// Without color, removed text is shown as `[-old-]` and inserted text as
/// `{+new+}`.
pub fn render_line_change(before: &str, after: &str, colored: bool) -> String {
    let diff = TextDiff::from_words(before, after);
    let mut output = String::new();

    for change in diff.iter_all_changes() {
        let value = change.value();
        match (change.tag(), colored) {
            (ChangeTag::Equal, _) => output.push_str(value),
            (ChangeTag::Delete, true) => {
                let _ = write!(output, "{RED}{value}{RESET}");
            }
            (ChangeTag::Insert, true) => {
                let _ = write!(output, "{GREEN}{value}{RESET}");
            }
            (ChangeTag::Delete, false) => {
                let _ = write!(output, "[-{value}-]");
            }
            (ChangeTag::Insert, false) => {
                let _ = write!(output, "{{+{value}+}}");
            }
        }
    }

    output
}

/// Number of lines that differ between two texts.
pub fn changed_lines(before: &str, after: &str) -> usize {
    TextDiff::from_lines(before, after)
        .iter_all_changes()
        .filter(|c| c.tag() == ChangeTag::Delete)
        .count()
}
