//! Line-level text handling shared by search, replace and revert.

use std::fs;
use std::io;
use std::path::Path;

/// Bytes inspected when sniffing for binary content.
const SNIFF_LEN: usize = 8192;

/// A single line split from its terminator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Line {
    pub content: String,
    /// `"\n"`, `"\r\n"` or `""` for an unterminated final line.
    pub terminator: &'static str,
}

/// A text file held as lines, rewritten byte-for-byte except for edits.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TextLines {
    lines: Vec<Line>,
}

impl TextLines {
    pub fn parse(source: &str) -> Self {
        let lines = source
            .split_inclusive('\n')
            .map(|raw| {
                if let Some(body) = raw.strip_suffix("\r\n") {
                    Line {
                        content: body.to_string(),
                        terminator: "\r\n",
                    }
                } else if let Some(body) = raw.strip_suffix('\n') {
                    Line {
                        content: body.to_string(),
                        terminator: "\n",
                    }
                } else {
                    Line {
                        content: raw.to_string(),
                        terminator: "",
                    }
                }
            })
            .collect();
        Self { lines }
    }

    /// Reads a strictly UTF-8 file.
    pub fn read(path: &Path) -> io::Result<Self> {
        Ok(Self::parse(&fs::read_to_string(path)?))
    }

    pub fn len(&self) -> usize {
        self.lines.len()
    }

    pub fn is_empty(&self) -> bool {
        self.lines.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Line> {
        self.lines.iter()
    }

    /// Content of the 1-based line `number`.
    pub fn get(&self, number: usize) -> Option<&str> {
        number
            .checked_sub(1)
            .and_then(|idx| self.lines.get(idx))
            .map(|l| l.content.as_str())
    }

    /// Replaces the content of the 1-based line `number`, keeping its
    /// terminator. Returns false when the line does not exist.
    pub fn set(&mut self, number: usize, content: impl Into<String>) -> bool {
        match number.checked_sub(1).and_then(|idx| self.lines.get_mut(idx)) {
            Some(line) => {
                line.content = content.into();
                true
            }
            None => false,
        }
    }

    pub fn render(&self) -> String {
        let mut out = String::with_capacity(
            self.lines
                .iter()
                .map(|l| l.content.len() + l.terminator.len())
                .sum(),
        );
        for line in &self.lines {
            out.push_str(&line.content);
            out.push_str(line.terminator);
        }
        out
    }

    pub fn write(&self, path: &Path) -> io::Result<()> {
        fs::write(path, self.render())
    }
}

/// Reads a file for searching with best-effort decoding.
///
/// Returns `None` for unreadable files and for files whose leading block
/// contains NUL bytes. Invalid UTF-8 elsewhere is replaced.
pub fn read_text_lossy(path: &Path) -> Option<String> {
    let bytes = match fs::read(path) {
        Ok(bytes) => bytes,
        Err(err) => {
            tracing::debug!(path = %path.display(), error = %err, "unreadable file skipped");
            return None;
        }
    };

    if looks_binary(&bytes) {
        tracing::debug!(path = %path.display(), "binary file skipped");
        return None;
    }

    Some(String::from_utf8_lossy(&bytes).into_owned())
}

fn looks_binary(bytes: &[u8]) -> bool {
    bytes[..bytes.len().min(SNIFF_LEN)].contains(&0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_parse_render_preserves_bytes() {
        let source = "a\r\nb\n\nc";
        let lines = TextLines::parse(source);
        assert_eq!(lines.len(), 4);
        assert_eq!(lines.get(1), Some("a"));
        assert_eq!(lines.get(3), Some(""));
        assert_eq!(lines.get(4), Some("c"));
        assert_eq!(lines.render(), source);
    }

    #[test]
    fn test_set_keeps_terminator() {
        let mut lines = TextLines::parse("one\r\ntwo\n");
        assert!(lines.set(1, "ONE"));
        assert!(!lines.set(3, "three"));
        assert!(!lines.set(0, "zero"));
        assert_eq!(lines.render(), "ONE\r\ntwo\n");
    }

    #[test]
    fn test_empty_source() {
        let lines = TextLines::parse("");
        assert!(lines.is_empty());
        assert_eq!(lines.render(), "");
    }

    #[test]
    fn test_read_text_lossy() {
        let dir = TempDir::new().unwrap();
        let text = dir.path().join("a.smali");
        let binary = dir.path().join("b.png");
        let latin = dir.path().join("c.xml");
        fs::write(&text, "const-string v0, \"hi\"\n").unwrap();
        fs::write(&binary, [0x89, b'P', b'N', b'G', 0, 0, 0, 13]).unwrap();
        fs::write(&latin, [b'c', b'a', b'f', 0xE9, b'\n']).unwrap();

        assert!(read_text_lossy(&text).unwrap().contains("const-string"));
        assert!(read_text_lossy(&binary).is_none());
        assert!(read_text_lossy(&latin).unwrap().starts_with("caf"));
        assert!(read_text_lossy(&dir.path().join("missing")).is_none());
    }
}
