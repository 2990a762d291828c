//! Completion-text artifact parser
//!
//! Turns one completion's raw text into a [`FileSet`] plus a set of paths
//! marked for deletion. The wire format is line based:
//!
//! ````text
//! FILE: src/main.py
//! ```python
//! print("hello")
//! ```
//! DELETE FILE: old.py
//! ````
//!
//! Only lines inside fenced code regions are kept, so prose the model wraps
//! around its code is dropped. The parser never fails: malformed input is
//! captured on a best-effort basis and the rest is ignored.

use crate::file_set::FileSet;
use crate::path::ArtifactPath;
use std::collections::BTreeSet;

/// Marker that starts a file section
pub const FILE_MARKER: &str = "FILE:";

/// Marker that requests a deletion
pub const DELETE_MARKER: &str = "DELETE FILE:";

const FENCE: &str = "```";

/// Result of parsing one completion
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ParsedArtifacts {
    /// Files with their captured content
    pub files: FileSet,
    /// Paths marked with `DELETE FILE:`
    pub deletions: BTreeSet<ArtifactPath>,
}

impl ParsedArtifacts {
    /// Whether nothing was recognized
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.is_empty() && self.deletions.is_empty()
    }
}

/// A recognized marker line
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Marker<'a> {
    File(&'a str),
    Delete(&'a str),
}

/// Classify a line as a file or delete marker
pub(crate) fn marker(line: &str) -> Option<Marker<'_>> {
    let line = line.trim_end();
    if let Some(rest) = line.strip_prefix(DELETE_MARKER) {
        return Some(Marker::Delete(clean_marker_path(rest)));
    }
    line.strip_prefix(FILE_MARKER)
        .map(|rest| Marker::File(clean_marker_path(rest)))
}

/// Strip decoration models like to put around paths (`` `a.py` ``, `**a.py**`)
fn clean_marker_path(raw: &str) -> &str {
    raw.trim()
        .trim_matches(|c| matches!(c, '`' | '"' | '\'' | '*'))
        .trim()
}

/// Whether a line is a fence: ```` ``` ```` optionally followed by one
/// language tag token
#[must_use]
pub fn is_fence(line: &str) -> bool {
    let Some(tag) = line.trim().strip_prefix(FENCE) else {
        return false;
    };
    tag.chars()
        .all(|c| c.is_alphanumeric() || matches!(c, '+' | '-' | '_' | '.' | '#'))
}

#[derive(Default)]
struct Cursor<'a> {
    current: Option<(ArtifactPath, Vec<&'a str>)>,
    inside_code: bool,
    out: ParsedArtifacts,
}

impl<'a> Cursor<'a> {
    fn feed(&mut self, line: &'a str) {
        match marker(line) {
            Some(Marker::File(raw)) => {
                self.close();
                match ArtifactPath::new(raw) {
                    Ok(path) => self.current = Some((path, Vec::new())),
                    Err(e) => tracing::debug!(marker = raw, error = %e, "ignoring file marker"),
                }
            }
            Some(Marker::Delete(raw)) => {
                self.close();
                match ArtifactPath::new(raw) {
                    Ok(path) => {
                        self.out.files.remove(&path);
                        self.out.deletions.insert(path);
                    }
                    Err(e) => tracing::debug!(marker = raw, error = %e, "ignoring delete marker"),
                }
            }
            None if is_fence(line) => self.inside_code = !self.inside_code,
            None => {
                if self.inside_code {
                    if let Some((_, lines)) = self.current.as_mut() {
                        lines.push(line);
                    }
                }
            }
        }
    }

    fn close(&mut self) {
        self.inside_code = false;
        if let Some((path, lines)) = self.current.take() {
            self.out.deletions.remove(&path);
            self.out.files.insert(path, lines.join("\n"));
        }
    }

    fn finish(mut self) -> ParsedArtifacts {
        if self.inside_code && self.current.is_some() {
            tracing::debug!("unterminated code fence at end of input");
        }
        self.close();
        self.out
    }
}

/// Parse raw completion text into files and deletions
#[must_use]
pub fn parse(raw: &str) -> ParsedArtifacts {
    let mut cursor = Cursor::default();
    for line in raw.split('\n') {
        cursor.feed(line);
    }
    let parsed = cursor.finish();
    tracing::trace!(
        files = parsed.files.len(),
        deletions = parsed.deletions.len(),
        "parsed completion text"
    );
    parsed
}

/// Canonical serialization of a file set
///
/// `parse(&render(files)).files == *files` whenever no content line is a
/// fence or a marker.
#[must_use]
pub fn render(files: &FileSet) -> String {
    let mut out = String::with_capacity(files.total_bytes() + files.len() * 32);
    for (path, content) in files.iter() {
        out.push_str(FILE_MARKER);
        out.push(' ');
        out.push_str(path.as_str());
        out.push('\n');
        out.push_str(FENCE);
        out.push('\n');
        out.push_str(content);
        out.push('\n');
        out.push_str(FENCE);
        out.push_str("\n\n");
    }
    out
}

/// Remove fence lines and trim the result
#[must_use]
pub fn strip_fences(text: &str) -> String {
    text.split('\n')
        .filter(|line| !is_fence(line))
        .collect::<Vec<_>>()
        .join("\n")
        .trim()
        .to_string()
}
