//! Targeted change instructions
//!
//! A [`Hunk`] is one atomic replace/insert/delete against one file. Models
//! emit hunks as named blocks:
//!
//! ````text
//! CHANGE: replace
//! TARGET: calc.py
//! OLD:
//! ```python
//!     return number / 8
//! ```
//! NEW:
//! ```python
//!     return number % 8
//! ```
//! ````
//!
//! `OLD:`/`NEW:` accept either a fenced block or an inline value on the same
//! line. Blocks that cannot be understood are skipped and reported.

use crate::parser::{self, is_fence, Marker};
use crate::path::ArtifactPath;
use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

/// Marker that opens a change block
pub const CHANGE_MARKER: &str = "CHANGE:";
const TARGET_MARKER: &str = "TARGET:";
const OLD_MARKER: &str = "OLD:";
const NEW_MARKER: &str = "NEW:";

/// Where inserted content goes relative to its anchor
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Placement {
    /// Directly before the anchor
    Before,
    /// Directly after the anchor
    After,
}

/// Kind of change a hunk performs
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HunkAction {
    /// Swap an exact substring for new content
    Replace,
    /// Add content next to an anchor, or create the file
    Insert(Placement),
    /// Remove an exact substring
    Delete,
}

impl FromStr for HunkAction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized = s
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .to_ascii_lowercase();
        match normalized.as_str() {
            "replace" | "modify" => Ok(Self::Replace),
            "insert" | "insert after" | "append" => Ok(Self::Insert(Placement::After)),
            "insert before" | "prepend" => Ok(Self::Insert(Placement::Before)),
            "delete" | "remove" => Ok(Self::Delete),
            _ => Err(normalized),
        }
    }
}

impl Display for HunkAction {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        match self {
            Self::Replace => f.write_str("replace"),
            Self::Insert(Placement::After) => f.write_str("insert after"),
            Self::Insert(Placement::Before) => f.write_str("insert before"),
            Self::Delete => f.write_str("delete"),
        }
    }
}

/// One targeted change against one file
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Hunk {
    /// File the change applies to
    pub file: ArtifactPath,
    /// What to do
    pub action: HunkAction,
    /// Exact, whitespace-preserving anchor text
    pub target: Option<String>,
    /// New text
    pub content: Option<String>,
}

impl Hunk {
    /// Replace `target` with `content`
    #[must_use]
    pub fn replace(file: ArtifactPath, target: impl Into<String>, content: impl Into<String>) -> Self {
        Self {
            file,
            action: HunkAction::Replace,
            target: Some(target.into()),
            content: Some(content.into()),
        }
    }

    /// Insert `content` relative to `target`
    #[must_use]
    pub fn insert(
        file: ArtifactPath,
        placement: Placement,
        target: Option<String>,
        content: impl Into<String>,
    ) -> Self {
        Self {
            file,
            action: HunkAction::Insert(placement),
            target,
            content: Some(content.into()),
        }
    }

    /// Remove `target`
    #[must_use]
    pub fn delete(file: ArtifactPath, target: impl Into<String>) -> Self {
        Self {
            file,
            action: HunkAction::Delete,
            target: Some(target.into()),
            content: None,
        }
    }
}

/// Why a change block was dropped
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SkipReason {
    /// `CHANGE:` names an unknown action
    #[error("unknown action '{0}'")]
    UnknownAction(String),

    /// No `TARGET:` line
    #[error("missing TARGET path")]
    MissingFile,

    /// `TARGET:` path failed validation
    #[error("invalid TARGET path '{0}'")]
    InvalidFile(String),

    /// replace/delete without `OLD:` text
    #[error("{0} requires OLD text")]
    MissingOld(HunkAction),
}

/// A dropped change block
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedHunk {
    /// Zero-based position of the block in the text
    pub block: usize,
    /// Why it was dropped
    pub reason: SkipReason,
}

/// Result of scanning text for change blocks
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct HunkParse {
    /// Well-formed hunks in order of appearance
    pub hunks: Vec<Hunk>,
    /// Blocks that could not be understood
    pub skipped: Vec<SkippedHunk>,
}

/// Whether text contains at least one change block
#[must_use]
pub fn has_change_blocks(text: &str) -> bool {
    text.split('\n')
        .any(|line| line.trim_start().starts_with(CHANGE_MARKER))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Section {
    Old,
    New,
}

#[derive(Debug, Default)]
struct Block<'a> {
    action: &'a str,
    file: Option<&'a str>,
    old: Option<Vec<&'a str>>,
    new: Option<Vec<&'a str>>,
    section: Option<Section>,
    inside_code: bool,
}

impl<'a> Block<'a> {
    fn open(action: &'a str) -> Self {
        Self {
            action,
            ..Self::default()
        }
    }

    /// Full-file section inside a change reply, read as a whole-file insert
    fn whole_file(path: &'a str) -> Self {
        Self {
            action: "insert",
            file: Some(path),
            new: Some(Vec::new()),
            section: Some(Section::New),
            ..Self::default()
        }
    }

    /// A `FILE:` marker names this block's target only before any section opens
    fn takes_file_marker(&self) -> bool {
        self.section.is_none() && self.file.is_none()
    }

    fn section_mut(&mut self) -> Option<&mut Vec<&'a str>> {
        match self.section? {
            Section::Old => self.old.as_mut(),
            Section::New => self.new.as_mut(),
        }
    }

    fn start_section(&mut self, section: Section, inline: &'a str) {
        let lines = if inline.trim().is_empty() {
            Vec::new()
        } else {
            vec![inline.trim()]
        };
        match section {
            Section::Old => self.old = Some(lines),
            Section::New => self.new = Some(lines),
        }
        self.section = Some(section);
    }

    fn feed(&mut self, line: &'a str) {
        if is_fence(line) {
            self.inside_code = !self.inside_code;
            return;
        }
        if self.inside_code {
            if let Some(lines) = self.section_mut() {
                lines.push(line);
            }
            return;
        }

        let trimmed = line.trim_start();
        if let Some(rest) = trimmed.strip_prefix(TARGET_MARKER) {
            self.file = Some(rest.trim());
        } else if let Some(rest) = trimmed.strip_prefix(OLD_MARKER) {
            self.start_section(Section::Old, rest);
        } else if let Some(rest) = trimmed.strip_prefix(NEW_MARKER) {
            self.start_section(Section::New, rest);
        }
    }

    fn finish(self) -> Result<Hunk, SkipReason> {
        let action: HunkAction = self.action.parse().map_err(SkipReason::UnknownAction)?;
        let raw_file = self
            .file
            .map(|f| f.trim_matches(|c| matches!(c, '`' | '"' | '\'' | '*')))
            .filter(|f| !f.is_empty())
            .ok_or(SkipReason::MissingFile)?;
        let file =
            ArtifactPath::new(raw_file).map_err(|_| SkipReason::InvalidFile(raw_file.to_string()))?;

        let target = self
            .old
            .map(|lines| lines.join("\n"))
            .filter(|t| !t.is_empty());
        let content = self.new.map(|lines| lines.join("\n"));

        match action {
            HunkAction::Replace | HunkAction::Delete if target.is_none() => {
                Err(SkipReason::MissingOld(action))
            }
            HunkAction::Replace => Ok(Hunk {
                file,
                action,
                target,
                content: Some(content.unwrap_or_default()),
            }),
            HunkAction::Delete => Ok(Hunk {
                file,
                action,
                target,
                content: None,
            }),
            HunkAction::Insert(_) => Ok(Hunk {
                file,
                action,
                target,
                content,
            }),
        }
    }
}

fn close_block(block: Option<Block<'_>>, out: &mut HunkParse, index: &mut usize) {
    let Some(block) = block else {
        return;
    };
    match block.finish() {
        Ok(hunk) => out.hunks.push(hunk),
        Err(reason) => {
            tracing::warn!(block = *index, %reason, "skipping unparsable change block");
            out.skipped.push(SkippedHunk {
                block: *index,
                reason,
            });
        }
    }
    *index += 1;
}

/// Extract every change block from text
#[must_use]
pub fn parse_hunks(text: &str) -> HunkParse {
    let mut out = HunkParse::default();
    let mut block: Option<Block<'_>> = None;
    let mut index = 0usize;

    for line in text.split('\n') {
        let inside_code = block.as_ref().is_some_and(|b| b.inside_code);
        if !inside_code {
            if let Some(action) = line.trim_start().strip_prefix(CHANGE_MARKER) {
                close_block(block.take(), &mut out, &mut index);
                block = Some(Block::open(action.trim()));
                continue;
            }
            match parser::marker(line.trim_start()) {
                Some(Marker::File(path)) if block.as_ref().is_some_and(Block::takes_file_marker) => {
                    if let Some(b) = block.as_mut() {
                        b.file = Some(path);
                    }
                    continue;
                }
                Some(Marker::File(path)) => {
                    close_block(block.take(), &mut out, &mut index);
                    block = Some(Block::whole_file(path));
                    continue;
                }
                Some(Marker::Delete(path)) => {
                    close_block(block.take(), &mut out, &mut index);
                    tracing::warn!(%path, "ignoring file deletion inside change blocks");
                    continue;
                }
                None => {}
            }
        }
        if let Some(b) = block.as_mut() {
            b.feed(line);
        }
    }
    close_block(block, &mut out, &mut index);

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn path(p: &str) -> ArtifactPath {
        ArtifactPath::new(p).unwrap()
    }

    #[test]
    fn action_parsing() {
        assert_eq!("replace".parse(), Ok(HunkAction::Replace));
        assert_eq!("Insert  Before".parse(), Ok(HunkAction::Insert(Placement::Before)));
        assert_eq!("append".parse(), Ok(HunkAction::Insert(Placement::After)));
        assert_eq!("DELETE".parse(), Ok(HunkAction::Delete));
        assert!("rewrite".parse::<HunkAction>().is_err());
    }

    #[test]
    fn parse_replace_block() {
        let text = "I fixed the operator.\n\
                    CHANGE: replace\n\
                    TARGET: calc.py\n\
                    OLD:\n\
                    ```python\n\
                    \x20   return number / 8\n\
                    ```\n\
                    NEW:\n\
                    ```python\n\
                    \x20   return number % 8\n\
                    ```\n";
        let parsed = parse_hunks(text);
        assert!(parsed.skipped.is_empty());
        assert_eq!(
            parsed.hunks,
            vec![Hunk::replace(
                path("calc.py"),
                "    return number / 8",
                "    return number % 8"
            )]
        );
    }

    #[test]
    fn parse_inline_values_and_multiple_blocks() {
        let text = "CHANGE: delete\nTARGET: a.txt\nOLD: debug()\n\
                    CHANGE: insert after\nTARGET: a.txt\nOLD: import os\nNEW: import sys";
        let parsed = parse_hunks(text);
        assert_eq!(
            parsed.hunks,
            vec![
                Hunk::delete(path("a.txt"), "debug()"),
                Hunk::insert(
                    path("a.txt"),
                    Placement::After,
                    Some("import os".to_string()),
                    "import sys"
                ),
            ]
        );
    }

    #[test]
    fn parse_insert_without_old_targets_whole_file() {
        let parsed = parse_hunks("CHANGE: insert\nFILE: new.py\nNEW:\n```\nprint(1)\n```");
        assert_eq!(
            parsed.hunks,
            vec![Hunk::insert(path("new.py"), Placement::After, None, "print(1)")]
        );
    }

    #[test]
    fn parse_reports_bad_blocks() {
        let text = "CHANGE: explode\nTARGET: a.txt\n\
                    CHANGE: replace\nOLD: x\n\
                    CHANGE: replace\nTARGET: ../evil\nOLD: x\n\
                    CHANGE: delete\nTARGET: a.txt\n\
                    CHANGE: replace\nTARGET: ok.txt\nOLD: a\nNEW: b";
        let parsed = parse_hunks(text);
        assert_eq!(parsed.hunks, vec![Hunk::replace(path("ok.txt"), "a", "b")]);
        let reasons: Vec<_> = parsed.skipped.iter().map(|s| (s.block, s.reason.clone())).collect();
        assert_eq!(
            reasons,
            vec![
                (0, SkipReason::UnknownAction("explode".to_string())),
                (1, SkipReason::MissingFile),
                (2, SkipReason::InvalidFile("../evil".to_string())),
                (3, SkipReason::MissingOld(HunkAction::Delete)),
            ]
        );
    }

    #[test]
    fn change_marker_inside_code_is_content() {
        let text = "CHANGE: replace\nTARGET: notes.md\nOLD:\n```\nCHANGE: literal\n```\nNEW:\n```\nfixed\n```";
        let parsed = parse_hunks(text);
        assert_eq!(
            parsed.hunks,
            vec![Hunk::replace(path("notes.md"), "CHANGE: literal", "fixed")]
        );
    }

    #[test]
    fn file_marker_after_sections_starts_a_whole_file_section() {
        let text = "CHANGE: replace\nTARGET: calc.py\nOLD: a\nNEW:\n```\nb\n```\n\
                    FILE: other.py\n```python\nprint('other')\n```\n";
        let parsed = parse_hunks(text);
        assert!(parsed.skipped.is_empty());
        assert_eq!(
            parsed.hunks,
            vec![
                Hunk::replace(path("calc.py"), "a", "b"),
                Hunk::insert(path("other.py"), Placement::After, None, "print('other')"),
            ]
        );
    }

    #[test]
    fn detects_change_blocks() {
        assert!(has_change_blocks("prose\n  CHANGE: replace"));
        assert!(!has_change_blocks("FILE: a.txt\n```\nx\n```"));
    }
}
