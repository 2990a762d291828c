//! Patch application
//!
//! Reconciles a model's change description against the current file set.
//! Two change shapes are understood: full-file replacement (from
//! [`parser::parse`]) and ordered [`Hunk`] sequences.
//!
//! Application never fails. Hunks whose anchor cannot be found become no-ops
//! and are reported through [`PatchReport::misses`], leaving the caller to
//! decide whether the revision as a whole is acceptable.

use crate::file_set::FileSet;
use crate::hunk::{self, Hunk, HunkAction, Placement, SkippedHunk};
use crate::parser::{self, ParsedArtifacts};
use crate::path::ArtifactPath;
use std::collections::BTreeSet;

/// A model-produced change description
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChangeSet {
    /// Overwrite semantics: every listed file replaces or creates its entry
    Files(ParsedArtifacts),
    /// Targeted changes, applied strictly in order
    Hunks(Vec<Hunk>),
}

impl ChangeSet {
    /// Paths explicitly marked for deletion
    #[must_use]
    pub fn deletions(&self) -> Vec<&ArtifactPath> {
        match self {
            Self::Files(parsed) => parsed.deletions.iter().collect(),
            Self::Hunks(_) => Vec::new(),
        }
    }

    /// Whether the change set carries no change at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Files(parsed) => parsed.is_empty(),
            Self::Hunks(hunks) => hunks.is_empty(),
        }
    }
}

/// Revision text classified into a change set
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RevisionParse {
    /// The recognized changes
    pub change_set: ChangeSet,
    /// Change blocks that were dropped
    pub skipped: Vec<SkippedHunk>,
}

/// Parse revision text
///
/// Any `CHANGE:` block switches to hunk mode; otherwise the text is read as
/// full-file `FILE:` sections.
#[must_use]
pub fn parse_change_set(text: &str) -> RevisionParse {
    if hunk::has_change_blocks(text) {
        let parsed = hunk::parse_hunks(text);
        RevisionParse {
            change_set: ChangeSet::Hunks(parsed.hunks),
            skipped: parsed.skipped,
        }
    } else {
        RevisionParse {
            change_set: ChangeSet::Files(parser::parse(text)),
            skipped: Vec::new(),
        }
    }
}

/// What happened to one hunk
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HunkOutcome {
    /// Anchor found and change made
    Applied,
    /// File content rebuilt from the hunk's new content
    Recreated,
    /// Anchor not found (or nothing to apply); content unchanged
    TargetMissing,
}

/// Per-hunk report entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct HunkResult {
    /// Position of the hunk in the change set
    pub index: usize,
    /// File the hunk addressed
    pub file: ArtifactPath,
    /// Action attempted
    pub action: HunkAction,
    /// Outcome
    pub outcome: HunkOutcome,
}

/// Result of [`apply`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PatchReport {
    /// Updated file set
    pub files: FileSet,
    /// One entry per hunk (empty for full-file change sets)
    pub results: Vec<HunkResult>,
    /// Paths whose content differs from the starting set
    pub changed: BTreeSet<ArtifactPath>,
}

impl PatchReport {
    /// Hunks that did not find their anchor
    pub fn misses(&self) -> impl Iterator<Item = &HunkResult> {
        self.results
            .iter()
            .filter(|r| r.outcome == HunkOutcome::TargetMissing)
    }

    /// Whether every hunk applied
    #[must_use]
    pub fn is_clean(&self) -> bool {
        self.misses().next().is_none()
    }
}

/// Apply a change set to an existing file set
///
/// Full-file change sets overwrite or create entries and never remove files
/// that are absent from the change set. Deletions are left to the caller.
#[must_use]
pub fn apply(existing: &FileSet, change_set: &ChangeSet) -> PatchReport {
    let mut files = existing.clone();
    let mut results = Vec::new();

    match change_set {
        ChangeSet::Files(parsed) => files.merge(&parsed.files),
        ChangeSet::Hunks(hunks) => {
            for (index, hunk) in hunks.iter().enumerate() {
                let (updated, outcome) = apply_hunk(files.get(&hunk.file), hunk);
                if let Some(content) = updated {
                    files.insert(hunk.file.clone(), content);
                }
                if outcome == HunkOutcome::TargetMissing {
                    tracing::warn!(
                        file = %hunk.file,
                        action = %hunk.action,
                        "hunk target not found"
                    );
                }
                results.push(HunkResult {
                    index,
                    file: hunk.file.clone(),
                    action: hunk.action,
                    outcome,
                });
            }
        }
    }

    let changed = files.changed_paths(existing).into_iter().collect();
    PatchReport {
        files,
        results,
        changed,
    }
}

/// Apply one hunk to one file's content
///
/// `current` is `None` when the file does not exist yet. Returns the new
/// content when it changed.
#[must_use]
pub fn apply_hunk(current: Option<&str>, hunk: &Hunk) -> (Option<String>, HunkOutcome) {
    let target = hunk.target.as_deref().filter(|t| !t.is_empty());
    let content = hunk.content.as_deref();

    match hunk.action {
        HunkAction::Replace => match (current, target) {
            (Some(text), Some(target)) => match text.find(target) {
                Some(at) => {
                    let mut out = String::with_capacity(text.len() + content.map_or(0, str::len));
                    out.push_str(&text[..at]);
                    out.push_str(content.unwrap_or_default());
                    out.push_str(&text[at + target.len()..]);
                    (Some(out), HunkOutcome::Applied)
                }
                None => (None, HunkOutcome::TargetMissing),
            },
            (None, _) => match content {
                Some(new) => (Some(new.to_string()), HunkOutcome::Recreated),
                None => (None, HunkOutcome::TargetMissing),
            },
            (Some(_), None) => (None, HunkOutcome::TargetMissing),
        },
        HunkAction::Insert(placement) => {
            let Some(new) = content else {
                return (None, HunkOutcome::TargetMissing);
            };
            let anchor = current.zip(target).and_then(|(text, target)| {
                text.find(target).map(|at| (text, at, target))
            });
            match anchor {
                Some((text, at, target)) => (
                    Some(insert_at(text, at, target, new, placement)),
                    HunkOutcome::Applied,
                ),
                None => (Some(new.to_string()), HunkOutcome::Recreated),
            }
        }
        HunkAction::Delete => match current.zip(target) {
            Some((text, target)) if text.contains(target) => {
                (Some(text.replacen(target, "", 1)), HunkOutcome::Applied)
            }
            _ => (None, HunkOutcome::TargetMissing),
        },
    }
}

/// Splice `new` next to the anchor at `at`, keeping it on its own line when
/// neither side supplies the line break
fn insert_at(text: &str, at: usize, target: &str, new: &str, placement: Placement) -> String {
    let mut out = String::with_capacity(text.len() + new.len() + 1);
    match placement {
        Placement::Before => {
            out.push_str(&text[..at]);
            out.push_str(new);
            if !new.ends_with('\n') && !target.starts_with('\n') {
                out.push('\n');
            }
            out.push_str(&text[at..]);
        }
        Placement::After => {
            let end = at + target.len();
            out.push_str(&text[..end]);
            if !target.ends_with('\n') && !new.starts_with('\n') {
                out.push('\n');
            }
            out.push_str(new);
            out.push_str(&text[end..]);
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn path(p: &str) -> ArtifactPath {
        ArtifactPath::new(p).unwrap()
    }

    fn files(pairs: &[(&str, &str)]) -> FileSet {
        FileSet::try_from_pairs(pairs.iter().copied()).unwrap()
    }

    #[test]
    fn replace_found() {
        let report = apply(
            &files(&[("a.txt", "foo\nbar\n")]),
            &ChangeSet::Hunks(vec![Hunk::replace(path("a.txt"), "bar", "baz")]),
        );
        assert_eq!(report.files, files(&[("a.txt", "foo\nbaz\n")]));
        assert!(report.is_clean());
        assert_eq!(report.changed.len(), 1);
    }

    #[test]
    fn replace_missing_target_is_reported_noop() {
        let start = files(&[("a.txt", "foo\n")]);
        let report = apply(
            &start,
            &ChangeSet::Hunks(vec![Hunk::replace(path("a.txt"), "MISSING", "x")]),
        );
        assert_eq!(report.files, start);
        let misses: Vec<_> = report.misses().collect();
        assert_eq!(misses.len(), 1);
        assert_eq!(misses[0].file, path("a.txt"));
        assert!(report.changed.is_empty());
    }

    #[test]
    fn replace_only_first_occurrence() {
        let report = apply(
            &files(&[("a.txt", "x x x")]),
            &ChangeSet::Hunks(vec![Hunk::replace(path("a.txt"), "x", "y")]),
        );
        assert_eq!(report.files.get_str("a.txt"), Some("y x x"));
    }

    #[test]
    fn replace_is_whitespace_exact() {
        let report = apply(
            &files(&[("a.py", "    return a / b\n")]),
            &ChangeSet::Hunks(vec![Hunk::replace(path("a.py"), "return a / b ", "x")]),
        );
        assert!(!report.is_clean());
    }

    #[test]
    fn replace_on_missing_file_recreates_from_content() {
        let report = apply(
            &FileSet::new(),
            &ChangeSet::Hunks(vec![Hunk::replace(path("new.py"), "anything", "print(1)")]),
        );
        assert_eq!(report.files, files(&[("new.py", "print(1)")]));
        assert_eq!(report.results[0].outcome, HunkOutcome::Recreated);
    }

    #[test]
    fn insert_after_and_before_anchor() {
        let start = files(&[("a.py", "import os\nrun()\n")]);
        let report = apply(
            &start,
            &ChangeSet::Hunks(vec![
                Hunk::insert(path("a.py"), Placement::After, Some("import os".into()), "import sys"),
                Hunk::insert(path("a.py"), Placement::Before, Some("run()".into()), "setup()"),
            ]),
        );
        assert_eq!(
            report.files.get_str("a.py"),
            Some("import os\nimport sys\nsetup()\nrun()\n")
        );
        assert!(report.is_clean());
    }

    #[test]
    fn insert_without_anchor_replaces_whole_file() {
        let report = apply(
            &files(&[("a.py", "old")]),
            &ChangeSet::Hunks(vec![Hunk::insert(
                path("a.py"),
                Placement::After,
                Some("not there".into()),
                "fresh",
            )]),
        );
        assert_eq!(report.files.get_str("a.py"), Some("fresh"));
        assert_eq!(report.results[0].outcome, HunkOutcome::Recreated);
    }

    #[test]
    fn insert_creates_missing_file() {
        let report = apply(
            &FileSet::new(),
            &ChangeSet::Hunks(vec![Hunk::insert(path("b.py"), Placement::After, None, "x = 1")]),
        );
        assert_eq!(report.files, files(&[("b.py", "x = 1")]));
    }

    #[test]
    fn delete_found_and_missing() {
        let report = apply(
            &files(&[("a.txt", "keep\ndrop\n")]),
            &ChangeSet::Hunks(vec![
                Hunk::delete(path("a.txt"), "drop\n"),
                Hunk::delete(path("a.txt"), "drop\n"),
            ]),
        );
        assert_eq!(report.files.get_str("a.txt"), Some("keep\n"));
        let outcomes: Vec<_> = report.results.iter().map(|r| r.outcome).collect();
        assert_eq!(outcomes, vec![HunkOutcome::Applied, HunkOutcome::TargetMissing]);
    }

    #[test]
    fn later_hunks_observe_earlier_ones() {
        let report = apply(
            &files(&[("a.txt", "one")]),
            &ChangeSet::Hunks(vec![
                Hunk::replace(path("a.txt"), "one", "two"),
                Hunk::replace(path("a.txt"), "two", "three"),
            ]),
        );
        assert_eq!(report.files.get_str("a.txt"), Some("three"));
    }

    #[test]
    fn reapplying_successful_replace_noops() {
        let change = ChangeSet::Hunks(vec![Hunk::replace(path("a.txt"), "bar", "baz")]);
        let first = apply(&files(&[("a.txt", "foo bar")]), &change);
        let second = apply(&first.files, &change);
        assert_eq!(second.files, first.files);
        assert!(!second.is_clean());
    }

    #[test]
    fn full_file_change_set_never_deletes() {
        let start = files(&[("a.txt", "a"), ("b.txt", "b")]);
        let revision = parse_change_set("FILE: a.txt\n```\nA\n```\nDELETE FILE: b.txt");
        let report = apply(&start, &revision.change_set);
        assert_eq!(report.files, files(&[("a.txt", "A"), ("b.txt", "b")]));
        assert_eq!(
            revision.change_set.deletions(),
            vec![&path("b.txt")]
        );
    }

    #[test]
    fn parse_change_set_selects_mode() {
        let hunks = parse_change_set("CHANGE: replace\nTARGET: a.txt\nOLD: a\nNEW: b\nCHANGE: bogus");
        assert!(matches!(hunks.change_set, ChangeSet::Hunks(ref h) if h.len() == 1));
        assert_eq!(hunks.skipped.len(), 1);

        let full = parse_change_set("FILE: a.txt\n```\nx\n```");
        assert!(matches!(full.change_set, ChangeSet::Files(_)));
        assert!(!full.change_set.is_empty());
    }
}
