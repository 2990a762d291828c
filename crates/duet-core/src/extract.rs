//! Structured values pulled out of model text

use duet_artifact::{is_fence, parse, strip_fences, ArtifactPath, FileSet, DELETE_MARKER, FILE_MARKER};
use regex::Regex;
use std::sync::OnceLock;

/// Name fragment marking test-harness files
pub const TEST_HARNESS_MARKER: &str = "UNIT_TESTER";

const COMMAND_MARKER: &str = "COMMAND:";

fn step_pattern() -> Option<&'static Regex> {
    static PATTERN: OnceLock<Option<Regex>> = OnceLock::new();
    PATTERN
        .get_or_init(|| Regex::new(r"(?i)^\s*(?:\*\*)?(?:step\s+)?\d+\s*[.):](?:\*\*)?\s*(.+?)\s*$").ok())
        .as_ref()
}

/// Numbered lines of a plan (`1.`, `2)`, `Step 3:`), in order
#[must_use]
pub fn plan_steps(outline: &str) -> Vec<String> {
    let Some(pattern) = step_pattern() else {
        return Vec::new();
    };
    outline
        .lines()
        .filter_map(|line| pattern.captures(line))
        .filter_map(|caps| caps.get(1))
        .map(|m| m.as_str().to_string())
        .filter(|step| !step.is_empty())
        .collect()
}

/// Whether a file is a test harness rather than part of the deliverable
#[must_use]
pub fn is_test_harness(path: &ArtifactPath) -> bool {
    let name = path.file_name();
    let stem = name.rsplit_once('.').map_or(name, |(stem, _)| stem);
    stem.contains(TEST_HARNESS_MARKER)
}

/// A test-command response split into its parts
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TestPlan {
    /// Shell command to run, if one was found
    pub command: Option<String>,
    /// Harness files to write before running it
    pub harness: FileSet,
}

fn is_marker(line: &str) -> bool {
    let line = line.trim_start();
    line.starts_with(FILE_MARKER) || line.starts_with(DELETE_MARKER)
}

/// First fenced block at or after `from`: opening line, line just past the
/// closing fence, inner lines. An unclosed block runs to the end.
fn fenced_block<'a>(lines: &[&'a str], from: usize) -> Option<(usize, usize, Vec<&'a str>)> {
    let open = (from..lines.len()).find(|&i| is_fence(lines[i]))?;
    let close = (open + 1..lines.len())
        .find(|&i| is_fence(lines[i]))
        .unwrap_or(lines.len());
    let inner = lines[open + 1..close].to_vec();
    Some((open, (close + 1).min(lines.len()), inner))
}

fn non_empty(text: &str) -> Option<String> {
    let text = text.trim();
    (!text.is_empty()).then(|| text.to_string())
}

/// Split a test-command response into a command and harness files
///
/// The command is the fenced block after a `COMMAND:` line (or the text on
/// that line), else the first fenced block before any `FILE:` section, else
/// the fence-stripped response when it has no file sections at all.
#[must_use]
pub fn test_plan(text: &str) -> TestPlan {
    let lines: Vec<&str> = text.split('\n').collect();
    let first_marker = lines.iter().position(|l| is_marker(l));

    let (command, region) = if let Some(at) = lines
        .iter()
        .position(|l| l.trim_start().starts_with(COMMAND_MARKER))
    {
        let inline = lines[at]
            .trim_start()
            .trim_start_matches(COMMAND_MARKER)
            .trim()
            .trim_matches('`');
        if let Some(command) = non_empty(inline) {
            (Some(command), at..at + 1)
        } else {
            match fenced_block(&lines, at + 1) {
                Some((_, end, inner)) => (non_empty(&inner.join("\n")), at..end),
                None => (None, at..at + 1),
            }
        }
    } else {
        match fenced_block(&lines, 0) {
            Some((open, end, inner)) if first_marker.map_or(true, |m| open < m) => {
                (non_empty(&inner.join("\n")), open..end)
            }
            _ if first_marker.is_none() => (non_empty(&strip_fences(text)), 0..lines.len()),
            _ => (None, 0..0),
        }
    };

    let rest: Vec<&str> = lines
        .iter()
        .enumerate()
        .filter(|(i, _)| !region.contains(i))
        .map(|(_, l)| *l)
        .collect();
    TestPlan {
        command,
        harness: parse(&rest.join("\n")).files,
    }
}
