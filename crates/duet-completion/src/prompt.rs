//! Prompt inputs and template rendering
//!
//! Templates reference inputs as `{name}` where `name` is lowercase ASCII
//! letters, digits or `_`. Any other brace sequence is left untouched, so
//! templates can show code such as `fn main() {}` literally.

use std::collections::BTreeMap;

/// Well-known input names filled by the pipeline
pub mod keys {
    /// The user's task
    pub const TASK: &str = "task";
    /// Design outline from the planning stage
    pub const OUTLINE: &str = "outline";
    /// Rendered files found in the sandbox before generation
    pub const EXISTING_FILES: &str = "existing_files";
    /// Implementation instructions
    pub const INSTRUCTIONS: &str = "instructions";
    /// Current sub-task when stepping
    pub const STEP: &str = "step";
    /// Rendered current files
    pub const FILES: &str = "files";
    /// Reviewer feedback
    pub const FEEDBACK: &str = "feedback";
    /// Captured test output
    pub const TEST_REPORT: &str = "test_report";
    /// How the run ended
    pub const OUTCOME: &str = "outcome";
    /// Revision rounds used
    pub const ITERATIONS: &str = "iterations";
}

/// Named values substituted into a role template
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct PromptInputs(BTreeMap<String, String>);

impl PromptInputs {
    /// Create empty inputs
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Builder-style insert
    #[must_use]
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(key, value);
        self
    }

    /// Insert or overwrite a value
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    /// Value for `key`
    #[inline]
    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Number of inputs
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether there are no inputs
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Iterate in key order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}

impl<K: Into<String>, V: Into<String>> FromIterator<(K, V)> for PromptInputs {
    fn from_iter<T: IntoIterator<Item = (K, V)>>(iter: T) -> Self {
        Self(iter.into_iter().map(|(k, v)| (k.into(), v.into())).collect())
    }
}

fn is_placeholder_name(name: &str) -> bool {
    !name.is_empty()
        && name
            .bytes()
            .all(|b| b.is_ascii_lowercase() || b.is_ascii_digit() || b == b'_')
}

/// Fill `{name}` placeholders from `inputs`; missing names render empty
#[must_use]
pub fn render(template: &str, inputs: &PromptInputs) -> String {
    let mut out = String::with_capacity(template.len());
    let mut rest = template;

    while let Some(open) = rest.find('{') {
        out.push_str(&rest[..open]);
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if is_placeholder_name(&after[..close]) => {
                let name = &after[..close];
                out.push_str(inputs.get(name).unwrap_or_default());
                rest = &after[close + 1..];
            }
            _ => {
                out.push('{');
                rest = after;
            }
        }
    }
    out.push_str(rest);
    out
}

/// Placeholder names referenced by a template, in order of first use
#[must_use]
pub fn placeholders(template: &str) -> Vec<&str> {
    let mut names = Vec::new();
    let mut rest = template;
    while let Some(open) = rest.find('{') {
        let after = &rest[open + 1..];
        match after.find('}') {
            Some(close) if is_placeholder_name(&after[..close]) => {
                let name = &after[..close];
                if !names.contains(&name) {
                    names.push(name);
                }
                rest = &after[close + 1..];
            }
            _ => rest = after,
        }
    }
    names
}
