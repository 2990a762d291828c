//! Pipeline stages and their legal transitions

use crate::error::StageError;
use std::fmt::{self, Display, Formatter};

/// Pipeline stage
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Design outline and optional step split
    Plan,
    /// Sandbox snapshot and implementation instructions
    Instruct,
    /// Initial code for the current step
    Generate,
    /// Test command synthesis and execution
    Test,
    /// Review of the current files
    Review,
    /// Patch application following review feedback
    Revise,
    /// Final summary
    Summarize,
    /// Terminal
    Done,
}

impl Stage {
    /// Every stage, in pipeline order
    pub const ALL: [Self; 8] = [
        Self::Plan,
        Self::Instruct,
        Self::Generate,
        Self::Test,
        Self::Review,
        Self::Revise,
        Self::Summarize,
        Self::Done,
    ];

    /// Stable lowercase name
    #[inline]
    #[must_use]
    pub const fn name(self) -> &'static str {
        match self {
            Self::Plan => "plan",
            Self::Instruct => "instruct",
            Self::Generate => "generate",
            Self::Test => "test",
            Self::Review => "review",
            Self::Revise => "revise",
            Self::Summarize => "summarize",
            Self::Done => "done",
        }
    }

    /// Stages reachable in one step from this one
    #[inline]
    #[must_use]
    pub fn allowed_transitions(self) -> Vec<Self> {
        allowed_transitions(self)
    }

    /// Whether no transition leaves this stage
    #[inline]
    #[must_use]
    pub const fn is_terminal(self) -> bool {
        matches!(self, Self::Done)
    }
}

impl Display for Stage {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Stages reachable in one step from `from`
#[must_use]
pub fn allowed_transitions(from: Stage) -> Vec<Stage> {
    use Stage::*;
    match from {
        Plan => vec![Instruct],
        Instruct => vec![Generate],
        Generate => vec![Test, Review],
        Test => vec![Review],
        Review => vec![Revise, Generate, Summarize, Done],
        Revise => vec![Test, Review],
        Summarize => vec![Done],
        Done => vec![],
    }
}

/// Check a transition
///
/// # Errors
/// Returns `StageError::IllegalTransition` when `to` is not reachable from
/// `from`.
pub fn validate_transition(from: Stage, to: Stage) -> Result<(), StageError> {
    if allowed_transitions(from).contains(&to) {
        Ok(())
    } else {
        Err(StageError::IllegalTransition { from, to })
    }
}
