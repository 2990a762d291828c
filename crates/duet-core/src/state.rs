//! Mutable run state threaded through every stage

use crate::error::StageError;
use crate::stage::{validate_transition, Stage};
use crate::transcript::Transcript;
use duet_artifact::FileSet;
use std::fmt::{self, Display, Formatter};

/// Outcome of the latest review
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum Verdict {
    /// No review yet
    #[default]
    Unknown,
    /// Reviewer used the acceptance phrase
    Accepted,
    /// Reviewer found problems
    Rejected {
        /// Full review text
        feedback: String,
    },
}

impl Verdict {
    /// Whether the reviewer accepted
    #[inline]
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        matches!(self, Self::Accepted)
    }

    /// Review text when rejected
    #[inline]
    #[must_use]
    pub fn feedback(&self) -> Option<&str> {
        match self {
            Self::Rejected { feedback } => Some(feedback),
            Self::Unknown | Self::Accepted => None,
        }
    }
}

impl Display for Verdict {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Unknown => "unknown",
            Self::Accepted => "accepted",
            Self::Rejected { .. } => "rejected",
        })
    }
}

/// Latest test result
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(tag = "kind", content = "output", rename_all = "snake_case")]
pub enum TestReport {
    /// Not run, or declined
    #[default]
    NotApplicable,
    /// Combined stdout/stderr (or the exec failure)
    Output(String),
}

impl TestReport {
    /// Text used in review prompts
    #[must_use]
    pub fn as_prompt(&self) -> &str {
        match self {
            Self::NotApplicable => "No tests were run.",
            Self::Output(output) => output,
        }
    }
}

/// Design produced by the Plan stage
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct Plan {
    /// Free-text design
    pub outline: String,
    /// Ordered sub-tasks (stepping only)
    pub steps: Vec<String>,
}

/// State of one run
#[derive(Debug, Clone)]
pub struct PipelineState {
    task: String,
    stage: Stage,
    /// Implementation instructions from the Instruct stage
    pub instructions: String,
    /// Outline and steps from the Plan stage
    pub plan: Plan,
    /// Index of the step being built; equals `plan.steps.len()` once all are accepted
    pub current_step_index: usize,
    /// Current files, mirroring every sandbox write
    pub artifacts: FileSet,
    /// Sandbox contents seen before generation
    pub existing_files: FileSet,
    pub last_verdict: Verdict,
    /// Revise/review round trips so far
    pub iteration_count: u32,
    pub transcript: Transcript,
    pub test_report: TestReport,
    /// Summarize stage output
    pub summary: Option<String>,
}

impl PipelineState {
    /// Fresh state positioned at [`Stage::Plan`]
    #[must_use]
    pub fn new(task: impl Into<String>) -> Self {
        Self {
            task: task.into(),
            stage: Stage::Plan,
            instructions: String::new(),
            plan: Plan::default(),
            current_step_index: 0,
            artifacts: FileSet::new(),
            existing_files: FileSet::new(),
            last_verdict: Verdict::Unknown,
            iteration_count: 0,
            transcript: Transcript::new(),
            test_report: TestReport::NotApplicable,
            summary: None,
        }
    }

    #[inline]
    #[must_use]
    pub fn task(&self) -> &str {
        &self.task
    }

    #[inline]
    #[must_use]
    pub fn stage(&self) -> Stage {
        self.stage
    }

    /// Move to `to`
    ///
    /// # Errors
    /// Returns error if the transition is illegal; the stage is unchanged.
    pub fn advance(&mut self, to: Stage) -> Result<(), StageError> {
        validate_transition(self.stage, to)?;
        tracing::info!(from = %self.stage, %to, "stage transition");
        self.stage = to;
        Ok(())
    }

    /// Current sub-task, empty when not stepping or past the last step
    #[must_use]
    pub fn current_step(&self) -> &str {
        self.plan
            .steps
            .get(self.current_step_index)
            .map_or("", String::as_str)
    }

    /// Whether more steps follow the current one
    #[must_use]
    pub fn has_next_step(&self) -> bool {
        self.current_step_index + 1 < self.plan.steps.len()
    }
}
