//! Error types for the pipeline
//!
//! Only completion failures and scheduler bugs stop a run. Sandbox write
//! failures, patch misses and parse degradation are recorded in the
//! transcript instead.

use crate::stage::Stage;
use duet_completion::CompletionError;
use duet_sandbox::SandboxError;

/// Illegal stage movement
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum StageError {
    /// `to` is not reachable from `from`
    #[error("illegal stage transition {from} -> {to}")]
    IllegalTransition {
        /// Current stage
        from: Stage,
        /// Requested stage
        to: Stage,
    },
}

/// Fatal pipeline failure
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// A completion call failed
    #[error("completion failed during {stage}: {source}")]
    Completion {
        /// Stage that issued the call
        stage: Stage,
        /// Underlying error
        #[source]
        source: CompletionError,
    },

    /// Session sandbox could not be resolved
    #[error("sandbox unavailable: {0}")]
    Sandbox(#[from] SandboxError),

    /// Scheduler attempted an illegal transition
    #[error(transparent)]
    Stage(#[from] StageError),
}

impl PipelineError {
    /// Stage the failure happened in, when known
    #[must_use]
    pub fn stage(&self) -> Option<Stage> {
        match self {
            Self::Completion { stage, .. } => Some(*stage),
            Self::Stage(StageError::IllegalTransition { from, .. }) => Some(*from),
            Self::Sandbox(_) => None,
        }
    }

    /// Check if re-running the task may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Completion { source, .. } => source.is_retryable(),
            Self::Sandbox(e) => e.is_retryable(),
            Self::Stage(_) => false,
        }
    }
}
