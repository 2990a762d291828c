//! Run identifiers and the final report

use crate::state::{TestReport, Verdict};
use crate::transcript::Transcript;
use duet_artifact::{ContentHash, FileSet};
use std::fmt::{self, Display, Formatter};
use ulid::Ulid;

/// Unique run identifier (ULID for sortability)
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
pub struct RunId(pub Ulid);

impl RunId {
    /// Generate new run ID
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Ulid::new())
    }
}

impl Default for RunId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for RunId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// How a run ended
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunOutcome {
    /// The final review accepted the code
    Accepted,
    /// The iteration budget ran out before acceptance
    Exhausted,
}

impl Display for RunOutcome {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Accepted => "accepted",
            Self::Exhausted => "exhausted",
        })
    }
}

/// Everything a client needs from a finished run
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct RunReport {
    pub run_id: RunId,
    pub transcript: Transcript,
    pub final_artifacts: FileSet,
    pub summary: Option<String>,
    pub iterations_used: u32,
    pub verdict: Verdict,
    pub outcome: RunOutcome,
    pub test_report: TestReport,
    /// Plan steps accepted (0 when not stepping)
    pub steps_completed: usize,
    /// Fingerprint of `final_artifacts`
    pub fingerprint: ContentHash,
}

impl RunReport {
    #[inline]
    #[must_use]
    pub fn is_accepted(&self) -> bool {
        self.outcome == RunOutcome::Accepted
    }
}
