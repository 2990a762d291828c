//! Append-only run transcript

use crate::stage::Stage;
use chrono::{DateTime, Utc};
use std::fmt::{self, Display, Formatter};

/// Who produced a transcript entry
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Speaker {
    /// The person who submitted the task
    User,
    /// Planner/reviewer model
    Planner,
    /// Coder model
    Coder,
    /// Sandbox command output
    Sandbox,
    /// The scheduler itself (warnings, notices)
    Pipeline,
}

impl Display for Speaker {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::User => "user",
            Self::Planner => "planner",
            Self::Coder => "coder",
            Self::Sandbox => "sandbox",
            Self::Pipeline => "pipeline",
        })
    }
}

/// One transcript line
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct TranscriptEntry {
    pub speaker: Speaker,
    pub stage: Stage,
    pub message: String,
    pub recorded_at: DateTime<Utc>,
}

/// Ordered record of everything said during a run
///
/// Entries can only be appended.
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Transcript(Vec<TranscriptEntry>);

impl Transcript {
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self(Vec::new())
    }

    /// Append an entry stamped with the current time
    pub fn record(&mut self, speaker: Speaker, stage: Stage, message: impl Into<String>) {
        self.0.push(TranscriptEntry {
            speaker,
            stage,
            message: message.into(),
            recorded_at: Utc::now(),
        });
    }

    /// Append a scheduler warning and log it
    pub fn warn(&mut self, stage: Stage, message: impl Into<String>) {
        let message = message.into();
        tracing::warn!(%stage, "{message}");
        self.record(Speaker::Pipeline, stage, message);
    }

    #[inline]
    #[must_use]
    pub fn entries(&self) -> &[TranscriptEntry] {
        &self.0
    }

    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.0.len()
    }

    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &TranscriptEntry> {
        self.0.iter()
    }

    /// Entries from one speaker
    pub fn by_speaker(&self, speaker: Speaker) -> impl Iterator<Item = &TranscriptEntry> {
        self.0.iter().filter(move |e| e.speaker == speaker)
    }

    /// Most recent entry
    #[must_use]
    pub fn last(&self) -> Option<&TranscriptEntry> {
        self.0.last()
    }
}

impl<'a> IntoIterator for &'a Transcript {
    type Item = &'a TranscriptEntry;
    type IntoIter = std::slice::Iter<'a, TranscriptEntry>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.iter()
    }
}
