//! Testing utilities for the Duet workspace
//!
//! Shared test helpers, a scripted completion service, and fixtures.

#![allow(missing_docs)]

use async_trait::async_trait;
use duet_artifact::{render, ArtifactPath, FileSet};
use duet_completion::{CompletionError, CompletionService, PromptInputs, RoleTemplate};
use duet_sandbox::{ExecOutput, MemorySandbox};
use parking_lot::Mutex;
use std::collections::{HashMap, VecDeque};

/// One recorded `invoke` call
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RecordedCall {
    pub role: RoleTemplate,
    pub inputs: PromptInputs,
}

#[derive(Debug, Clone)]
enum Scripted {
    Reply(String),
    Fail(String),
}

/// Completion service answering from per-role queues
///
/// Each role pops its queue front; when the queue is empty the role's
/// repeating reply (if any) is used, otherwise the call fails.
#[derive(Debug, Default)]
pub struct ScriptedCompletion {
    queues: Mutex<HashMap<RoleTemplate, VecDeque<Scripted>>>,
    repeat: Mutex<HashMap<RoleTemplate, String>>,
    calls: Mutex<Vec<RecordedCall>>,
}

impl ScriptedCompletion {
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue one reply for `role`
    #[must_use]
    pub fn reply(self, role: RoleTemplate, text: impl Into<String>) -> Self {
        self.queues
            .lock()
            .entry(role)
            .or_default()
            .push_back(Scripted::Reply(text.into()));
        self
    }

    /// Answer `role` with `text` whenever its queue is empty
    #[must_use]
    pub fn always(self, role: RoleTemplate, text: impl Into<String>) -> Self {
        self.repeat.lock().insert(role, text.into());
        self
    }

    /// Queue one transport failure for `role`
    #[must_use]
    pub fn fail(self, role: RoleTemplate, message: impl Into<String>) -> Self {
        self.queues
            .lock()
            .entry(role)
            .or_default()
            .push_back(Scripted::Fail(message.into()));
        self
    }

    /// Every call so far, in order
    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    /// Calls made for `role`
    pub fn calls_for(&self, role: RoleTemplate) -> Vec<RecordedCall> {
        self.calls
            .lock()
            .iter()
            .filter(|c| c.role == role)
            .cloned()
            .collect()
    }

    /// Roles called, in order
    pub fn roles(&self) -> Vec<RoleTemplate> {
        self.calls.lock().iter().map(|c| c.role).collect()
    }
}

#[async_trait]
impl CompletionService for ScriptedCompletion {
    async fn invoke(
        &self,
        role: RoleTemplate,
        inputs: &PromptInputs,
    ) -> Result<String, CompletionError> {
        self.calls.lock().push(RecordedCall {
            role,
            inputs: inputs.clone(),
        });
        let next = self
            .queues
            .lock()
            .get_mut(&role)
            .and_then(VecDeque::pop_front);
        match next {
            Some(Scripted::Reply(text)) => Ok(text),
            Some(Scripted::Fail(message)) => Err(CompletionError::Transport(message)),
            None => self
                .repeat
                .lock()
                .get(&role)
                .cloned()
                .ok_or_else(|| CompletionError::Transport(format!("no scripted reply for {role}"))),
        }
    }
}

pub fn path(p: &str) -> ArtifactPath {
    ArtifactPath::new(p).unwrap()
}

pub fn file_set(pairs: &[(&str, &str)]) -> FileSet {
    FileSet::try_from_pairs(pairs.iter().copied()).unwrap()
}

/// `FILE:` formatted text for the given files
pub fn file_blocks(pairs: &[(&str, &str)]) -> String {
    render(&file_set(pairs))
}

/// A single replace change block
pub fn replace_block(target: &str, old: &str, new: &str) -> String {
    format!("CHANGE: replace\nTARGET: {target}\nOLD:\n```\n{old}\n```\nNEW:\n```\n{new}\n```\n")
}

pub fn accept_review() -> String {
    "I checked every file. The code is correct.".to_string()
}

pub fn reject_review(feedback: &str) -> String {
    format!("There is a problem: {feedback}")
}

/// Generation with an integer-division bug
pub fn flawed_calc() -> String {
    file_blocks(&[("calc.py", "def eighth(n):\n    return n / 8")])
}

/// Revision that fixes [`flawed_calc`]
pub fn calc_fix() -> String {
    replace_block("calc.py", "    return n / 8", "    return n // 8")
}

/// Memory sandbox whose `exec` echoes the command with the given exit code
pub fn echo_sandbox(exit_code: i32) -> MemorySandbox {
    MemorySandbox::new()
        .with_exec(move |command, _| ExecOutput::new(format!("ran: {command}\n"), "", exit_code))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn scripted_queues_then_repeat() {
        let svc = ScriptedCompletion::new()
            .reply(RoleTemplate::Review, "first")
            .fail(RoleTemplate::Review, "down")
            .always(RoleTemplate::Review, "again");
        let inputs = PromptInputs::new();

        assert_eq!(svc.invoke(RoleTemplate::Review, &inputs).await.unwrap(), "first");
        assert!(svc.invoke(RoleTemplate::Review, &inputs).await.is_err());
        assert_eq!(svc.invoke(RoleTemplate::Review, &inputs).await.unwrap(), "again");
        assert!(svc.invoke(RoleTemplate::Generate, &inputs).await.is_err());
        assert_eq!(svc.calls_for(RoleTemplate::Review).len(), 3);
        assert_eq!(svc.roles().len(), 4);
    }
}
