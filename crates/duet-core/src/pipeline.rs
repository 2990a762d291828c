//! Pipeline scheduler
//!
//! Sequences planning, generation, optional testing, review and revision
//! for one task against one sandbox:
//!
//! ```text
//! Plan? -> Instruct -> Generate -> Test? -> Review -> { Revise -> Test? -> Review }*
//!                         ^                   |
//!                         +---- next step ----+-> Summarize? -> Done
//! ```
//!
//! A run stops revising when the reviewer accepts or the iteration budget
//! is spent. Only completion failures abort a run.

use crate::config::PipelineConfig;
use crate::error::PipelineError;
use crate::extract::{is_test_harness, plan_steps, test_plan};
use crate::report::{RunId, RunOutcome, RunReport};
use crate::stage::Stage;
use crate::state::{PipelineState, TestReport, Verdict};
use crate::transcript::{Speaker, Transcript};
use duet_artifact::{
    apply, is_accepted, is_not_applicable, parse, parse_change_set, render, ArtifactPath, FileSet,
};
use duet_completion::prompt::keys;
use duet_completion::{CompletionService, PromptInputs, RoleTemplate};
use duet_sandbox::{Sandbox, SessionId, SessionRegistry};
use std::sync::Arc;
use tracing::{instrument, Instrument};

/// The iterative revision pipeline
pub struct Pipeline {
    completion: Arc<dyn CompletionService>,
    config: PipelineConfig,
}

impl Pipeline {
    /// Create pipeline
    #[must_use]
    pub fn new(completion: Arc<dyn CompletionService>, config: PipelineConfig) -> Self {
        Self { completion, config }
    }

    /// Active configuration
    #[inline]
    #[must_use]
    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Run `task` to completion against `sandbox`
    ///
    /// The sandbox is left in place; tearing it down is the caller's job.
    ///
    /// # Errors
    /// Returns `PipelineError::Completion` when any completion call fails.
    pub async fn run(&self, task: &str, sandbox: Arc<dyn Sandbox>) -> Result<RunReport, PipelineError> {
        let run_id = RunId::new();
        let span = tracing::info_span!("run", %run_id);
        self.drive(run_id, task, sandbox.as_ref())
            .instrument(span)
            .await
    }

    /// Run `task` in the sandbox registered for `session`
    ///
    /// # Errors
    /// Returns `PipelineError::Sandbox` if the session sandbox cannot be
    /// created, otherwise as [`Pipeline::run`].
    pub async fn run_session(
        &self,
        task: &str,
        registry: &SessionRegistry,
        session: &SessionId,
    ) -> Result<RunReport, PipelineError> {
        let sandbox = registry.get_or_create(session).await?;
        self.run(task, sandbox).await
    }

    async fn drive(
        &self,
        run_id: RunId,
        task: &str,
        sandbox: &dyn Sandbox,
    ) -> Result<RunReport, PipelineError> {
        let stages = self.config.stages;
        let mut state = PipelineState::new(task);
        state.transcript.record(Speaker::User, Stage::Plan, task);
        tracing::info!(max_iterations = self.config.max_iterations, ?stages, "run started");

        if stages.runs_plan() {
            self.plan(&mut state, sandbox).await?;
        }
        state.advance(Stage::Instruct)?;
        self.instruct(&mut state, sandbox).await?;

        loop {
            state.advance(Stage::Generate)?;
            self.generate(&mut state, sandbox).await?;
            if stages.testing {
                state.advance(Stage::Test)?;
                self.test(&mut state, sandbox).await?;
            }
            state.advance(Stage::Review)?;
            self.review(&mut state, sandbox).await?;

            while !state.last_verdict.is_accepted()
                && state.iteration_count < self.config.max_iterations
            {
                state.advance(Stage::Revise)?;
                self.revise(&mut state, sandbox).await?;
                if stages.testing && self.config.retest_after_revision {
                    state.advance(Stage::Test)?;
                    self.test(&mut state, sandbox).await?;
                } else {
                    state.test_report = TestReport::NotApplicable;
                }
                state.advance(Stage::Review)?;
                self.review(&mut state, sandbox).await?;
            }

            if !state.last_verdict.is_accepted() {
                tracing::warn!(iterations = state.iteration_count, "iteration budget exhausted");
                break;
            }
            if state.plan.steps.is_empty() {
                break;
            }
            let more = state.has_next_step();
            state.current_step_index += 1;
            tracing::info!(
                completed = state.current_step_index,
                total = state.plan.steps.len(),
                "step accepted"
            );
            if !more {
                break;
            }
        }

        let outcome = if state.last_verdict.is_accepted() {
            RunOutcome::Accepted
        } else {
            RunOutcome::Exhausted
        };

        if stages.summary {
            state.advance(Stage::Summarize)?;
            self.summarize(&mut state, outcome).await?;
        }
        state.advance(Stage::Done)?;

        let fingerprint = state.artifacts.fingerprint();
        tracing::info!(
            %outcome,
            iterations = state.iteration_count,
            files = state.artifacts.len(),
            fingerprint = %fingerprint.short(),
            "run finished"
        );

        Ok(RunReport {
            run_id,
            steps_completed: state.current_step_index,
            iterations_used: state.iteration_count,
            verdict: state.last_verdict,
            outcome,
            test_report: state.test_report,
            summary: state.summary,
            final_artifacts: state.artifacts,
            transcript: state.transcript,
            fingerprint,
        })
    }

    #[instrument(skip_all, fields(stage = "plan"))]
    async fn plan(&self, state: &mut PipelineState, sandbox: &dyn Sandbox) -> Result<(), PipelineError> {
        let existing = read_sandbox(sandbox, &mut state.transcript, Stage::Plan)
            .await
            .unwrap_or_default();
        let inputs = PromptInputs::new()
            .with(keys::TASK, state.task())
            .with(keys::EXISTING_FILES, render_files(&existing));
        let outline = self.complete(Stage::Plan, RoleTemplate::Design, &inputs).await?;
        state.transcript.record(Speaker::Planner, Stage::Plan, &outline);

        if self.config.stages.stepping {
            state.plan.steps = plan_steps(&outline);
            tracing::info!(steps = state.plan.steps.len(), "plan split into steps");
        }
        state.plan.outline = outline;
        Ok(())
    }

    #[instrument(skip_all, fields(stage = "instruct"))]
    async fn instruct(&self, state: &mut PipelineState, sandbox: &dyn Sandbox) -> Result<(), PipelineError> {
        let existing = read_sandbox(sandbox, &mut state.transcript, Stage::Instruct)
            .await
            .unwrap_or_default();
        tracing::debug!(files = existing.len(), "existing files");
        state.existing_files = existing.clone();
        state.artifacts = existing;

        let inputs = PromptInputs::new()
            .with(keys::TASK, state.task())
            .with(keys::OUTLINE, state.plan.outline.as_str())
            .with(keys::EXISTING_FILES, render_files(&state.existing_files));
        let instructions = self
            .complete(Stage::Instruct, RoleTemplate::Instruct, &inputs)
            .await?;
        state
            .transcript
            .record(Speaker::Planner, Stage::Instruct, &instructions);
        state.instructions = instructions;
        Ok(())
    }

    #[instrument(skip_all, fields(stage = "generate", step = state.current_step_index))]
    async fn generate(&self, state: &mut PipelineState, sandbox: &dyn Sandbox) -> Result<(), PipelineError> {
        let inputs = PromptInputs::new()
            .with(keys::INSTRUCTIONS, state.instructions.as_str())
            .with(keys::STEP, state.current_step())
            .with(keys::FILES, render_files(&state.artifacts));
        let text = self
            .complete(Stage::Generate, RoleTemplate::Generate, &inputs)
            .await?;
        state.transcript.record(Speaker::Coder, Stage::Generate, &text);

        let parsed = parse(&text);
        if parsed.is_empty() {
            state
                .transcript
                .warn(Stage::Generate, "no FILE sections recognized in generated text");
        }
        for (path, content) in parsed.files.iter() {
            write_or_warn(sandbox, &mut state.transcript, Stage::Generate, path, content).await;
        }
        for path in &parsed.deletions {
            delete_or_warn(sandbox, &mut state.transcript, Stage::Generate, path).await;
            state.artifacts.remove(path);
        }
        state.artifacts.merge(&parsed.files);

        tracing::debug!(
            written = parsed.files.len(),
            deleted = parsed.deletions.len(),
            fingerprint = %state.artifacts.fingerprint().short(),
            "generation applied"
        );
        Ok(())
    }

    #[instrument(skip_all, fields(stage = "test"))]
    async fn test(&self, state: &mut PipelineState, sandbox: &dyn Sandbox) -> Result<(), PipelineError> {
        let inputs = PromptInputs::new()
            .with(keys::INSTRUCTIONS, state.instructions.as_str())
            .with(keys::FILES, render_files(&state.artifacts));
        let text = self
            .complete(Stage::Test, RoleTemplate::TestCommand, &inputs)
            .await?;
        state.transcript.record(Speaker::Planner, Stage::Test, &text);

        if is_not_applicable(&text) {
            tracing::info!("tests declined as not applicable");
            state.test_report = TestReport::NotApplicable;
            return Ok(());
        }

        let plan = test_plan(&text);
        for (path, content) in plan.harness.iter() {
            write_or_warn(sandbox, &mut state.transcript, Stage::Test, path, content).await;
        }
        let Some(command) = plan.command else {
            state
                .transcript
                .warn(Stage::Test, "no test command found in response");
            state.test_report = TestReport::NotApplicable;
            return Ok(());
        };

        let report = match sandbox.exec(&command).await {
            Ok(output) => {
                tracing::info!(%command, exit_code = output.exit_code, "tests executed");
                output.combined()
            }
            Err(e) => {
                tracing::warn!(%command, error = %e, "test command failed");
                format!("failed to run `{command}`: {e}")
            }
        };
        state.transcript.record(Speaker::Sandbox, Stage::Test, &report);
        state.test_report = TestReport::Output(report);
        Ok(())
    }

    #[instrument(skip_all, fields(stage = "review", iteration = state.iteration_count))]
    async fn review(&self, state: &mut PipelineState, sandbox: &dyn Sandbox) -> Result<(), PipelineError> {
        match read_sandbox(sandbox, &mut state.transcript, Stage::Review).await {
            Some(mut files) => {
                keep_unlisted(sandbox, &state.artifacts, &mut files).await;
                state.artifacts = files;
            }
            None => tracing::debug!("reviewing local artifacts"),
        }

        let inputs = PromptInputs::new()
            .with(keys::TASK, state.task())
            .with(keys::INSTRUCTIONS, state.instructions.as_str())
            .with(keys::STEP, state.current_step())
            .with(keys::FILES, render_files(&state.artifacts))
            .with(keys::TEST_REPORT, state.test_report.as_prompt());
        let text = self.complete(Stage::Review, RoleTemplate::Review, &inputs).await?;
        state.transcript.record(Speaker::Planner, Stage::Review, &text);

        state.last_verdict = if is_accepted(&text) {
            Verdict::Accepted
        } else {
            Verdict::Rejected { feedback: text }
        };
        tracing::info!(verdict = %state.last_verdict, "review complete");
        Ok(())
    }

    #[instrument(skip_all, fields(stage = "revise", iteration = state.iteration_count + 1))]
    async fn revise(&self, state: &mut PipelineState, sandbox: &dyn Sandbox) -> Result<(), PipelineError> {
        let feedback = state.last_verdict.feedback().unwrap_or_default().to_string();
        let inputs = PromptInputs::new()
            .with(keys::FEEDBACK, feedback)
            .with(keys::INSTRUCTIONS, state.instructions.as_str())
            .with(keys::STEP, state.current_step())
            .with(keys::FILES, render_files(&state.artifacts));
        let text = self.complete(Stage::Revise, RoleTemplate::Revise, &inputs).await?;
        state.transcript.record(Speaker::Coder, Stage::Revise, &text);

        let revision = parse_change_set(&text);
        for skipped in &revision.skipped {
            state.transcript.warn(
                Stage::Revise,
                format!("skipped change block {}: {}", skipped.block, skipped.reason),
            );
        }
        if revision.change_set.is_empty() {
            state
                .transcript
                .warn(Stage::Revise, "revision contained no recognizable changes");
        }

        let report = apply(&state.artifacts, &revision.change_set);
        for miss in report.misses() {
            state.transcript.warn(
                Stage::Revise,
                format!("{} target not found in {}; change skipped", miss.action, miss.file),
            );
        }
        for path in &report.changed {
            if let Some(content) = report.files.get(path) {
                write_or_warn(sandbox, &mut state.transcript, Stage::Revise, path, content).await;
            }
        }
        let changed = report.changed.len();
        let mut files = report.files;
        for path in revision.change_set.deletions() {
            delete_or_warn(sandbox, &mut state.transcript, Stage::Revise, path).await;
            files.remove(path);
        }
        state.artifacts = files;
        state.iteration_count += 1;

        tracing::info!(
            iteration = state.iteration_count,
            changed,
            fingerprint = %state.artifacts.fingerprint().short(),
            "revision applied"
        );
        Ok(())
    }

    #[instrument(skip_all, fields(stage = "summarize"))]
    async fn summarize(&self, state: &mut PipelineState, outcome: RunOutcome) -> Result<(), PipelineError> {
        let inputs = PromptInputs::new()
            .with(keys::TASK, state.task())
            .with(keys::FILES, render_files(&state.artifacts))
            .with(keys::OUTCOME, outcome.to_string())
            .with(keys::ITERATIONS, state.iteration_count.to_string());
        let summary = self
            .complete(Stage::Summarize, RoleTemplate::Summarize, &inputs)
            .await?;
        state
            .transcript
            .record(Speaker::Planner, Stage::Summarize, &summary);
        state.summary = Some(summary);
        Ok(())
    }

    async fn complete(
        &self,
        stage: Stage,
        role: RoleTemplate,
        inputs: &PromptInputs,
    ) -> Result<String, PipelineError> {
        tracing::debug!(%role, inputs = inputs.len(), "invoking completion");
        let text = self
            .completion
            .invoke(role, inputs)
            .await
            .map_err(|source| {
                tracing::error!(%stage, %role, error = %source, "completion failed");
                PipelineError::Completion { stage, source }
            })?;
        tracing::debug!(%role, bytes = text.len(), "completion received");
        Ok(text)
    }
}

impl std::fmt::Debug for Pipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Pipeline")
            .field("config", &self.config)
            .finish_non_exhaustive()
    }
}

fn render_files(files: &FileSet) -> String {
    if files.is_empty() {
        "(none)".to_string()
    } else {
        render(files)
    }
}

/// Sandbox files without test harnesses; `None` (and a warning) on failure
async fn read_sandbox(
    sandbox: &dyn Sandbox,
    transcript: &mut Transcript,
    stage: Stage,
) -> Option<FileSet> {
    match sandbox.snapshot().await {
        Ok(files) => Some(
            files
                .into_iter()
                .filter(|(path, _)| !is_test_harness(path))
                .collect(),
        ),
        Err(e) => {
            transcript.warn(stage, format!("could not read sandbox files: {e}"));
            None
        }
    }
}

/// Carry hidden files the run wrote into a fresh listing, which omits them
async fn keep_unlisted(sandbox: &dyn Sandbox, known: &FileSet, files: &mut FileSet) {
    for (path, local) in known.iter() {
        if !path.is_hidden() || files.contains(path) {
            continue;
        }
        match sandbox.read_file(path).await {
            Ok(Some(content)) => {
                files.insert(path.clone(), content);
            }
            Ok(None) => tracing::debug!(%path, "hidden file removed from sandbox"),
            Err(e) => {
                tracing::debug!(%path, error = %e, "keeping local copy of hidden file");
                files.insert(path.clone(), local);
            }
        }
    }
}

async fn write_or_warn(
    sandbox: &dyn Sandbox,
    transcript: &mut Transcript,
    stage: Stage,
    path: &ArtifactPath,
    content: &str,
) {
    if let Err(e) = sandbox.write_file(path, content).await {
        transcript.warn(stage, format!("failed to write {path}: {e}"));
    }
}

async fn delete_or_warn(
    sandbox: &dyn Sandbox,
    transcript: &mut Transcript,
    stage: Stage,
    path: &ArtifactPath,
) {
    if let Err(e) = sandbox.delete_file(path).await {
        transcript.warn(stage, format!("failed to delete {path}: {e}"));
    }
}
