//! Duet Core
//!
//! Scheduler for a two-role code generation loop: a planner/reviewer model
//! designs and judges, a coder model writes and revises, and the run repeats
//! review and revision until the code is accepted or the iteration budget is
//! spent.
//!
//! # Core Concepts
//!
//! - [`Pipeline`]: Runs one task against one sandbox
//! - [`Stage`]: Pipeline position with an explicit transition table
//! - [`PipelineState`]: Mutable state threaded through the stages
//! - [`RunReport`]: Final artifacts, verdict and transcript of a run
//!
//! # Example
//!
//! ```rust,no_run
//! use duet_completion::{CompletionConfig, HttpCompletionService};
//! use duet_core::{Pipeline, PipelineConfig};
//! use duet_sandbox::{LocalSandbox, SandboxConfig};
//! use std::sync::Arc;
//!
//! # async fn demo() -> Result<(), Box<dyn std::error::Error>> {
//! let completion = HttpCompletionService::from_config(CompletionConfig::default())?;
//! let pipeline = Pipeline::new(Arc::new(completion), PipelineConfig::default());
//! let sandbox = Arc::new(LocalSandbox::temporary(SandboxConfig::default())?);
//!
//! let report = pipeline.run("write a fizzbuzz CLI in python", sandbox).await?;
//! println!("{} after {} revisions", report.outcome, report.iterations_used);
//! # Ok(())
//! # }
//! ```

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod error;
mod extract;
mod pipeline;
mod report;
mod stage;
mod state;
mod transcript;

pub use config::{PipelineConfig, StageFlags, DEFAULT_MAX_ITERATIONS};
pub use error::{PipelineError, StageError};
pub use extract::{is_test_harness, plan_steps, test_plan, TestPlan, TEST_HARNESS_MARKER};
pub use pipeline::Pipeline;
pub use report::{RunId, RunOutcome, RunReport};
pub use stage::{allowed_transitions, validate_transition, Stage};
pub use state::{PipelineState, Plan, TestReport, Verdict};
pub use transcript::{Speaker, Transcript, TranscriptEntry};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
