//! Duet Completion
//!
//! Contract between the pipeline and a language model, the role prompt
//! templates, and a reference HTTP client for OpenAI-compatible endpoints.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod error;
mod http;
pub mod prompt;
mod role;
mod service;

pub use config::{CompletionConfig, DEFAULT_API_KEY_ENV};
pub use error::CompletionError;
pub use http::HttpCompletionService;
pub use prompt::{render, PromptInputs};
pub use role::RoleTemplate;
pub use service::CompletionService;

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
