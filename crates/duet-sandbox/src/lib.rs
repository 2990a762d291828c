//! Duet Sandbox
//!
//! Isolated file trees where generated code is written and tested.
//!
//! # Core Concepts
//!
//! - [`Sandbox`]: Async contract for file and process primitives
//! - [`LocalSandbox`]: Directory-backed sandbox with shell execution
//! - [`MemorySandbox`]: In-memory sandbox with scripted execution
//! - [`SessionRegistry`]: Atomic per-session get-or-create

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod error;
mod local;
mod memory;
mod registry;
mod sandbox;

pub use config::SandboxConfig;
pub use error::SandboxError;
pub use local::LocalSandbox;
pub use memory::{MemorySandbox, NO_HANDLER_EXIT_CODE};
pub use registry::{
    LocalSandboxFactory, MemorySandboxFactory, SandboxFactory, SessionId, SessionRegistry,
};
pub use sandbox::{ExecOutput, Sandbox};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
