//! Duet CLI
//!
//! Configuration and logging setup for the `duet` binary.

#![warn(unreachable_pub)]
#![allow(missing_docs)]

mod config;
mod logging;

pub use config::{AppConfig, ConfigError, Overrides};
pub use logging::{init_tracing, LogFormat};

/// Version of this crate
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
