//! Sandbox configuration

use std::path::PathBuf;
use std::time::Duration;

/// Local sandbox settings
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(default)]
pub struct SandboxConfig {
    /// Parent directory for session roots; a temp dir per session when unset
    pub root: Option<PathBuf>,
    /// Exec timeout in seconds
    pub exec_timeout_secs: u64,
    /// Shell used as `<shell> -c <command>`
    pub shell: String,
}

impl SandboxConfig {
    /// Create with defaults
    #[inline]
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the root directory
    #[must_use]
    pub fn with_root(mut self, root: impl Into<PathBuf>) -> Self {
        self.root = Some(root.into());
        self
    }

    /// Set the exec timeout
    #[must_use]
    pub fn with_exec_timeout_secs(mut self, secs: u64) -> Self {
        self.exec_timeout_secs = secs;
        self
    }

    /// Set the shell
    #[must_use]
    pub fn with_shell(mut self, shell: impl Into<String>) -> Self {
        self.shell = shell.into();
        self
    }

    /// Exec timeout as a duration
    #[inline]
    #[must_use]
    pub fn exec_timeout(&self) -> Duration {
        Duration::from_secs(self.exec_timeout_secs)
    }
}

impl Default for SandboxConfig {
    fn default() -> Self {
        Self {
            root: None,
            exec_timeout_secs: 120,
            shell: "sh".to_string(),
        }
    }
}
