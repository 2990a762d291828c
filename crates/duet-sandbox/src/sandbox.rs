//! The sandbox contract
//!
//! A sandbox is an isolated file tree plus a way to run shell commands
//! inside it. Every path is relative to the sandbox root.

use crate::error::SandboxError;
use async_trait::async_trait;
use duet_artifact::{ArtifactPath, FileSet};

/// Captured result of one command
#[derive(Debug, Clone, Default, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct ExecOutput {
    /// Standard output
    pub stdout: String,
    /// Standard error
    pub stderr: String,
    /// Exit status (`-1` when killed by a signal)
    pub exit_code: i32,
}

impl ExecOutput {
    /// Create from parts
    #[must_use]
    pub fn new(stdout: impl Into<String>, stderr: impl Into<String>, exit_code: i32) -> Self {
        Self {
            stdout: stdout.into(),
            stderr: stderr.into(),
            exit_code,
        }
    }

    /// Whether the command exited with status 0
    #[inline]
    #[must_use]
    pub fn success(&self) -> bool {
        self.exit_code == 0
    }

    /// Stdout followed by stderr
    #[must_use]
    pub fn combined(&self) -> String {
        match (self.stdout.is_empty(), self.stderr.is_empty()) {
            (_, true) => self.stdout.clone(),
            (true, false) => self.stderr.clone(),
            (false, false) => {
                let sep = if self.stdout.ends_with('\n') { "" } else { "\n" };
                format!("{}{sep}{}", self.stdout, self.stderr)
            }
        }
    }
}

/// Isolated file tree with command execution
#[async_trait]
pub trait Sandbox: Send + Sync + std::fmt::Debug {
    /// All non-hidden files, sorted by path
    async fn list_files(&self) -> Result<Vec<ArtifactPath>, SandboxError>;

    /// File content, `None` when the file does not exist
    async fn read_file(&self, path: &ArtifactPath) -> Result<Option<String>, SandboxError>;

    /// Create or overwrite a file, creating parent directories
    async fn write_file(&self, path: &ArtifactPath, content: &str) -> Result<(), SandboxError>;

    /// Remove a file; removing a missing file succeeds
    async fn delete_file(&self, path: &ArtifactPath) -> Result<(), SandboxError>;

    /// Run a shell command from the sandbox root
    async fn exec(&self, command: &str) -> Result<ExecOutput, SandboxError>;

    /// Release the sandbox's resources
    async fn teardown(&self) -> Result<(), SandboxError>;

    /// Read every listed file into a file set
    ///
    /// Files that disappear between listing and reading, and files that are
    /// not UTF-8 text, are skipped.
    async fn snapshot(&self) -> Result<FileSet, SandboxError> {
        let mut files = FileSet::new();
        for path in self.list_files().await? {
            match self.read_file(&path).await {
                Ok(Some(content)) => {
                    files.insert(path, content);
                }
                Ok(None) => {}
                Err(SandboxError::NotText { .. }) => {
                    tracing::debug!(%path, "skipping non-text file");
                }
                Err(e) => return Err(e),
            }
        }
        Ok(files)
    }
}
