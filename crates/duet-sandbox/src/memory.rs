//! In-memory sandbox
//!
//! Keeps files in a [`FileSet`] and answers `exec` through a caller-supplied
//! handler, which makes pipeline runs fully deterministic.

use crate::error::SandboxError;
use crate::sandbox::{ExecOutput, Sandbox};
use async_trait::async_trait;
use duet_artifact::{ArtifactPath, FileSet};
use parking_lot::{Mutex, RwLock};
use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};

/// Exit status reported when no exec handler is installed
pub const NO_HANDLER_EXIT_CODE: i32 = 127;

type ExecHandler = Box<dyn Fn(&str, &FileSet) -> ExecOutput + Send + Sync>;

/// Sandbox backed by an in-memory file set
pub struct MemorySandbox {
    files: RwLock<FileSet>,
    exec_handler: Option<ExecHandler>,
    commands: Mutex<Vec<String>>,
    torn_down: AtomicBool,
}

impl MemorySandbox {
    /// Empty sandbox without an exec handler
    #[must_use]
    pub fn new() -> Self {
        Self {
            files: RwLock::new(FileSet::new()),
            exec_handler: None,
            commands: Mutex::new(Vec::new()),
            torn_down: AtomicBool::new(false),
        }
    }

    /// Seed the file tree
    #[must_use]
    pub fn with_files(self, files: FileSet) -> Self {
        *self.files.write() = files;
        self
    }

    /// Answer `exec` calls with `handler(command, current_files)`
    #[must_use]
    pub fn with_exec<F>(mut self, handler: F) -> Self
    where
        F: Fn(&str, &FileSet) -> ExecOutput + Send + Sync + 'static,
    {
        self.exec_handler = Some(Box::new(handler));
        self
    }

    /// Copy of every file, hidden ones included
    #[must_use]
    pub fn files(&self) -> FileSet {
        self.files.read().clone()
    }

    /// Commands passed to `exec`, in call order
    #[must_use]
    pub fn commands(&self) -> Vec<String> {
        self.commands.lock().clone()
    }

    /// Whether `teardown` has run
    #[must_use]
    pub fn is_torn_down(&self) -> bool {
        self.torn_down.load(Ordering::Acquire)
    }

    fn ensure_live(&self) -> Result<(), SandboxError> {
        if self.is_torn_down() {
            Err(SandboxError::TornDown)
        } else {
            Ok(())
        }
    }
}

impl Default for MemorySandbox {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for MemorySandbox {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("MemorySandbox")
            .field("files", &self.files.read().len())
            .field("exec_handler", &self.exec_handler.is_some())
            .field("torn_down", &self.is_torn_down())
            .finish()
    }
}

#[async_trait]
impl Sandbox for MemorySandbox {
    async fn list_files(&self) -> Result<Vec<ArtifactPath>, SandboxError> {
        self.ensure_live()?;
        Ok(self
            .files
            .read()
            .paths()
            .filter(|p| !p.is_hidden())
            .cloned()
            .collect())
    }

    async fn read_file(&self, path: &ArtifactPath) -> Result<Option<String>, SandboxError> {
        self.ensure_live()?;
        Ok(self.files.read().get(path).map(str::to_string))
    }

    async fn write_file(&self, path: &ArtifactPath, content: &str) -> Result<(), SandboxError> {
        self.ensure_live()?;
        self.files.write().insert(path.clone(), content);
        Ok(())
    }

    async fn delete_file(&self, path: &ArtifactPath) -> Result<(), SandboxError> {
        self.ensure_live()?;
        self.files.write().remove(path);
        Ok(())
    }

    async fn exec(&self, command: &str) -> Result<ExecOutput, SandboxError> {
        self.ensure_live()?;
        self.commands.lock().push(command.to_string());
        let output = match &self.exec_handler {
            Some(handler) => {
                let files = self.files.read();
                handler(command, &files)
            }
            None => ExecOutput::new(
                "",
                format!("sh: {command}: command not found\n"),
                NO_HANDLER_EXIT_CODE,
            ),
        };
        Ok(output)
    }

    async fn teardown(&self) -> Result<(), SandboxError> {
        self.torn_down.store(true, Ordering::Release);
        *self.files.write() = FileSet::new();
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn path(p: &str) -> ArtifactPath {
        ArtifactPath::new(p).unwrap()
    }

    #[tokio::test]
    async fn memory_sandbox_roundtrip() {
        let sandbox = MemorySandbox::new();
        sandbox.write_file(&path("b.txt"), "b").await.unwrap();
        sandbox.write_file(&path("a.txt"), "a").await.unwrap();
        sandbox.write_file(&path(".hidden"), "h").await.unwrap();

        assert_eq!(sandbox.list_files().await.unwrap(), vec![path("a.txt"), path("b.txt")]);
        assert_eq!(sandbox.snapshot().await.unwrap().len(), 2);
        assert_eq!(sandbox.files().len(), 3);

        sandbox.delete_file(&path("a.txt")).await.unwrap();
        assert_eq!(sandbox.read_file(&path("a.txt")).await.unwrap(), None);
    }

    #[tokio::test]
    async fn memory_sandbox_exec_handler_sees_files() {
        let sandbox = MemorySandbox::new().with_exec(|command, files| {
            ExecOutput::new(format!("{command}: {} files", files.len()), "", 0)
        });
        sandbox.write_file(&path("t.py"), "").await.unwrap();

        let out = sandbox.exec("python3 t.py").await.unwrap();
        assert_eq!(out.stdout, "python3 t.py: 1 files");
        assert_eq!(sandbox.commands(), vec!["python3 t.py".to_string()]);
    }

    #[tokio::test]
    async fn memory_sandbox_without_handler() {
        let out = MemorySandbox::new().exec("make").await.unwrap();
        assert_eq!(out.exit_code, NO_HANDLER_EXIT_CODE);
        assert!(out.stderr.contains("make"));
    }

    #[tokio::test]
    async fn memory_sandbox_teardown() {
        let sandbox = MemorySandbox::new();
        sandbox.teardown().await.unwrap();
        assert!(sandbox.is_torn_down());
        assert!(matches!(
            sandbox.write_file(&path("x"), "").await,
            Err(SandboxError::TornDown)
        ));
    }
}
