//! Directory-backed sandbox
//!
//! Files live under a root directory on the local filesystem and commands
//! run through `<shell> -c` with the root as working directory.

use crate::config::SandboxConfig;
use crate::error::SandboxError;
use crate::sandbox::{ExecOutput, Sandbox};
use async_trait::async_trait;
use duet_artifact::ArtifactPath;
use parking_lot::Mutex;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use tempfile::TempDir;
use tokio::process::Command;

/// Sandbox rooted at a local directory
#[derive(Debug)]
pub struct LocalSandbox {
    root: PathBuf,
    /// Owned temp dir, removed on teardown
    temp: Mutex<Option<TempDir>>,
    config: SandboxConfig,
    torn_down: AtomicBool,
}

impl LocalSandbox {
    /// Sandbox in a fresh temporary directory
    ///
    /// # Errors
    /// Returns error if the directory cannot be created.
    pub fn temporary(config: SandboxConfig) -> Result<Self, SandboxError> {
        let temp = tempfile::Builder::new()
            .prefix("duet-")
            .tempdir()
            .map_err(|e| SandboxError::io(std::env::temp_dir(), e))?;
        Ok(Self {
            root: temp.path().to_path_buf(),
            temp: Mutex::new(Some(temp)),
            config,
            torn_down: AtomicBool::new(false),
        })
    }

    /// Sandbox over an existing (or to-be-created) directory
    ///
    /// Teardown leaves the directory in place.
    ///
    /// # Errors
    /// Returns error if the directory cannot be created.
    pub fn at(root: impl Into<PathBuf>, config: SandboxConfig) -> Result<Self, SandboxError> {
        let root = root.into();
        std::fs::create_dir_all(&root).map_err(|e| SandboxError::io(&root, e))?;
        Ok(Self {
            root,
            temp: Mutex::new(None),
            config,
            torn_down: AtomicBool::new(false),
        })
    }

    /// Root directory
    #[inline]
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &ArtifactPath) -> PathBuf {
        path.segments().fold(self.root.clone(), |acc, s| acc.join(s))
    }

    fn ensure_live(&self) -> Result<(), SandboxError> {
        if self.torn_down.load(Ordering::Acquire) {
            Err(SandboxError::TornDown)
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl Sandbox for LocalSandbox {
    async fn list_files(&self) -> Result<Vec<ArtifactPath>, SandboxError> {
        self.ensure_live()?;
        let mut files = Vec::new();
        let mut pending = vec![(self.root.clone(), String::new())];

        while let Some((dir, prefix)) = pending.pop() {
            let mut entries = tokio::fs::read_dir(&dir)
                .await
                .map_err(|e| SandboxError::io(&dir, e))?;
            while let Some(entry) = entries
                .next_entry()
                .await
                .map_err(|e| SandboxError::io(&dir, e))?
            {
                let Some(name) = entry.file_name().to_str().map(str::to_string) else {
                    tracing::debug!(path = %entry.path().display(), "skipping non-utf8 name");
                    continue;
                };
                if name.starts_with('.') {
                    continue;
                }
                let relative = if prefix.is_empty() {
                    name
                } else {
                    format!("{prefix}/{name}")
                };
                let file_type = entry
                    .file_type()
                    .await
                    .map_err(|e| SandboxError::io(entry.path(), e))?;
                if file_type.is_dir() {
                    pending.push((entry.path(), relative));
                } else if file_type.is_file() {
                    match ArtifactPath::new(&relative) {
                        Ok(path) => files.push(path),
                        Err(e) => tracing::debug!(%relative, error = %e, "skipping unaddressable file"),
                    }
                }
            }
        }

        files.sort();
        Ok(files)
    }

    async fn read_file(&self, path: &ArtifactPath) -> Result<Option<String>, SandboxError> {
        self.ensure_live()?;
        let full = self.resolve(path);
        match tokio::fs::read_to_string(&full).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(None),
            Err(e) if e.kind() == ErrorKind::InvalidData => Err(SandboxError::NotText { path: full }),
            Err(e) => Err(SandboxError::io(full, e)),
        }
    }

    async fn write_file(&self, path: &ArtifactPath, content: &str) -> Result<(), SandboxError> {
        self.ensure_live()?;
        let full = self.resolve(path);
        if let Some(parent) = full.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| SandboxError::io(parent, e))?;
        }
        tokio::fs::write(&full, content)
            .await
            .map_err(|e| SandboxError::io(full, e))
    }

    async fn delete_file(&self, path: &ArtifactPath) -> Result<(), SandboxError> {
        self.ensure_live()?;
        let full = self.resolve(path);
        match tokio::fs::remove_file(&full).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == ErrorKind::NotFound => Ok(()),
            Err(e) => Err(SandboxError::io(full, e)),
        }
    }

    async fn exec(&self, command: &str) -> Result<ExecOutput, SandboxError> {
        self.ensure_live()?;
        let mut cmd = Command::new(&self.config.shell);
        cmd.arg("-c")
            .arg(command)
            .current_dir(&self.root)
            .kill_on_drop(true);

        tracing::debug!(command, root = %self.root.display(), "exec");
        let output = tokio::time::timeout(self.config.exec_timeout(), cmd.output())
            .await
            .map_err(|_| SandboxError::ExecTimeout {
                command: command.to_string(),
                secs: self.config.exec_timeout_secs,
            })?
            .map_err(|source| SandboxError::Spawn {
                command: command.to_string(),
                source,
            })?;

        Ok(ExecOutput {
            stdout: String::from_utf8_lossy(&output.stdout).into_owned(),
            stderr: String::from_utf8_lossy(&output.stderr).into_owned(),
            exit_code: output.status.code().unwrap_or(-1),
        })
    }

    async fn teardown(&self) -> Result<(), SandboxError> {
        if self.torn_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }
        let temp = self.temp.lock().take();
        if let Some(temp) = temp {
            let path = temp.path().to_path_buf();
            temp.close().map_err(|e| SandboxError::io(path, e))?;
        }
        tracing::debug!(root = %self.root.display(), "sandbox torn down");
        Ok(())
    }
}
