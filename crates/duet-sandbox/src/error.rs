//! Error types for sandboxes

use duet_artifact::PathError;
use std::path::PathBuf;

/// Sandbox failure
#[derive(Debug, thiserror::Error)]
pub enum SandboxError {
    /// Filesystem operation failed
    #[error("io error at {path}: {source}")]
    Io {
        /// Absolute path involved
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// File content is not UTF-8 text
    #[error("not a text file: {path}")]
    NotText {
        /// Absolute path involved
        path: PathBuf,
    },

    /// A path found in the sandbox tree is not a valid artifact path
    #[error("invalid path: {0}")]
    Path(#[from] PathError),

    /// Command could not be started
    #[error("failed to spawn '{command}': {source}")]
    Spawn {
        /// Command line
        command: String,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Command exceeded the exec timeout
    #[error("command timed out after {secs}s: {command}")]
    ExecTimeout {
        /// Command line
        command: String,
        /// Configured timeout
        secs: u64,
    },

    /// Sandbox was used after teardown
    #[error("sandbox has been torn down")]
    TornDown,

    /// Factory could not build a sandbox
    #[error("sandbox creation failed: {0}")]
    Creation(String),
}

impl SandboxError {
    /// Wrap an io error with the path it happened at
    #[inline]
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        Self::Io {
            path: path.into(),
            source,
        }
    }

    /// Check if retrying the same operation may succeed
    #[inline]
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::ExecTimeout { .. } | Self::Creation(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn retryable_classification() {
        assert!(SandboxError::ExecTimeout {
            command: "sleep 9".into(),
            secs: 1
        }
        .is_retryable());
        assert!(!SandboxError::TornDown.is_retryable());
        assert!(!SandboxError::NotText { path: "/tmp/a.pyc".into() }.is_retryable());
    }

    #[test]
    fn io_error_display_includes_path() {
        let err = SandboxError::io(
            "/tmp/x",
            std::io::Error::new(std::io::ErrorKind::PermissionDenied, "denied"),
        );
        assert!(err.to_string().contains("/tmp/x"));
    }
}
