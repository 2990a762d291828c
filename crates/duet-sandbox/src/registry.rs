//! Session-keyed sandbox registry
//!
//! Each client session owns one sandbox. [`SessionRegistry::get_or_create`]
//! is atomic per session: concurrent callers for the same id all wait on one
//! creation and receive the same sandbox.

use crate::config::SandboxConfig;
use crate::error::SandboxError;
use crate::local::LocalSandbox;
use crate::memory::MemorySandbox;
use crate::sandbox::Sandbox;
use async_trait::async_trait;
use dashmap::DashMap;
use std::fmt::{self, Display, Formatter};
use std::sync::Arc;
use tokio::sync::OnceCell;

/// Client-supplied session identifier
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct SessionId(String);

impl SessionId {
    /// Create from any string
    #[inline]
    #[must_use]
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// Id as string slice
    #[inline]
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Id reduced to characters safe for a directory name
    #[must_use]
    pub fn dir_name(&self) -> String {
        let cleaned: String = self
            .0
            .chars()
            .map(|c| if c.is_ascii_alphanumeric() || c == '-' || c == '_' { c } else { '_' })
            .collect();
        if cleaned.is_empty() {
            "session".to_string()
        } else {
            cleaned
        }
    }
}

impl Display for SessionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for SessionId {
    fn from(id: &str) -> Self {
        Self::new(id)
    }
}

impl From<String> for SessionId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

/// Builds the sandbox for a new session
#[async_trait]
pub trait SandboxFactory: Send + Sync {
    /// Create a sandbox for `session`
    async fn create(&self, session: &SessionId) -> Result<Arc<dyn Sandbox>, SandboxError>;
}

/// Creates a [`LocalSandbox`] per session
///
/// With a configured root each session gets `<root>/<session>`; otherwise a
/// fresh temp dir.
#[derive(Debug, Clone, Default)]
pub struct LocalSandboxFactory {
    config: SandboxConfig,
}

impl LocalSandboxFactory {
    /// Create factory
    #[inline]
    #[must_use]
    pub fn new(config: SandboxConfig) -> Self {
        Self { config }
    }
}

#[async_trait]
impl SandboxFactory for LocalSandboxFactory {
    async fn create(&self, session: &SessionId) -> Result<Arc<dyn Sandbox>, SandboxError> {
        let sandbox = match &self.config.root {
            Some(root) => LocalSandbox::at(root.join(session.dir_name()), self.config.clone())?,
            None => LocalSandbox::temporary(self.config.clone())?,
        };
        tracing::info!(%session, root = %sandbox.root().display(), "created local sandbox");
        Ok(Arc::new(sandbox))
    }
}

/// Creates an empty [`MemorySandbox`] per session
#[derive(Debug, Clone, Copy, Default)]
pub struct MemorySandboxFactory;

#[async_trait]
impl SandboxFactory for MemorySandboxFactory {
    async fn create(&self, session: &SessionId) -> Result<Arc<dyn Sandbox>, SandboxError> {
        tracing::debug!(%session, "created memory sandbox");
        Ok(Arc::new(MemorySandbox::new()))
    }
}

/// Explicit session → sandbox store
pub struct SessionRegistry {
    factory: Arc<dyn SandboxFactory>,
    sessions: DashMap<SessionId, Arc<OnceCell<Arc<dyn Sandbox>>>>,
}

impl SessionRegistry {
    /// Create registry over a factory
    #[must_use]
    pub fn new(factory: Arc<dyn SandboxFactory>) -> Self {
        Self {
            factory,
            sessions: DashMap::new(),
        }
    }

    /// Sandbox for `session`, creating it on first use
    ///
    /// A failed creation leaves the session empty so a later call retries.
    ///
    /// # Errors
    /// Returns the factory's error.
    pub async fn get_or_create(&self, session: &SessionId) -> Result<Arc<dyn Sandbox>, SandboxError> {
        // Clone the cell out so no map shard lock is held across the await
        let cell = self.sessions.entry(session.clone()).or_default().value().clone();
        let sandbox = cell
            .get_or_try_init(|| self.factory.create(session))
            .await?;
        Ok(Arc::clone(sandbox))
    }

    /// Existing sandbox for `session`
    #[must_use]
    pub fn get(&self, session: &SessionId) -> Option<Arc<dyn Sandbox>> {
        self.sessions
            .get(session)
            .and_then(|cell| cell.get().cloned())
    }

    /// Forget `session` and tear its sandbox down
    ///
    /// Returns whether the session existed.
    ///
    /// # Errors
    /// Returns the sandbox's teardown error.
    pub async fn remove(&self, session: &SessionId) -> Result<bool, SandboxError> {
        let Some((_, cell)) = self.sessions.remove(session) else {
            return Ok(false);
        };
        if let Some(sandbox) = cell.get() {
            sandbox.teardown().await?;
            tracing::info!(%session, "session removed");
        }
        Ok(true)
    }

    /// Tear down every session
    ///
    /// Teardown failures are logged and do not stop the sweep.
    pub async fn shutdown_all(&self) {
        let ids: Vec<SessionId> = self.sessions.iter().map(|e| e.key().clone()).collect();
        for id in ids {
            if let Err(e) = self.remove(&id).await {
                tracing::warn!(session = %id, error = %e, "sandbox teardown failed");
            }
        }
    }

    /// Registered session count
    #[inline]
    #[must_use]
    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    /// Whether no session is registered
    #[inline]
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.sessions.is_empty()
    }

    /// Registered session ids, sorted
    #[must_use]
    pub fn session_ids(&self) -> Vec<SessionId> {
        let mut ids: Vec<_> = self.sessions.iter().map(|e| e.key().clone()).collect();
        ids.sort();
        ids
    }
}

impl fmt::Debug for SessionRegistry {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.debug_struct("SessionRegistry")
            .field("sessions", &self.sessions.len())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use duet_artifact::ArtifactPath;

    #[test]
    fn session_dir_name() {
        assert_eq!(SessionId::new("user-1_a").dir_name(), "user-1_a");
        assert_eq!(SessionId::new("../etc").dir_name(), "___etc");
        assert_eq!(SessionId::new("").dir_name(), "session");
    }

    #[tokio::test]
    async fn registry_reuses_session_sandbox() {
        let registry = SessionRegistry::new(Arc::new(MemorySandboxFactory));
        let id = SessionId::from("s1");

        let first = registry.get_or_create(&id).await.unwrap();
        let path = ArtifactPath::new("a.txt").unwrap();
        first.write_file(&path, "x").await.unwrap();

        let second = registry.get_or_create(&id).await.unwrap();
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.read_file(&path).await.unwrap().as_deref(), Some("x"));

        let other = registry.get_or_create(&SessionId::from("s2")).await.unwrap();
        assert!(!Arc::ptr_eq(&first, &other));
        assert_eq!(registry.len(), 2);
    }

    #[tokio::test]
    async fn registry_remove_tears_down() {
        let registry = SessionRegistry::new(Arc::new(MemorySandboxFactory));
        let id = SessionId::from("s1");
        let sandbox = registry.get_or_create(&id).await.unwrap();

        assert!(registry.remove(&id).await.unwrap());
        assert!(!registry.remove(&id).await.unwrap());
        assert!(registry.get(&id).is_none());
        assert!(matches!(sandbox.list_files().await, Err(SandboxError::TornDown)));
    }

    #[tokio::test]
    async fn local_factory_uses_session_dir() {
        let dir = tempfile::tempdir().unwrap();
        let factory = LocalSandboxFactory::new(SandboxConfig::default().with_root(dir.path()));
        let registry = SessionRegistry::new(Arc::new(factory));

        let sandbox = registry.get_or_create(&SessionId::from("job 7")).await.unwrap();
        sandbox
            .write_file(&ArtifactPath::new("main.py").unwrap(), "pass")
            .await
            .unwrap();
        assert!(dir.path().join("job_7/main.py").exists());
    }
}
