//! Session identity and the context passed to history operations

use std::path::Path;
use std::sync::Arc;

use uuid::Uuid;

use super::local::LocalCache;
use crate::error::StoreError;

/// Stable per-device identity used to stamp and filter history records.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionIdentity {
    user_id: String,
}

impl SessionIdentity {
    pub fn new(user_id: impl Into<String>) -> Self {
        Self {
            user_id: user_id.into(),
        }
    }

    /// Fresh random identity.
    pub fn generate() -> Self {
        Self::new(Uuid::new_v4().to_string())
    }

    /// Read the identity stored at `path`, creating and persisting one if the
    /// file is missing or blank.
    pub async fn load_or_create(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref();
        match tokio::fs::read_to_string(path).await {
            Ok(text) if !text.trim().is_empty() => return Ok(Self::new(text.trim())),
            Ok(_) => {}
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => {}
            Err(err) => return Err(err.into()),
        }

        let identity = Self::generate();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(path, &identity.user_id).await?;
        tracing::info!(path = %path.display(), "created session identity");
        Ok(identity)
    }

    pub fn user_id(&self) -> &str {
        &self.user_id
    }
}

/// Session identity plus the local cache it owns.
#[derive(Clone)]
pub struct HistoryContext {
    pub session: SessionIdentity,
    pub cache: Arc<dyn LocalCache>,
}

impl HistoryContext {
    pub fn new(session: SessionIdentity, cache: Arc<dyn LocalCache>) -> Self {
        Self { session, cache }
    }

    pub fn user_id(&self) -> &str {
        self.session.user_id()
    }
}
