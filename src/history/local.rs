//! Single-device history cache

use std::path::{Path, PathBuf};

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::error::StoreError;
use crate::types::GenerationRecord;

/// Whole-list load/store of cached history records.
#[async_trait]
pub trait LocalCache: Send + Sync {
    async fn load(&self) -> Result<Vec<GenerationRecord>, StoreError>;

    async fn store(&self, records: &[GenerationRecord]) -> Result<(), StoreError>;
}

/// In-process cache, mostly for tests and ephemeral sessions.
#[derive(Debug, Default)]
pub struct MemoryCache {
    records: RwLock<Vec<GenerationRecord>>,
}

impl MemoryCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_records(records: Vec<GenerationRecord>) -> Self {
        Self {
            records: RwLock::new(records),
        }
    }
}

#[async_trait]
impl LocalCache for MemoryCache {
    async fn load(&self) -> Result<Vec<GenerationRecord>, StoreError> {
        Ok(self.records.read().await.clone())
    }

    async fn store(&self, records: &[GenerationRecord]) -> Result<(), StoreError> {
        *self.records.write().await = records.to_vec();
        Ok(())
    }
}

/// JSON file holding the cached record list.
///
/// Writes go to a sibling temp file which is then renamed over the target, so
/// a crash mid-write leaves the previous contents intact.
#[derive(Debug, Clone)]
pub struct FileCache {
    path: PathBuf,
}

impl FileCache {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn temp_path(&self) -> PathBuf {
        let mut name = self
            .path
            .file_name()
            .map(|n| n.to_os_string())
            .unwrap_or_else(|| "generations.json".into());
        name.push(".tmp");
        self.path.with_file_name(name)
    }
}

#[async_trait]
impl LocalCache for FileCache {
    async fn load(&self) -> Result<Vec<GenerationRecord>, StoreError> {
        let text = match tokio::fs::read_to_string(&self.path).await {
            Ok(text) => text,
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(err) => return Err(err.into()),
        };
        if text.trim().is_empty() {
            return Ok(Vec::new());
        }
        Ok(serde_json::from_str(&text)?)
    }

    async fn store(&self, records: &[GenerationRecord]) -> Result<(), StoreError> {
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            tokio::fs::create_dir_all(parent).await?;
        }
        let json = serde_json::to_vec_pretty(records)?;
        let tmp = self.temp_path();
        tokio::fs::write(&tmp, json).await?;
        tokio::fs::rename(&tmp, &self.path).await?;
        Ok(())
    }
}
