//! Contracts for the collaborators this service reads from: durable
//! key-value storage, the health data source, and the profile store.

use crate::errors::{AnalysisError, StoreError};
use crate::types::{HealthSnapshot, UserProfile};
use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::Mutex;

#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError>;
}

#[derive(Debug, Default)]
pub struct MemoryStore {
    inner: DashMap<String, Vec<u8>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.inner.get(key).map(|entry| entry.value().clone()))
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        self.inner.insert(key.to_string(), value);
        Ok(())
    }
}

/// One file per key under `dir`.
#[derive(Debug, Clone)]
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub async fn open(dir: impl AsRef<Path>) -> Result<Self, StoreError> {
        let dir = dir.as_ref().to_path_buf();
        tokio::fs::create_dir_all(&dir).await?;
        Ok(Self { dir })
    }

    fn path_for(&self, key: &str) -> PathBuf {
        let name: String = key
            .chars()
            .map(|c| {
                if c.is_ascii_alphanumeric() || c == '-' || c == '_' || c == '.' {
                    c
                } else {
                    '_'
                }
            })
            .collect();
        self.dir.join(format!("{name}.json"))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        match tokio::fs::read(self.path_for(key)).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(err) if err.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(err) => Err(err.into()),
        }
    }

    async fn set(&self, key: &str, value: Vec<u8>) -> Result<(), StoreError> {
        let path = self.path_for(key);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, value).await?;
        tokio::fs::rename(&tmp, &path).await?;
        Ok(())
    }
}

/// Orders writes of one key. Callers take a ticket in the same critical
/// section that serializes their state; a write whose ticket is older than
/// the last one stored is dropped.
#[derive(Debug, Default)]
pub struct OrderedWriter {
    issued: AtomicU64,
    written: Mutex<u64>,
}

impl OrderedWriter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn ticket(&self) -> u64 {
        self.issued.fetch_add(1, Ordering::SeqCst) + 1
    }

    /// Returns `Ok(false)` when a newer snapshot already landed.
    pub async fn write(
        &self,
        store: &dyn KeyValueStore,
        key: &str,
        ticket: u64,
        value: Vec<u8>,
    ) -> Result<bool, StoreError> {
        let mut written = self.written.lock().await;
        if ticket <= *written {
            return Ok(false);
        }
        store.set(key, value).await?;
        *written = ticket;
        Ok(true)
    }
}

/// Supplies the latest biometric snapshot. Snapshots may be stale; recency is
/// a data-quality concern, not an error.
#[async_trait]
pub trait HealthDataSource: Send + Sync {
    async fn snapshot(&self) -> Result<HealthSnapshot, AnalysisError>;
}

#[async_trait]
pub trait ProfileStore: Send + Sync {
    async fn profile(&self) -> Result<UserProfile, AnalysisError>;
}

/// Fixed snapshot and profile, for embedding callers and tests.
#[derive(Debug, Clone)]
pub struct StaticSource {
    pub snapshot: HealthSnapshot,
    pub profile: UserProfile,
}

#[async_trait]
impl HealthDataSource for StaticSource {
    async fn snapshot(&self) -> Result<HealthSnapshot, AnalysisError> {
        Ok(self.snapshot.clone())
    }
}

#[async_trait]
impl ProfileStore for StaticSource {
    async fn profile(&self) -> Result<UserProfile, AnalysisError> {
        Ok(self.profile.clone())
    }
}
