//! Key/value backend trait and implementations

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use async_trait::async_trait;
use tokio::fs;
use tokio::sync::RwLock;

use crate::error::Result;

/// Minimal persistence backend for the SDK's two durable keys.
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    /// Read a value, `None` when absent.
    async fn get(&self, key: &str) -> Result<Option<String>>;

    /// Write a value.
    async fn set(&self, key: &str, value: &str) -> Result<()>;

    /// Remove a value; removing an absent key is not an error.
    async fn remove(&self, key: &str) -> Result<()>;
}

/// In-memory backend for tests and hosts without durable storage.
#[derive(Default)]
pub struct MemoryKeyValueStore {
    entries: RwLock<HashMap<String, String>>,
}

impl MemoryKeyValueStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn shared() -> Arc<Self> {
        Arc::new(Self::new())
    }
}

#[async_trait]
impl KeyValueStore for MemoryKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> Result<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// File-backed store keeping all keys in a single JSON map.
#[derive(Clone)]
pub struct FileKeyValueStore {
    path: PathBuf,
}

impl FileKeyValueStore {
    /// `base_dir` is created on first write if missing.
    pub fn new<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            path: base_dir.as_ref().join("widget_store.json"),
        }
    }

    async fn load(&self) -> Result<HashMap<String, String>> {
        if !self.path.exists() {
            return Ok(HashMap::new());
        }
        let contents = fs::read_to_string(&self.path).await?;
        Ok(serde_json::from_str(&contents)?)
    }

    async fn persist(&self, entries: &HashMap<String, String>) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent).await?;
        }
        let contents = serde_json::to_string_pretty(entries)?;
        fs::write(&self.path, contents).await?;
        Ok(())
    }
}

#[async_trait]
impl KeyValueStore for FileKeyValueStore {
    async fn get(&self, key: &str) -> Result<Option<String>> {
        Ok(self.load().await?.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> Result<()> {
        let mut entries = self.load().await?;
        entries.insert(key.to_string(), value.to_string());
        self.persist(&entries).await
    }

    async fn remove(&self, key: &str) -> Result<()> {
        let mut entries = self.load().await?;
        if entries.remove(key).is_some() {
            self.persist(&entries).await?;
        }
        Ok(())
    }
}
