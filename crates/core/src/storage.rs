//! Durable key/value storage for client session state
//!
//! The session store never touches a concrete storage medium directly. It is
//! handed a [`KeyValueStore`] and reads and writes named string entries through
//! it, so tests can substitute [`MemoryStore`] while the CLI persists to a
//! [`FileStore`] in its data directory.

use crate::{CoreResult, ErrorContext};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::{Mutex, RwLock};

/// Named entries persisted for an authenticated session
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StorageKey {
    AccessToken,
    RefreshToken,
    UserId,
}

impl StorageKey {
    /// All session keys, in the order they are written
    pub const ALL: [Self; 3] = [Self::AccessToken, Self::RefreshToken, Self::UserId];

    /// The key name as stored on disk
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::AccessToken => "accessToken",
            Self::RefreshToken => "refreshToken",
            Self::UserId => "userId",
        }
    }
}

impl std::fmt::Display for StorageKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Last-write-wins string storage over named keys
#[async_trait]
pub trait KeyValueStore: Send + Sync {
    async fn get(&self, key: &str) -> CoreResult<Option<String>>;
    async fn set(&self, key: &str, value: &str) -> CoreResult<()>;
    async fn remove(&self, key: &str) -> CoreResult<()>;
}

/// In-process storage, lost when the process exits
#[derive(Debug, Default)]
pub struct MemoryStore {
    entries: RwLock<BTreeMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with the given entries
    pub fn with_entries<I, K, V>(entries: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            entries: RwLock::new(
                entries
                    .into_iter()
                    .map(|(k, v)| (k.into(), v.into()))
                    .collect(),
            ),
        }
    }

    /// Number of entries currently held
    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }
}

#[async_trait]
impl KeyValueStore for MemoryStore {
    async fn get(&self, key: &str) -> CoreResult<Option<String>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_string());
        Ok(())
    }

    async fn remove(&self, key: &str) -> CoreResult<()> {
        self.entries.write().await.remove(key);
        Ok(())
    }
}

/// Storage backed by a single JSON object on disk
///
/// Every operation re-reads the file, so several processes sharing one data
/// directory see each other's writes. Writes within this process are
/// serialised; across processes the last writer wins.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl FileStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    async fn load(&self) -> CoreResult<BTreeMap<String, String>> {
        match tokio::fs::read(&self.path).await {
            Ok(bytes) if bytes.is_empty() => Ok(BTreeMap::new()),
            Ok(bytes) => serde_json::from_slice(&bytes)
                .storage_context(|| format!("corrupt session file {}", self.path.display())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(BTreeMap::new()),
            Err(e) => Err(e).storage_context(|| format!("reading {}", self.path.display())),
        }
    }

    async fn save(&self, entries: &BTreeMap<String, String>) -> CoreResult<()> {
        if let Some(parent) = self.path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .storage_context(|| format!("creating {}", parent.display()))?;
        }
        let content = serde_json::to_vec_pretty(entries)?;
        tokio::fs::write(&self.path, content)
            .await
            .storage_context(|| format!("writing {}", self.path.display()))
    }
}

#[async_trait]
impl KeyValueStore for FileStore {
    async fn get(&self, key: &str) -> CoreResult<Option<String>> {
        Ok(self.load().await?.remove(key))
    }

    async fn set(&self, key: &str, value: &str) -> CoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load().await?;
        entries.insert(key.to_string(), value.to_string());
        self.save(&entries).await
    }

    async fn remove(&self, key: &str) -> CoreResult<()> {
        let _guard = self.write_lock.lock().await;
        let mut entries = self.load().await?;
        if entries.remove(key).is_some() {
            self.save(&entries).await?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::CoreError;

    async fn exercise(store: &dyn KeyValueStore) {
        assert_eq!(store.get("accessToken").await.unwrap(), None);

        store.set("accessToken", "T1").await.unwrap();
        store.set("userId", "U1").await.unwrap();
        assert_eq!(
            store.get("accessToken").await.unwrap().as_deref(),
            Some("T1")
        );

        store.set("accessToken", "T2").await.unwrap();
        assert_eq!(
            store.get("accessToken").await.unwrap().as_deref(),
            Some("T2")
        );

        store.remove("accessToken").await.unwrap();
        assert_eq!(store.get("accessToken").await.unwrap(), None);
        assert_eq!(store.get("userId").await.unwrap().as_deref(), Some("U1"));

        // Removing a missing key is not an error
        store.remove("refreshToken").await.unwrap();
    }

    #[test]
    fn test_storage_key_names() {
        let names: Vec<_> = StorageKey::ALL.iter().map(|k| k.as_str()).collect();
        assert_eq!(names, ["accessToken", "refreshToken", "userId"]);
    }

    #[tokio::test]
    async fn test_memory_store() {
        let store = MemoryStore::new();
        exercise(&store).await;
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn test_file_store() {
        let dir = tempfile::tempdir().unwrap();
        let store = FileStore::new(dir.path().join("nested").join("session.json"));
        exercise(&store).await;

        // A second handle on the same file sees the persisted state
        let reopened = FileStore::new(store.path());
        assert_eq!(reopened.get("userId").await.unwrap().as_deref(), Some("U1"));
    }

    #[tokio::test]
    async fn test_file_store_rejects_corrupt_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("session.json");
        std::fs::write(&path, "not json").unwrap();

        let store = FileStore::new(&path);
        let err = store.get("accessToken").await.unwrap_err();
        assert!(matches!(err, CoreError::Storage { .. }));
    }
}
