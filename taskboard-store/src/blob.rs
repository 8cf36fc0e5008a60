//! Blob store: durable key → bytes, no expiry

use crate::error::Result;
use crate::fs::{atomic_write, entry_path, list_keys, open_dir, read_optional, remove_optional};
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use tokio::sync::RwLock;
use tracing::{debug, trace};

const BLOB_EXTENSION: &str = "bin";

/// Storage abstraction for large binary values
#[async_trait]
pub trait BlobStore: Send + Sync {
    /// Store `value` under `key`, replacing any previous value
    async fn put(&self, key: &str, value: &[u8]) -> Result<()>;

    /// Fetch the value stored under `key`
    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>>;

    /// Remove `key`. Returns whether a value was present; absence is not an error.
    async fn delete(&self, key: &str) -> Result<bool>;

    /// All keys currently stored, sorted
    async fn keys(&self) -> Result<Vec<String>>;
}

/// In-memory blob store
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    entries: RwLock<BTreeMap<String, Vec<u8>>>,
}

impl MemoryBlobStore {
    /// Create an empty store
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        trace!(key, size = value.len(), "blob put");
        self.entries
            .write()
            .await
            .insert(key.to_string(), value.to_vec());
        Ok(())
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        Ok(self.entries.read().await.get(key).cloned())
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        Ok(self.entries.write().await.remove(key).is_some())
    }

    async fn keys(&self) -> Result<Vec<String>> {
        Ok(self.entries.read().await.keys().cloned().collect())
    }
}

/// File-backed blob store: one `{key}.bin` file per entry
#[derive(Debug)]
pub struct FileBlobStore {
    dir: PathBuf,
}

impl FileBlobStore {
    /// Open (creating if needed) a blob store rooted at `dir`
    pub async fn open(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        open_dir(&dir).await?;
        debug!(dir = %dir.display(), "opened blob store");
        Ok(Self { dir })
    }

    /// Directory holding the blob files
    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path(&self, key: &str) -> PathBuf {
        entry_path(&self.dir, key, BLOB_EXTENSION)
    }
}

#[async_trait]
impl BlobStore for FileBlobStore {
    async fn put(&self, key: &str, value: &[u8]) -> Result<()> {
        trace!(key, size = value.len(), "blob put");
        atomic_write(&self.path(key), value).await
    }

    async fn get(&self, key: &str) -> Result<Option<Vec<u8>>> {
        read_optional(&self.path(key)).await
    }

    async fn delete(&self, key: &str) -> Result<bool> {
        remove_optional(&self.path(key)).await
    }

    async fn keys(&self) -> Result<Vec<String>> {
        list_keys(&self.dir, BLOB_EXTENSION).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    async fn exercise(store: &dyn BlobStore) {
        assert_eq!(store.get("a").await.unwrap(), None);

        store.put("a", &[1, 2, 3]).await.unwrap();
        store.put("b", &[]).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(vec![1, 2, 3]));
        assert_eq!(store.get("b").await.unwrap(), Some(vec![]));

        store.put("a", &[9]).await.unwrap();
        assert_eq!(store.get("a").await.unwrap(), Some(vec![9]));

        assert_eq!(store.keys().await.unwrap(), vec!["a", "b"]);

        assert!(store.delete("a").await.unwrap());
        assert!(!store.delete("a").await.unwrap());
        assert_eq!(store.get("a").await.unwrap(), None);
        assert_eq!(store.keys().await.unwrap(), vec!["b"]);
    }

    #[tokio::test]
    async fn test_memory_blob_store() {
        exercise(&MemoryBlobStore::new()).await;
    }

    #[tokio::test]
    async fn test_file_blob_store() {
        let temp = TempDir::new().unwrap();
        let store = FileBlobStore::open(temp.path().join("blobs")).await.unwrap();
        exercise(&store).await;
    }

    #[tokio::test]
    async fn test_file_blob_store_persists_across_open() {
        let temp = TempDir::new().unwrap();
        let dir = temp.path().join("blobs");

        let store = FileBlobStore::open(&dir).await.unwrap();
        store.put("task:1", b"payload").await.unwrap();
        drop(store);

        let reopened = FileBlobStore::open(&dir).await.unwrap();
        assert_eq!(
            reopened.get("task:1").await.unwrap(),
            Some(b"payload".to_vec())
        );
        assert_eq!(reopened.keys().await.unwrap(), vec!["task:1"]);
    }

    #[tokio::test]
    async fn test_file_blob_store_unavailable() {
        let temp = TempDir::new().unwrap();
        let file = temp.path().join("not-a-dir");
        std::fs::write(&file, "x").unwrap();

        let result = FileBlobStore::open(file.join("blobs")).await;
        assert!(matches!(result, Err(crate::StoreError::Unavailable { .. })));
    }
}
