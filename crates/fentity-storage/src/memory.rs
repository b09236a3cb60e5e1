use crate::traits::{check_key, ByteStream, Storage, StorageError, StorageResult};
use crate::StorageBackend;
use async_trait::async_trait;
use bytes::Bytes;
use std::collections::HashMap;
use std::sync::Arc;
use tokio::sync::RwLock;

/// In-process storage backed by a map of keys to immutable buffers.
///
/// Every mutation happens under one write lock, so `copy` swaps the
/// destination buffer in a single step. Content is lost when the process exits.
#[derive(Clone, Default)]
pub struct MemoryStorage {
    blobs: Arc<RwLock<HashMap<String, Bytes>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of stored blobs
    pub async fn len(&self) -> usize {
        self.blobs.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.blobs.read().await.is_empty()
    }

    /// All keys starting with `prefix`, sorted
    pub async fn keys_with_prefix(&self, prefix: &str) -> Vec<String> {
        let blobs = self.blobs.read().await;
        let mut keys: Vec<String> = blobs
            .keys()
            .filter(|key| key.starts_with(prefix))
            .cloned()
            .collect();
        keys.sort();
        keys
    }
}

#[async_trait]
impl Storage for MemoryStorage {
    async fn write(&self, key: &str, data: Vec<u8>) -> StorageResult<()> {
        check_key(key)?;
        let size = data.len();
        self.blobs
            .write()
            .await
            .insert(key.to_string(), Bytes::from(data));

        tracing::debug!(key = %key, size_bytes = size, "Memory storage write successful");
        Ok(())
    }

    async fn read(&self, key: &str) -> StorageResult<Vec<u8>> {
        check_key(key)?;
        self.blobs
            .read()
            .await
            .get(key)
            .map(|data| data.to_vec())
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    async fn read_stream(&self, key: &str) -> StorageResult<ByteStream> {
        check_key(key)?;
        let data = self
            .blobs
            .read()
            .await
            .get(key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(key.to_string()))?;

        Ok(Box::pin(futures::stream::once(async move { Ok(data) })))
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        check_key(key)?;
        if self.blobs.write().await.remove(key).is_some() {
            tracing::debug!(key = %key, "Memory storage delete successful");
        }
        Ok(())
    }

    async fn copy(&self, from_key: &str, to_key: &str) -> StorageResult<()> {
        check_key(from_key)?;
        check_key(to_key)?;

        let mut blobs = self.blobs.write().await;
        let data = blobs
            .get(from_key)
            .cloned()
            .ok_or_else(|| StorageError::NotFound(from_key.to_string()))?;
        blobs.insert(to_key.to_string(), data);

        tracing::debug!(from_key = %from_key, to_key = %to_key, "Memory storage copy successful");
        Ok(())
    }

    async fn delete_prefix(&self, prefix: &str) -> StorageResult<()> {
        let prefix = prefix.trim_end_matches('/');
        check_key(prefix)?;
        let dir = format!("{}/", prefix);

        let mut blobs = self.blobs.write().await;
        let before = blobs.len();
        blobs.retain(|key, _| !key.starts_with(&dir));

        tracing::debug!(prefix = %prefix, removed = before - blobs.len(), "Memory storage prefix deleted");
        Ok(())
    }

    async fn exists(&self, key: &str) -> StorageResult<bool> {
        check_key(key)?;
        Ok(self.blobs.read().await.contains_key(key))
    }

    async fn content_length(&self, key: &str) -> StorageResult<u64> {
        check_key(key)?;
        self.blobs
            .read()
            .await
            .get(key)
            .map(|data| data.len() as u64)
            .ok_or_else(|| StorageError::NotFound(key.to_string()))
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Memory
    }
}

#[cfg(all(test, feature = "storage-memory"))]
mod tests {
    use super::*;
    use futures::StreamExt;

    #[tokio::test]
    async fn test_memory_storage_roundtrip() {
        let storage = MemoryStorage::new();
        storage.write("files/a/x.txt", b"hello".to_vec()).await.unwrap();

        assert_eq!(storage.read("files/a/x.txt").await.unwrap(), b"hello".to_vec());
        assert_eq!(storage.content_length("files/a/x.txt").await.unwrap(), 5);
        assert!(storage.exists("files/a/x.txt").await.unwrap());

        storage.delete("files/a/x.txt").await.unwrap();
        assert!(!storage.exists("files/a/x.txt").await.unwrap());
        assert!(storage.is_empty().await);
    }

    #[tokio::test]
    async fn test_memory_storage_copy() {
        let storage = MemoryStorage::new();
        storage.write("files/a/x.txt", b"old".to_vec()).await.unwrap();
        storage.write("staging/a/y.txt", b"new".to_vec()).await.unwrap();

        storage.copy("staging/a/y.txt", "files/a/x.txt").await.unwrap();
        assert_eq!(storage.read("files/a/x.txt").await.unwrap(), b"new".to_vec());

        let missing = storage.copy("staging/a/none.txt", "files/a/x.txt").await;
        assert!(matches!(missing, Err(StorageError::NotFound(_))));
        assert_eq!(storage.read("files/a/x.txt").await.unwrap(), b"new".to_vec());
    }

    #[tokio::test]
    async fn test_memory_storage_stream_and_prefix() {
        let storage = MemoryStorage::new();
        storage.write("staging/a/1.pdf", b"one".to_vec()).await.unwrap();
        storage.write("files/a/r.pdf", b"two".to_vec()).await.unwrap();

        assert_eq!(
            storage.keys_with_prefix("staging/").await,
            vec!["staging/a/1.pdf".to_string()]
        );

        let mut stream = storage.read_stream("files/a/r.pdf").await.unwrap();
        let chunk = stream.next().await.unwrap().unwrap();
        assert_eq!(&chunk[..], b"two");
        assert!(stream.next().await.is_none());
    }

    #[tokio::test]
    async fn test_memory_storage_delete_prefix_stops_at_segment() {
        let storage = MemoryStorage::new();
        storage.write("staging/a/1.pdf", b"1".to_vec()).await.unwrap();
        storage.write("staging/a/2.pdf", b"2".to_vec()).await.unwrap();
        storage.write("staging/ab/3.pdf", b"3".to_vec()).await.unwrap();

        storage.delete_prefix("staging/a/").await.unwrap();
        assert_eq!(
            storage.keys_with_prefix("staging/").await,
            vec!["staging/ab/3.pdf".to_string()]
        );
    }

    #[tokio::test]
    async fn test_memory_storage_copy_within_deadline() {
        let storage = MemoryStorage::new();
        storage.write("staging/a/y.txt", b"new".to_vec()).await.unwrap();

        let deadline = std::time::Instant::now() + std::time::Duration::from_secs(5);
        storage
            .copy_within("staging/a/y.txt", "files/a/x.txt", deadline)
            .await
            .unwrap();
        assert_eq!(storage.read("files/a/x.txt").await.unwrap(), b"new".to_vec());
    }

    #[tokio::test]
    async fn test_memory_storage_rejects_bad_keys() {
        let storage = MemoryStorage::new();
        assert!(matches!(
            storage.write("../x", vec![1]).await,
            Err(StorageError::InvalidKey(_))
        ));
    }
}
