//! In-memory cache storage backend

use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::backend::{CachePartition, CacheStorage, validate_partition_name};
use crate::entry::{CachedResponse, RequestKey};
use crate::error::StorageError;

/// In-memory partition
pub struct MemoryPartition {
    name: String,
    entries: RwLock<HashMap<RequestKey, CachedResponse>>,
}

impl MemoryPartition {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            entries: RwLock::new(HashMap::new()),
        }
    }

    /// Number of stored entries
    pub fn len(&self) -> usize {
        self.entries.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.read().is_empty()
    }
}

#[async_trait]
impl CachePartition for MemoryPartition {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, key: RequestKey, response: CachedResponse) -> Result<(), StorageError> {
        debug!("Storing {} in partition {}", key, self.name);
        self.entries.write().insert(key, response);
        Ok(())
    }

    async fn lookup(&self, key: &RequestKey) -> Result<Option<CachedResponse>, StorageError> {
        Ok(self.entries.read().get(key).cloned())
    }

    async fn keys(&self) -> Result<Vec<RequestKey>, StorageError> {
        Ok(self.entries.read().keys().cloned().collect())
    }
}

/// In-memory cache storage
///
/// Partitions are kept in creation order, which is also the order
/// `lookup` searches them in. Nothing survives the process.
#[derive(Default)]
pub struct MemoryCacheStorage {
    partitions: RwLock<Vec<Arc<MemoryPartition>>>,
}

impl MemoryCacheStorage {
    pub fn new() -> Self {
        Self::default()
    }

    fn find(&self, name: &str) -> Option<Arc<MemoryPartition>> {
        self.partitions
            .read()
            .iter()
            .find(|p| p.name == name)
            .cloned()
    }
}

#[async_trait]
impl CacheStorage for MemoryCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn CachePartition>, StorageError> {
        validate_partition_name(name)?;

        let mut partitions = self.partitions.write();
        if let Some(existing) = partitions.iter().find(|p| p.name == name) {
            return Ok(existing.clone());
        }

        debug!("Creating partition {}", name);
        let partition = Arc::new(MemoryPartition::new(name));
        partitions.push(partition.clone());
        Ok(partition)
    }

    async fn has(&self, name: &str) -> Result<bool, StorageError> {
        Ok(self.find(name).is_some())
    }

    async fn lookup(&self, key: &RequestKey) -> Result<Option<CachedResponse>, StorageError> {
        let partitions = self.partitions.read();
        Ok(partitions
            .iter()
            .find_map(|p| p.entries.read().get(key).cloned()))
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        Ok(self
            .partitions
            .read()
            .iter()
            .map(|p| p.name.clone())
            .collect())
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        let mut partitions = self.partitions.write();
        let before = partitions.len();
        partitions.retain(|p| p.name != name);
        let deleted = partitions.len() != before;
        if deleted {
            debug!("Deleted partition {}", name);
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;
    use http::{HeaderMap, StatusCode};

    fn response(url: &str, body: &'static str) -> CachedResponse {
        CachedResponse::new(url, StatusCode::OK, HeaderMap::new(), Bytes::from(body))
    }

    #[tokio::test]
    async fn test_open_creates_once() {
        let storage = MemoryCacheStorage::new();

        storage.open("static-v1").await.unwrap();
        storage.open("static-v1").await.unwrap();
        storage.open("dynamic-v1").await.unwrap();

        assert_eq!(storage.keys().await.unwrap(), vec!["static-v1", "dynamic-v1"]);
        assert!(storage.has("static-v1").await.unwrap());
        assert!(!storage.has("static-v0").await.unwrap());
    }

    #[tokio::test]
    async fn test_put_overwrites_same_key() {
        let storage = MemoryCacheStorage::new();
        let partition = storage.open("dynamic-v1").await.unwrap();

        partition
            .put(RequestKey::get("/a.css"), response("/a.css", "old"))
            .await
            .unwrap();
        partition
            .put(RequestKey::get("/a.css"), response("/a.css", "new"))
            .await
            .unwrap();

        assert_eq!(partition.keys().await.unwrap().len(), 1);
        let found = storage.lookup(&RequestKey::get("/a.css")).await.unwrap().unwrap();
        assert_eq!(found.body, Bytes::from("new"));
    }

    #[tokio::test]
    async fn test_lookup_searches_in_creation_order() {
        let storage = MemoryCacheStorage::new();
        let first = storage.open("first").await.unwrap();
        let second = storage.open("second").await.unwrap();

        second
            .put(RequestKey::get("/x"), response("/x", "second"))
            .await
            .unwrap();
        assert_eq!(
            storage.lookup(&RequestKey::get("/x")).await.unwrap().unwrap().body,
            Bytes::from("second")
        );

        first
            .put(RequestKey::get("/x"), response("/x", "first"))
            .await
            .unwrap();
        assert_eq!(
            storage.lookup(&RequestKey::get("/x")).await.unwrap().unwrap().body,
            Bytes::from("first")
        );
    }

    #[tokio::test]
    async fn test_delete() {
        let storage = MemoryCacheStorage::new();
        let partition = storage.open("old").await.unwrap();
        partition
            .put(RequestKey::get("/x"), response("/x", "x"))
            .await
            .unwrap();

        assert!(storage.delete("old").await.unwrap());
        assert!(!storage.delete("old").await.unwrap());
        assert!(storage.lookup(&RequestKey::get("/x")).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_lookup_respects_method() {
        let storage = MemoryCacheStorage::new();
        let partition = storage.open("p").await.unwrap();
        partition
            .put(RequestKey::get("/form"), response("/form", "page"))
            .await
            .unwrap();

        let post = RequestKey::new(http::Method::POST, "/form");
        assert!(storage.lookup(&post).await.unwrap().is_none());
    }
}
