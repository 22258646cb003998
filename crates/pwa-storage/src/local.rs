//! Local disk cache storage backend

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use http::{HeaderMap, HeaderName, HeaderValue, Method, StatusCode};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::fs;
use tracing::{debug, info, warn};

use crate::backend::{CachePartition, CacheStorage, validate_partition_name};
use crate::entry::{CachedResponse, RequestKey};
use crate::error::StorageError;

/// On-disk metadata for a cached response
///
/// An entry file holds this as one line of JSON followed by the raw body.
#[derive(Debug, Serialize, Deserialize)]
struct EntryMeta {
    method: String,
    url: String,
    status: u16,
    headers: Vec<(String, String)>,
    body_len: usize,
    stored_at: DateTime<Utc>,
}

impl EntryMeta {
    fn from_entry(key: &RequestKey, response: &CachedResponse) -> Self {
        let headers = response
            .headers
            .iter()
            .filter_map(|(name, value)| {
                value
                    .to_str()
                    .ok()
                    .map(|v| (name.as_str().to_string(), v.to_string()))
            })
            .collect();

        Self {
            method: key.method.as_str().to_string(),
            url: key.url.clone(),
            status: response.status.as_u16(),
            headers,
            body_len: response.body.len(),
            stored_at: response.stored_at,
        }
    }

    /// Split an entry file into its metadata and body
    fn decode(data: Vec<u8>) -> Result<(Self, Bytes), StorageError> {
        let mut data = Bytes::from(data);
        let Some(split) = data.iter().position(|b| *b == b'\n') else {
            return Err(StorageError::Backend("Entry has no metadata line".to_string()));
        };
        let meta: EntryMeta = serde_json::from_slice(&data[..split])?;
        let body = data.split_off(split + 1);
        if body.len() != meta.body_len {
            return Err(StorageError::Backend(format!(
                "Entry {} is truncated ({} of {} body bytes)",
                meta.url,
                body.len(),
                meta.body_len
            )));
        }
        Ok((meta, body))
    }

    fn key(&self) -> Result<RequestKey, StorageError> {
        let method = Method::from_bytes(self.method.as_bytes())
            .map_err(|_| StorageError::Backend(format!("Invalid method: {}", self.method)))?;
        Ok(RequestKey::new(method, self.url.clone()))
    }

    fn into_response(self, body: Bytes) -> Result<CachedResponse, StorageError> {
        let status = StatusCode::from_u16(self.status)
            .map_err(|_| StorageError::Backend(format!("Invalid status: {}", self.status)))?;

        let mut headers = HeaderMap::new();
        for (name, value) in &self.headers {
            if let (Ok(name), Ok(value)) = (
                HeaderName::from_bytes(name.as_bytes()),
                HeaderValue::from_str(value),
            ) {
                headers.append(name, value);
            }
        }

        Ok(CachedResponse {
            url: self.url,
            status,
            headers,
            body,
            stored_at: self.stored_at,
        })
    }
}

const ENTRY_EXTENSION: &str = "entry";

/// Partition stored as a directory of `<key digest>.entry` files
pub struct LocalPartition {
    name: String,
    path: PathBuf,
}

impl LocalPartition {
    fn entry_path(&self, key: &RequestKey) -> PathBuf {
        self.path.join(format!("{}.{}", key.digest(), ENTRY_EXTENSION))
    }
}

/// Write a file atomically using a uniquely named temp file
async fn write_atomic(path: &Path, data: &[u8]) -> Result<(), StorageError> {
    let temp_path = path.with_extension(format!("{}.tmp", uuid::Uuid::new_v4()));
    fs::write(&temp_path, data).await?;
    if let Err(e) = fs::rename(&temp_path, path).await {
        let _ = fs::remove_file(&temp_path).await;
        return Err(StorageError::Io(e));
    }
    Ok(())
}

/// Read a file, mapping a missing file to `None`
async fn read_optional(path: &Path) -> Result<Option<Vec<u8>>, StorageError> {
    match fs::read(path).await {
        Ok(data) => Ok(Some(data)),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
        Err(e) => Err(StorageError::Io(e)),
    }
}

#[async_trait]
impl CachePartition for LocalPartition {
    fn name(&self) -> &str {
        &self.name
    }

    async fn put(&self, key: RequestKey, response: CachedResponse) -> Result<(), StorageError> {
        debug!("Writing {} to {:?}", key, self.path);

        // Metadata and body share one file, so a single rename publishes both
        let mut data = serde_json::to_vec(&EntryMeta::from_entry(&key, &response))?;
        data.push(b'\n');
        data.extend_from_slice(&response.body);

        write_atomic(&self.entry_path(&key), &data).await
    }

    async fn lookup(&self, key: &RequestKey) -> Result<Option<CachedResponse>, StorageError> {
        let Some(data) = read_optional(&self.entry_path(key)).await? else {
            return Ok(None);
        };

        match EntryMeta::decode(data) {
            Ok((meta, body)) => meta.into_response(body).map(Some),
            Err(e) => {
                warn!("Ignoring unreadable cache entry {} in {}: {}", key, self.name, e);
                Ok(None)
            }
        }
    }

    async fn keys(&self) -> Result<Vec<RequestKey>, StorageError> {
        let mut keys = Vec::new();
        let mut dir = match fs::read_dir(&self.path).await {
            Ok(dir) => dir,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(keys),
            Err(e) => return Err(StorageError::Io(e)),
        };

        while let Some(entry) = dir.next_entry().await? {
            let path = entry.path();
            if path.extension().and_then(|e| e.to_str()) != Some(ENTRY_EXTENSION) {
                continue;
            }
            let Some(data) = read_optional(&path).await? else {
                continue;
            };
            match EntryMeta::decode(data) {
                Ok((meta, _)) => keys.push(meta.key()?),
                Err(e) => warn!("Skipping unreadable cache entry {:?}: {}", path, e),
            }
        }

        Ok(keys)
    }
}

/// Local disk cache storage
///
/// Each partition is a directory under `<base_path>`. Partitions survive
/// process restarts and are searched in name order by `lookup`.
pub struct LocalCacheStorage {
    base_path: PathBuf,
}

impl LocalCacheStorage {
    /// Create a new local storage backend
    pub async fn new(base_path: impl AsRef<Path>) -> Result<Self, StorageError> {
        let base_path = base_path.as_ref().to_path_buf();
        fs::create_dir_all(&base_path).await?;

        info!("Initialized local cache storage at {:?}", base_path);

        Ok(Self { base_path })
    }

    fn partition(&self, name: &str) -> Result<LocalPartition, StorageError> {
        validate_partition_name(name)?;
        Ok(LocalPartition {
            name: name.to_string(),
            path: self.base_path.join(name),
        })
    }
}

#[async_trait]
impl CacheStorage for LocalCacheStorage {
    async fn open(&self, name: &str) -> Result<Arc<dyn CachePartition>, StorageError> {
        let partition = self.partition(name)?;
        fs::create_dir_all(&partition.path).await?;
        Ok(Arc::new(partition))
    }

    async fn has(&self, name: &str) -> Result<bool, StorageError> {
        let partition = self.partition(name)?;
        Ok(fs::try_exists(&partition.path).await?)
    }

    async fn lookup(&self, key: &RequestKey) -> Result<Option<CachedResponse>, StorageError> {
        for name in self.keys().await? {
            if let Some(response) = self.partition(&name)?.lookup(key).await? {
                return Ok(Some(response));
            }
        }
        Ok(None)
    }

    async fn keys(&self) -> Result<Vec<String>, StorageError> {
        let mut names = Vec::new();
        let mut dir = fs::read_dir(&self.base_path).await?;

        while let Some(entry) = dir.next_entry().await? {
            if entry.file_type().await?.is_dir() {
                names.push(entry.file_name().to_string_lossy().to_string());
            }
        }

        names.sort();
        Ok(names)
    }

    async fn delete(&self, name: &str) -> Result<bool, StorageError> {
        let partition = self.partition(name)?;
        debug!("Deleting partition at {:?}", partition.path);

        match fs::remove_dir_all(&partition.path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(StorageError::Io(e)),
        }
    }
}
