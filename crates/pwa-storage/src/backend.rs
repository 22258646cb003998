//! Cache storage traits

use async_trait::async_trait;
use std::sync::Arc;

use crate::entry::{CachedResponse, RequestKey};
use crate::error::StorageError;

/// A single named cache partition
///
/// Holds at most one response per request identity; a later `put` for the
/// same key replaces the earlier one.
#[async_trait]
pub trait CachePartition: Send + Sync {
    /// Partition name
    fn name(&self) -> &str;

    /// Store a response, replacing any previous entry for the key
    async fn put(&self, key: RequestKey, response: CachedResponse) -> Result<(), StorageError>;

    /// Look up the response stored for a key
    async fn lookup(&self, key: &RequestKey) -> Result<Option<CachedResponse>, StorageError>;

    /// List the keys stored in this partition
    async fn keys(&self) -> Result<Vec<RequestKey>, StorageError>;
}

/// Cache storage trait
///
/// Implementations manage a set of named partitions. Partitions are created
/// on first open and live until deleted.
#[async_trait]
pub trait CacheStorage: Send + Sync {
    /// Open a partition, creating it if absent
    async fn open(&self, name: &str) -> Result<Arc<dyn CachePartition>, StorageError>;

    /// Check whether a partition exists
    async fn has(&self, name: &str) -> Result<bool, StorageError>;

    /// Search every partition for a key, in partition order
    async fn lookup(&self, key: &RequestKey) -> Result<Option<CachedResponse>, StorageError>;

    /// List partition names
    async fn keys(&self) -> Result<Vec<String>, StorageError>;

    /// Delete a partition and all of its entries.
    /// Returns `false` if the partition did not exist.
    async fn delete(&self, name: &str) -> Result<bool, StorageError>;
}

/// Validate a partition name so it is usable as a single path component
pub fn validate_partition_name(name: &str) -> Result<(), StorageError> {
    if name.is_empty() || name == "." || name == ".." {
        return Err(StorageError::InvalidName(name.to_string()));
    }

    if name.contains(['/', '\\', '\0']) {
        return Err(StorageError::InvalidName(name.to_string()));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_partition_name() {
        assert!(validate_partition_name("static-pwa-v10").is_ok());
        assert!(validate_partition_name("dynamic-pwa-v10").is_ok());

        assert!(validate_partition_name("").is_err());
        assert!(validate_partition_name("..").is_err());
        assert!(validate_partition_name("a/b").is_err());
        assert!(validate_partition_name("a\\b").is_err());
    }
}
