//! PWA Cache Storage Layer
//!
//! This crate provides the cache storage API used by the interceptor:
//! named partitions mapping request identities to stored responses,
//! with in-memory and local disk backends.

pub mod backend;
pub mod entry;
pub mod error;
pub mod local;
pub mod memory;

pub use backend::{CachePartition, CacheStorage, validate_partition_name};
pub use entry::{CachedResponse, RequestKey};
pub use error::StorageError;
pub use local::LocalCacheStorage;
pub use memory::MemoryCacheStorage;
