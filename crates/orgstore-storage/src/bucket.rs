//! Object bucket abstraction used by the prefix-emulated provider.

use async_trait::async_trait;

use crate::traits::StorageResult;

/// The handful of object operations needed to emulate folders with key prefixes.
#[async_trait]
pub trait ObjectBucket: Send + Sync {
    fn bucket_name(&self) -> &str;

    /// True when at least one object key starts with `prefix`.
    async fn prefix_exists(&self, prefix: &str) -> StorageResult<bool>;

    async fn object_exists(&self, key: &str) -> StorageResult<bool>;

    /// Write a zero-length object, used as a virtual folder marker.
    async fn create_empty_object(&self, key: &str) -> StorageResult<()>;

    /// Delete every object under `prefix`. Returns the number of deleted objects.
    async fn delete_objects_by_prefix(&self, prefix: &str) -> StorageResult<usize>;

    /// Every object key under `prefix`.
    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Immediate children of `prefix` as `/`-terminated prefixes, without listing
    /// the objects below them.
    async fn list_child_prefixes(&self, prefix: &str) -> StorageResult<Vec<String>>;
}
