use async_trait::async_trait;

use super::document::PolicyDocument;
use crate::traits::StorageResult;

/// Named policy persistence (an IAM-compatible service or an in-memory map).
///
/// Documents have no in-place update; a change is a delete followed by a create.
#[async_trait]
pub trait PolicyStore: Send + Sync {
    /// Create a policy. Fails with `StorageError::AlreadyExists` when the name is taken.
    async fn create_policy(&self, name: &str, document: &PolicyDocument) -> StorageResult<()>;

    /// Delete a policy. Deleting an absent policy succeeds.
    async fn delete_policy(&self, name: &str) -> StorageResult<()>;

    /// Names of all policies starting with `prefix`.
    async fn list_policies(&self, prefix: &str) -> StorageResult<Vec<String>>;

    /// Current document of a policy.
    async fn get_policy(&self, name: &str) -> StorageResult<Option<PolicyDocument>>;
}
