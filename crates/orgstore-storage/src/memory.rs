//! In-memory bucket and policy store.
//!
//! Used by tests and local development in place of S3 and IAM.

use std::collections::{BTreeMap, BTreeSet};

use async_trait::async_trait;
use orgstore_core::constants::KEY_DELIMITER;
use tokio::sync::RwLock;

use crate::bucket::ObjectBucket;
use crate::policy::{PolicyDocument, PolicyStore};
use crate::traits::{StorageError, StorageResult};

/// Object keys of a single bucket.
#[derive(Debug, Default)]
pub struct InMemoryBucket {
    name: String,
    keys: RwLock<BTreeSet<String>>,
}

impl InMemoryBucket {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            keys: RwLock::new(BTreeSet::new()),
        }
    }

    /// Add an object directly, bypassing the marker semantics.
    pub async fn put(&self, key: impl Into<String>) {
        self.keys.write().await.insert(key.into());
    }

    pub async fn len(&self) -> usize {
        self.keys.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.keys.read().await.is_empty()
    }
}

#[async_trait]
impl ObjectBucket for InMemoryBucket {
    fn bucket_name(&self) -> &str {
        &self.name
    }

    async fn prefix_exists(&self, prefix: &str) -> StorageResult<bool> {
        Ok(self.keys.read().await.iter().any(|k| k.starts_with(prefix)))
    }

    async fn object_exists(&self, key: &str) -> StorageResult<bool> {
        Ok(self.keys.read().await.contains(key))
    }

    async fn create_empty_object(&self, key: &str) -> StorageResult<()> {
        self.keys.write().await.insert(key.to_string());
        Ok(())
    }

    async fn delete_objects_by_prefix(&self, prefix: &str) -> StorageResult<usize> {
        let mut keys = self.keys.write().await;
        let before = keys.len();
        keys.retain(|k| !k.starts_with(prefix));
        Ok(before - keys.len())
    }

    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .keys
            .read()
            .await
            .iter()
            .filter(|k| k.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn list_child_prefixes(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let keys = self.keys.read().await;
        let children: BTreeSet<String> = keys
            .iter()
            .filter_map(|k| k.strip_prefix(prefix))
            .filter_map(|rest| {
                rest.find(KEY_DELIMITER)
                    .map(|end| format!("{}{}", prefix, &rest[..=end]))
            })
            .collect();
        Ok(children.into_iter().collect())
    }
}

/// Policies by name.
#[derive(Debug, Default)]
pub struct InMemoryPolicyStore {
    policies: RwLock<BTreeMap<String, PolicyDocument>>,
}

impl InMemoryPolicyStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn names(&self) -> Vec<String> {
        self.policies.read().await.keys().cloned().collect()
    }
}

#[async_trait]
impl PolicyStore for InMemoryPolicyStore {
    async fn create_policy(&self, name: &str, document: &PolicyDocument) -> StorageResult<()> {
        let mut policies = self.policies.write().await;
        if policies.contains_key(name) {
            return Err(StorageError::AlreadyExists(name.to_string()));
        }
        policies.insert(name.to_string(), document.clone());
        Ok(())
    }

    async fn delete_policy(&self, name: &str) -> StorageResult<()> {
        self.policies.write().await.remove(name);
        Ok(())
    }

    async fn list_policies(&self, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .policies
            .read()
            .await
            .keys()
            .filter(|name| name.starts_with(prefix))
            .cloned()
            .collect())
    }

    async fn get_policy(&self, name: &str) -> StorageResult<Option<PolicyDocument>> {
        Ok(self.policies.read().await.get(name).cloned())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_bucket_prefix_operations() {
        let bucket = InMemoryBucket::new("tenants");
        bucket.create_empty_object("acme/").await.unwrap();
        bucket.put("acme/reports/q1.csv").await;
        bucket.put("acme2/").await;

        assert!(bucket.prefix_exists("acme/").await.unwrap());
        assert!(!bucket.object_exists("acme/reports/").await.unwrap());
        assert_eq!(bucket.list_keys("acme/").await.unwrap().len(), 2);
        assert_eq!(bucket.delete_objects_by_prefix("acme/").await.unwrap(), 2);
        assert!(bucket.object_exists("acme2/").await.unwrap());
    }

    #[tokio::test]
    async fn test_bucket_lists_child_prefixes_only() {
        let bucket = InMemoryBucket::new("tenants");
        bucket.put("acme/").await;
        bucket.put("acme/reports/").await;
        bucket.put("acme/reports/2024/q1.csv").await;
        bucket.put("acme/reports/2024/q2.csv").await;
        bucket.put("acme/raw/").await;
        bucket.put("acme/readme.txt").await;

        assert_eq!(
            bucket.list_child_prefixes("acme/").await.unwrap(),
            vec!["acme/raw/", "acme/reports/"]
        );
        assert_eq!(
            bucket.list_child_prefixes("acme/reports/").await.unwrap(),
            vec!["acme/reports/2024/"]
        );
        assert!(bucket.list_child_prefixes("other/").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_policy_store_rejects_duplicates() {
        let store = InMemoryPolicyStore::new();
        let doc = PolicyDocument::default();
        store.create_policy("acme_reports_user", &doc).await.unwrap();

        let err = store.create_policy("acme_reports_user", &doc).await.unwrap_err();
        assert!(matches!(err, StorageError::AlreadyExists(_)));

        store.delete_policy("acme_reports_user").await.unwrap();
        store.delete_policy("acme_reports_user").await.unwrap();
        assert!(store.get_policy("acme_reports_user").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_policy_store_lists_by_prefix() {
        let store = InMemoryPolicyStore::new();
        let doc = PolicyDocument::default();
        for name in ["acme_a_admin", "acme_b_user", "other_a_admin", "spc_all_public"] {
            store.create_policy(name, &doc).await.unwrap();
        }
        assert_eq!(
            store.list_policies("acme_").await.unwrap(),
            vec!["acme_a_admin", "acme_b_user"]
        );
    }
}
