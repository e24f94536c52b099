//! Prefix-emulated provider.
//!
//! Organizations and spaces are key prefixes inside one shared bucket. A virtual
//! folder is a zero-length marker object whose key is the prefix itself:
//!
//! - organization: `acme/`
//! - space: `acme/reports/`

use std::collections::BTreeSet;
use std::sync::Arc;

use async_trait::async_trait;
use orgstore_core::constants::{KEY_DELIMITER, LOADINGZONE};
use orgstore_core::naming::{organization_prefix, space_prefix};
use orgstore_core::{Confidentiality, Organization, Space};

use crate::bucket::ObjectBucket;
use crate::policy::PolicyManager;
use crate::traits::{StorageError, StorageProvider, StorageResult};
use crate::StorageBackend;

pub struct PrefixStorage {
    bucket: Arc<dyn ObjectBucket>,
    policies: Arc<PolicyManager>,
}

impl PrefixStorage {
    pub fn new(bucket: Arc<dyn ObjectBucket>, policies: Arc<PolicyManager>) -> Self {
        Self { bucket, policies }
    }

    pub fn policies(&self) -> &Arc<PolicyManager> {
        &self.policies
    }

    /// Create the marker object unless it exists. Returns whether it was created.
    async fn ensure_marker(&self, key: &str) -> StorageResult<bool> {
        if self.bucket.object_exists(key).await? {
            tracing::info!(
                bucket = %self.bucket.bucket_name(),
                key = %key,
                "Virtual folder already exists"
            );
            return Ok(false);
        }
        tracing::info!(
            bucket = %self.bucket.bucket_name(),
            key = %key,
            "Creating virtual folder"
        );
        self.bucket.create_empty_object(key).await?;
        Ok(true)
    }

    /// Names of the spaces that have at least one object under the organization.
    async fn space_names(&self, organization: &Organization) -> StorageResult<BTreeSet<String>> {
        let prefix = organization_prefix(&organization.name);
        let children = self.bucket.list_child_prefixes(&prefix).await?;
        Ok(children
            .iter()
            .filter_map(|child| child.strip_prefix(&prefix))
            .map(|rest| rest.trim_end_matches(KEY_DELIMITER))
            .filter(|name| !name.is_empty())
            .map(String::from)
            .collect())
    }
}

#[async_trait]
impl StorageProvider for PrefixStorage {
    async fn create_organization_storage(&self, organization: &Organization) -> StorageResult<()> {
        let prefix = organization_prefix(&organization.name);
        if self.bucket.prefix_exists(&prefix).await? {
            tracing::warn!(
                organization = %organization.name,
                bucket = %self.bucket.bucket_name(),
                prefix = %prefix,
                "Organization already exists"
            );
        }

        if self.ensure_marker(&prefix).await? {
            // the loadingzone is created together with the organization
            self.ensure_marker(&space_prefix(&organization.name, LOADINGZONE))
                .await?;
        }
        Ok(())
    }

    async fn create_loadingzone(&self, organization: &Organization) -> StorageResult<()> {
        self.ensure_marker(&space_prefix(&organization.name, LOADINGZONE))
            .await
            .map(|_| ())
    }

    async fn create_space_storage(&self, space: &Space) -> StorageResult<bool> {
        if space.is_loadingzone() {
            return Ok(false);
        }

        let org_prefix = organization_prefix(space.organization_name());
        if !self.bucket.prefix_exists(&org_prefix).await? {
            tracing::error!(
                organization = %space.organization_name(),
                space = %space.name,
                bucket = %self.bucket.bucket_name(),
                prefix = %org_prefix,
                "Space not created, organization does not exist"
            );
            return Err(StorageError::OrganizationStorageMissing {
                organization: space.organization_name().to_string(),
            });
        }

        let prefix = space_prefix(space.organization_name(), &space.name);
        let existed = self.bucket.prefix_exists(&prefix).await?;
        if existed {
            tracing::warn!(
                organization = %space.organization_name(),
                space = %space.name,
                prefix = %prefix,
                "Space already exists"
            );
        }
        self.ensure_marker(&prefix).await?;
        // a missing marker under a populated prefix does not make the space new
        Ok(!existed)
    }

    async fn delete_organization_storage(&self, organization: &Organization) -> StorageResult<()> {
        // Public statements of the organization's spaces must leave the aggregate too.
        for name in self.space_names(organization).await? {
            if name.eq_ignore_ascii_case(LOADINGZONE) {
                continue;
            }
            let space = Space::new(organization.clone(), name, Confidentiality::Public);
            if self.policies.has_public_access(&space).await? {
                self.policies.remove_public_access(&space).await?;
            }
        }

        let prefix = organization_prefix(&organization.name);
        tracing::info!(
            organization = %organization.name,
            bucket = %self.bucket.bucket_name(),
            prefix = %prefix,
            "Deleting all objects with prefix"
        );
        self.bucket.delete_objects_by_prefix(&prefix).await?;
        self.policies.delete_organization_policies(organization).await?;
        Ok(())
    }

    async fn delete_space_storage(&self, space: &Space) -> StorageResult<()> {
        let prefix = space_prefix(space.organization_name(), &space.name);
        tracing::info!(
            organization = %space.organization_name(),
            space = %space.name,
            bucket = %self.bucket.bucket_name(),
            prefix = %prefix,
            "Deleting all objects with prefix"
        );
        self.bucket.delete_objects_by_prefix(&prefix).await?;
        Ok(())
    }

    fn creates_loadingzone_with_organization(&self) -> bool {
        true
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::S3
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryBucket, InMemoryPolicyStore};
    use crate::policy::{EmbeddedTemplates, PolicyStore};

    fn storage() -> (PrefixStorage, Arc<InMemoryBucket>, Arc<InMemoryPolicyStore>) {
        let bucket = Arc::new(InMemoryBucket::new("tenants"));
        let store = Arc::new(InMemoryPolicyStore::new());
        let policies = Arc::new(PolicyManager::new(
            store.clone(),
            Arc::new(EmbeddedTemplates),
            "tenants",
        ));
        (PrefixStorage::new(bucket.clone(), policies), bucket, store)
    }

    #[tokio::test]
    async fn test_create_organization_creates_loadingzone() {
        let (storage, bucket, _) = storage();
        let acme = Organization::new("acme");

        storage.create_organization_storage(&acme).await.unwrap();
        assert!(bucket.object_exists("acme/").await.unwrap());
        assert!(bucket.object_exists("acme/loadingzone/").await.unwrap());

        storage.create_organization_storage(&acme).await.unwrap();
        assert_eq!(bucket.len().await, 2);
    }

    #[tokio::test]
    async fn test_space_without_organization_fails() {
        let (storage, bucket, _) = storage();
        let space = Space::new(Organization::new("acme"), "reports", Confidentiality::Internal);

        let err = storage.create_space_storage(&space).await.unwrap_err();
        assert!(matches!(err, StorageError::OrganizationStorageMissing { .. }));
        assert!(bucket.is_empty().await);
    }

    #[tokio::test]
    async fn test_loadingzone_space_is_noop() {
        let (storage, bucket, _) = storage();
        let acme = Organization::new("acme");
        storage.create_organization_storage(&acme).await.unwrap();

        let zone = Space::new(acme, "LoadingZone", Confidentiality::Internal);
        storage.create_space_storage(&zone).await.unwrap();
        assert_eq!(bucket.len().await, 2);
    }

    #[tokio::test]
    async fn test_create_space_reports_whether_it_is_new() {
        let (storage, bucket, _) = storage();
        let acme = Organization::new("acme");
        let reports = Space::new(acme.clone(), "reports", Confidentiality::Internal);
        storage.create_organization_storage(&acme).await.unwrap();

        assert!(storage.create_space_storage(&reports).await.unwrap());
        assert!(!storage.create_space_storage(&reports).await.unwrap());

        // objects without a marker still count as an existing space
        let raw = Space::new(acme, "raw", Confidentiality::Internal);
        bucket.put("acme/raw/2024/q1.csv").await;
        assert!(!storage.create_space_storage(&raw).await.unwrap());
        assert!(bucket.object_exists("acme/raw/").await.unwrap());
    }

    #[tokio::test]
    async fn test_space_names_come_from_child_prefixes() {
        let (storage, bucket, _) = storage();
        let acme = Organization::new("acme");
        storage.create_organization_storage(&acme).await.unwrap();
        bucket.put("acme/reports/2024/q1.csv").await;
        bucket.put("acme/reports/2024/q2.csv").await;
        bucket.put("acme/raw/").await;
        bucket.put("acme/readme.txt").await;

        let names: Vec<String> = storage.space_names(&acme).await.unwrap().into_iter().collect();
        assert_eq!(names, vec!["loadingzone", "raw", "reports"]);
    }

    #[tokio::test]
    async fn test_delete_absent_resources_succeeds() {
        let (storage, _, _) = storage();
        let acme = Organization::new("acme");
        let space = Space::new(acme.clone(), "reports", Confidentiality::Internal);

        storage.delete_space_storage(&space).await.unwrap();
        storage.delete_organization_storage(&acme).await.unwrap();
    }

    #[tokio::test]
    async fn test_delete_organization_cleans_public_statements() {
        let (storage, bucket, store) = storage();
        let acme = Organization::new("acme");
        let reports = Space::new(acme.clone(), "reports", Confidentiality::Public);
        storage.create_organization_storage(&acme).await.unwrap();
        storage.create_space_storage(&reports).await.unwrap();
        storage
            .policies()
            .create_scoped_policies(&reports)
            .await
            .into_result()
            .unwrap();
        storage.policies().add_public_access(&reports).await.unwrap();
        bucket.put("acme/reports/2024/q1.csv").await;

        storage.delete_organization_storage(&acme).await.unwrap();

        assert!(bucket.is_empty().await);
        assert!(store.list_policies("acme_").await.unwrap().is_empty());
        assert!(!storage.policies().has_public_access(&reports).await.unwrap());
    }
}
