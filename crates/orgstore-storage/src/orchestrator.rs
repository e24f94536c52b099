//! Organization and space lifecycle sequencing.

use std::collections::HashMap;
use std::sync::{Arc, Mutex as SyncMutex, MutexGuard as SyncMutexGuard, PoisonError};
use std::time::Instant;

use orgstore_core::naming::{validate_organization_name, validate_space_name};
use orgstore_core::{Confidentiality, Organization, PolicyFailureMode, Space};
use tokio::sync::{Mutex, OwnedMutexGuard};

use crate::policy::PolicyManager;
use crate::traits::{StorageProvider, StorageResult};
use crate::StorageBackend;

/// One mutex per key, created on first use and dropped with its last holder.
#[derive(Default)]
struct KeyedLocks {
    locks: SyncMutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl KeyedLocks {
    fn entries(&self) -> SyncMutexGuard<'_, HashMap<String, Arc<Mutex<()>>>> {
        self.locks.lock().unwrap_or_else(PoisonError::into_inner)
    }

    async fn lock(&self, key: &str) -> KeyGuard<'_> {
        let lock = self.entries().entry(key.to_string()).or_default().clone();
        KeyGuard {
            locks: self,
            key: key.to_string(),
            guard: Some(lock.lock_owned().await),
        }
    }

    #[cfg(test)]
    fn len(&self) -> usize {
        self.entries().len()
    }
}

/// Holds one key of [`KeyedLocks`]. The map entry goes away once nobody holds or awaits it.
struct KeyGuard<'a> {
    locks: &'a KeyedLocks,
    key: String,
    guard: Option<OwnedMutexGuard<()>>,
}

impl Drop for KeyGuard<'_> {
    fn drop(&mut self) {
        self.guard.take();
        let mut entries = self.locks.entries();
        // the map's own reference is the last one when no task is waiting
        if entries
            .get(&self.key)
            .is_some_and(|lock| Arc::strong_count(lock) == 1)
        {
            entries.remove(&self.key);
        }
    }
}

/// What one `create_space_storage` call created, and therefore may roll back.
#[derive(Debug, Default)]
struct CreatedForSpace {
    storage: bool,
    scoped_policies: Vec<String>,
    public_access: bool,
}

/// Facade over one storage provider and, for the prefix-emulated backend, the policy manager.
///
/// Operations on the same organization are serialized; operations on different
/// organizations run concurrently.
pub struct StorageOrchestrator {
    provider: Arc<dyn StorageProvider>,
    policies: Option<Arc<PolicyManager>>,
    failure_mode: PolicyFailureMode,
    locks: KeyedLocks,
}

impl StorageOrchestrator {
    pub fn new(provider: Arc<dyn StorageProvider>) -> Self {
        Self {
            provider,
            policies: None,
            failure_mode: PolicyFailureMode::default(),
            locks: KeyedLocks::default(),
        }
    }

    pub fn with_policies(mut self, policies: Arc<PolicyManager>) -> Self {
        self.policies = Some(policies);
        self
    }

    pub fn with_failure_mode(mut self, failure_mode: PolicyFailureMode) -> Self {
        self.failure_mode = failure_mode;
        self
    }

    pub fn backend_type(&self) -> StorageBackend {
        self.provider.backend_type()
    }

    pub async fn create_organization_storage(&self, organization_name: &str) -> StorageResult<()> {
        validate_organization_name(organization_name)?;
        let organization = Organization::new(organization_name);
        let _guard = self.locks.lock(organization_name).await;
        let start = Instant::now();

        self.provider
            .create_organization_storage(&organization)
            .await?;
        if !self.provider.creates_loadingzone_with_organization() {
            self.provider.create_loadingzone(&organization).await?;
        }

        tracing::info!(
            organization = %organization_name,
            backend = %self.provider.backend_type(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Organization storage created"
        );
        Ok(())
    }

    pub async fn create_space_storage(
        &self,
        organization_name: &str,
        space_name: &str,
        confidentiality: Confidentiality,
    ) -> StorageResult<()> {
        validate_organization_name(organization_name)?;
        validate_space_name(space_name)?;
        let space = Space::new(
            Organization::new(organization_name),
            space_name,
            confidentiality,
        );
        let _guard = self.locks.lock(organization_name).await;
        let start = Instant::now();

        let storage_created = self.provider.create_space_storage(&space).await?;

        if !space.is_loadingzone() {
            if let Some(policies) = &self.policies {
                self.apply_policies(policies, &space, storage_created)
                    .await?;
            }
        }

        tracing::info!(
            organization = %organization_name,
            space = %space_name,
            confidentiality = %confidentiality,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Space storage created"
        );
        Ok(())
    }

    /// Create the scoped policies and, for public spaces, merge the public statements.
    /// Both steps run even when the other fails.
    async fn apply_policies(
        &self,
        policies: &PolicyManager,
        space: &Space,
        storage_created: bool,
    ) -> StorageResult<()> {
        let scoped = policies.create_scoped_policies(space).await;
        let mut created = CreatedForSpace {
            storage: storage_created,
            scoped_policies: scoped.created,
            public_access: false,
        };
        let mut first_error = scoped.error;

        if space.is_public() {
            match policies.add_public_access(space).await {
                Ok(added) => created.public_access = added > 0,
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        organization = %space.organization_name(),
                        space = %space.name,
                        "Failed to grant public access"
                    );
                    first_error.get_or_insert(e);
                }
            }
        }

        let Some(err) = first_error else {
            return Ok(());
        };

        tracing::error!(
            error = %err,
            organization = %space.organization_name(),
            space = %space.name,
            failure_mode = ?self.failure_mode,
            "Error creating policies for space"
        );

        match self.failure_mode {
            PolicyFailureMode::Log => Ok(()),
            PolicyFailureMode::Rollback => {
                self.rollback_space(policies, space, &created).await;
                Err(err)
            }
        }
    }

    /// Best-effort removal of what this call created. Pre-existing storage,
    /// policies and public statements stay.
    async fn rollback_space(
        &self,
        policies: &PolicyManager,
        space: &Space,
        created: &CreatedForSpace,
    ) {
        if created.public_access {
            if let Err(e) = policies.remove_public_access(space).await {
                tracing::error!(error = %e, space = %space.name, "Rollback of public access failed");
            }
        }
        if let Err(e) = policies.delete_policies(&created.scoped_policies).await {
            tracing::error!(error = %e, space = %space.name, "Rollback of scoped policies failed");
        }
        if created.storage {
            if let Err(e) = self.provider.delete_space_storage(space).await {
                tracing::error!(error = %e, space = %space.name, "Rollback of space storage failed");
            }
        }
        tracing::warn!(
            organization = %space.organization_name(),
            space = %space.name,
            storage = created.storage,
            policies = created.scoped_policies.len(),
            public_access = created.public_access,
            "Space creation rolled back"
        );
    }

    pub async fn delete_organization_storage(&self, organization_name: &str) -> StorageResult<()> {
        validate_organization_name(organization_name)?;
        let organization = Organization::new(organization_name);
        let _guard = self.locks.lock(organization_name).await;
        let start = Instant::now();

        self.provider
            .delete_organization_storage(&organization)
            .await?;

        tracing::info!(
            organization = %organization_name,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Organization storage deleted"
        );
        Ok(())
    }

    /// Delete a space. Whether it was public is read from the public access aggregate.
    pub async fn delete_space_storage(
        &self,
        organization_name: &str,
        space_name: &str,
    ) -> StorageResult<()> {
        validate_organization_name(organization_name)?;
        validate_space_name(space_name)?;
        let space = Space::new(
            Organization::new(organization_name),
            space_name,
            Confidentiality::default(),
        );
        let _guard = self.locks.lock(organization_name).await;
        let start = Instant::now();

        let policies = self.policies.as_ref().filter(|_| !space.is_loadingzone());

        if let Some(policies) = policies {
            if policies.has_public_access(&space).await? {
                policies.remove_public_access(&space).await?;
            }
        }

        self.provider.delete_space_storage(&space).await?;

        if let Some(policies) = policies {
            policies.delete_scoped_policies(&space).await?;
        }

        tracing::info!(
            organization = %organization_name,
            space = %space_name,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Space storage deleted"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::{InMemoryBucket, InMemoryPolicyStore};
    use crate::policy::{
        EmbeddedTemplates, PolicyDocument, PolicyStore, PolicyTemplate, TemplateSource,
    };
    use crate::prefix::PrefixStorage;
    use crate::traits::StorageError;
    use crate::ObjectBucket;
    use async_trait::async_trait;

    struct NoSupplierTemplate;

    #[async_trait]
    impl TemplateSource for NoSupplierTemplate {
        async fn load(&self, template: PolicyTemplate) -> StorageResult<String> {
            if template == PolicyTemplate::SpaceSupplier {
                return Err(StorageError::TemplateLoad {
                    name: template.file_name().to_string(),
                    reason: "not found".to_string(),
                });
            }
            EmbeddedTemplates.load(template).await
        }
    }

    fn orchestrator(
        templates: Arc<dyn TemplateSource>,
        failure_mode: PolicyFailureMode,
    ) -> (StorageOrchestrator, Arc<InMemoryBucket>, Arc<InMemoryPolicyStore>) {
        let bucket = Arc::new(InMemoryBucket::new("tenants"));
        let store = Arc::new(InMemoryPolicyStore::new());
        let policies = Arc::new(PolicyManager::new(store.clone(), templates, "tenants"));
        let provider = Arc::new(PrefixStorage::new(bucket.clone(), policies.clone()));
        let orchestrator = StorageOrchestrator::new(provider)
            .with_policies(policies)
            .with_failure_mode(failure_mode);
        (orchestrator, bucket, store)
    }

    #[tokio::test]
    async fn test_invalid_names_rejected_before_backend() {
        let (orchestrator, bucket, _) =
            orchestrator(Arc::new(EmbeddedTemplates), PolicyFailureMode::Log);

        let err = orchestrator.create_organization_storage("").await.unwrap_err();
        assert!(matches!(err, StorageError::InvalidName(_)));
        let err = orchestrator
            .create_space_storage("acme", "re_ports", Confidentiality::Public)
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::InvalidName(_)));
        assert!(bucket.is_empty().await);
    }

    #[tokio::test]
    async fn test_policy_failure_logged_by_default() {
        let (orchestrator, bucket, store) =
            orchestrator(Arc::new(NoSupplierTemplate), PolicyFailureMode::Log);
        orchestrator.create_organization_storage("acme").await.unwrap();

        orchestrator
            .create_space_storage("acme", "reports", Confidentiality::Internal)
            .await
            .unwrap();

        assert!(bucket.object_exists("acme/reports/").await.unwrap());
        assert_eq!(store.list_policies("acme_reports_").await.unwrap().len(), 3);
    }

    #[tokio::test]
    async fn test_policy_failure_rolls_back_when_configured() {
        let (orchestrator, bucket, store) =
            orchestrator(Arc::new(NoSupplierTemplate), PolicyFailureMode::Rollback);
        orchestrator.create_organization_storage("acme").await.unwrap();

        let err = orchestrator
            .create_space_storage("acme", "reports", Confidentiality::Public)
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::TemplateLoad { .. }));
        assert!(!bucket.prefix_exists("acme/reports/").await.unwrap());
        assert!(store.list_policies("acme_reports_").await.unwrap().is_empty());
        let aggregate = store.get_policy("spc_all_public").await.unwrap().unwrap();
        assert!(!aggregate.to_json().unwrap().contains("acme/reports/"));
    }

    #[tokio::test]
    async fn test_public_space_reaches_aggregate_when_one_policy_fails() {
        let (orchestrator, _, store) =
            orchestrator(Arc::new(NoSupplierTemplate), PolicyFailureMode::Log);
        orchestrator.create_organization_storage("acme").await.unwrap();

        orchestrator
            .create_space_storage("acme", "reports", Confidentiality::Public)
            .await
            .unwrap();

        assert_eq!(store.list_policies("acme_reports_").await.unwrap().len(), 3);
        let aggregate = store.get_policy("spc_all_public").await.unwrap().unwrap();
        assert!(aggregate.to_json().unwrap().contains("acme/reports/*"));
    }

    #[tokio::test]
    async fn test_rollback_keeps_what_existed_before() {
        let (orchestrator, bucket, store) =
            orchestrator(Arc::new(NoSupplierTemplate), PolicyFailureMode::Rollback);
        orchestrator.create_organization_storage("acme").await.unwrap();

        // a space created earlier with a complete template set
        let reports = Space::new(Organization::new("acme"), "reports", Confidentiality::Public);
        let earlier = PolicyManager::new(store.clone(), Arc::new(EmbeddedTemplates), "tenants");
        bucket.put("acme/reports/").await;
        bucket.put("acme/reports/2024/q1.csv").await;
        store
            .create_policy("acme_reports_admin", &PolicyDocument::default())
            .await
            .unwrap();
        earlier.add_public_access(&reports).await.unwrap();

        let err = orchestrator
            .create_space_storage("acme", "reports", Confidentiality::Public)
            .await
            .unwrap_err();

        assert!(matches!(err, StorageError::TemplateLoad { .. }));
        assert!(bucket.object_exists("acme/reports/2024/q1.csv").await.unwrap());
        assert_eq!(
            store.list_policies("acme_reports_").await.unwrap(),
            vec!["acme_reports_admin"]
        );
        assert!(earlier.has_public_access(&reports).await.unwrap());
    }

    #[tokio::test]
    async fn test_loadingzone_space_skips_policies() {
        let (orchestrator, _, store) =
            orchestrator(Arc::new(EmbeddedTemplates), PolicyFailureMode::Log);
        orchestrator.create_organization_storage("acme").await.unwrap();

        orchestrator
            .create_space_storage("acme", "loadingzone", Confidentiality::Public)
            .await
            .unwrap();
        orchestrator
            .delete_space_storage("acme", "loadingzone")
            .await
            .unwrap();
        assert!(store.names().await.is_empty());
    }

    #[tokio::test]
    async fn test_delete_space_leaves_other_public_spaces() {
        let (orchestrator, _, store) =
            orchestrator(Arc::new(EmbeddedTemplates), PolicyFailureMode::Log);
        orchestrator.create_organization_storage("acme").await.unwrap();
        for name in ["reports", "maps"] {
            orchestrator
                .create_space_storage("acme", name, Confidentiality::Public)
                .await
                .unwrap();
        }

        orchestrator.delete_space_storage("acme", "reports").await.unwrap();

        let aggregate: PolicyDocument = store.get_policy("spc_all_public").await.unwrap().unwrap();
        let json = aggregate.to_json().unwrap();
        assert!(!json.contains("acme/reports/"));
        assert!(json.contains("acme/maps/"));
    }

    #[tokio::test]
    async fn test_concurrent_public_spaces_all_land_in_aggregate() {
        let (orchestrator, _, store) =
            orchestrator(Arc::new(EmbeddedTemplates), PolicyFailureMode::Log);
        let orchestrator = Arc::new(orchestrator);
        for org in ["acme", "globex", "initech"] {
            orchestrator.create_organization_storage(org).await.unwrap();
        }

        let mut tasks = Vec::new();
        for org in ["acme", "globex", "initech"] {
            let orchestrator = orchestrator.clone();
            tasks.push(tokio::spawn(async move {
                orchestrator
                    .create_space_storage(org, "reports", Confidentiality::Public)
                    .await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let aggregate = store.get_policy("spc_all_public").await.unwrap().unwrap();
        // skeleton statement plus two per space
        assert_eq!(aggregate.statements.len(), 7);
        assert_eq!(orchestrator.locks.len(), 0);
    }

    #[tokio::test]
    async fn test_lock_entries_released_after_operations() {
        let (orchestrator, _, _) =
            orchestrator(Arc::new(EmbeddedTemplates), PolicyFailureMode::Log);

        for org in ["acme", "globex", "initech"] {
            orchestrator.create_organization_storage(org).await.unwrap();
            orchestrator
                .create_space_storage(org, "reports", Confidentiality::Internal)
                .await
                .unwrap();
            orchestrator.delete_organization_storage(org).await.unwrap();
        }
        orchestrator.create_organization_storage("").await.unwrap_err();

        assert_eq!(orchestrator.locks.len(), 0);

        let held = orchestrator.locks.lock("acme").await;
        assert_eq!(orchestrator.locks.len(), 1);
        drop(held);
        assert_eq!(orchestrator.locks.len(), 0);
    }
}
