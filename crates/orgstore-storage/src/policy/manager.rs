use std::sync::Arc;
use std::time::Instant;

use orgstore_core::constants::PUBLIC_ACCESS_POLICY;
use orgstore_core::naming::{organization_policy_prefix, scoped_policy_name};
use orgstore_core::{Organization, ScopedRole, Space};
use tokio::sync::Mutex;

use super::document::{parse_statements, PolicyDocument, Statement};
use super::store::PolicyStore;
use super::templates::{render, PolicyTemplate, TemplateSource};
use crate::traits::{StorageError, StorageResult};

/// Outcome of creating the scoped policies of a space.
#[derive(Debug, Default)]
pub struct ScopedPolicies {
    /// Policies created by this call. Policies that already existed are not listed.
    pub created: Vec<String>,
    /// First failure, reported once every role was attempted.
    pub error: Option<StorageError>,
}

impl ScopedPolicies {
    pub fn into_result(self) -> StorageResult<Vec<String>> {
        match self.error {
            Some(e) => Err(e),
            None => Ok(self.created),
        }
    }
}

/// Creates, merges and removes the access policies of spaces.
///
/// Every space owns four scoped policies. Public spaces additionally contribute a
/// statement fragment to the shared `spc_all_public` aggregate, which is rewritten
/// under an in-process lock because the store has no partial update.
pub struct PolicyManager {
    store: Arc<dyn PolicyStore>,
    templates: Arc<dyn TemplateSource>,
    bucket: String,
    aggregate_lock: Mutex<()>,
}

impl PolicyManager {
    pub fn new(
        store: Arc<dyn PolicyStore>,
        templates: Arc<dyn TemplateSource>,
        bucket: impl Into<String>,
    ) -> Self {
        Self {
            store,
            templates,
            bucket: bucket.into(),
            aggregate_lock: Mutex::new(()),
        }
    }

    pub fn store(&self) -> &Arc<dyn PolicyStore> {
        &self.store
    }

    async fn rendered(&self, template: PolicyTemplate, space: &Space) -> StorageResult<String> {
        let text = self.templates.load(template).await?;
        Ok(render(&text, &self.bucket, space))
    }

    async fn space_statements(&self, space: &Space) -> StorageResult<Vec<Statement>> {
        let text = self.rendered(PolicyTemplate::SpacePublic, space).await?;
        parse_statements(&text)
    }

    /// Create the admin, trustee, user and supplier policies of a space.
    ///
    /// An existing policy is left as it is. A failed creation does not stop the
    /// remaining ones; the first failure is kept alongside the names that were created.
    pub async fn create_scoped_policies(&self, space: &Space) -> ScopedPolicies {
        let mut outcome = ScopedPolicies::default();

        for role in ScopedRole::ALL {
            let name = scoped_policy_name(space.organization_name(), &space.name, role);
            let result = async {
                let text = self.rendered(PolicyTemplate::for_role(role), space).await?;
                let document = PolicyDocument::parse(&text)?;
                self.store.create_policy(&name, &document).await
            }
            .await;

            match result {
                Ok(()) => {
                    tracing::debug!(policy = %name, "Scoped policy created");
                    outcome.created.push(name);
                }
                Err(StorageError::AlreadyExists(_)) => {
                    tracing::warn!(policy = %name, "Scoped policy already exists");
                }
                Err(e) => {
                    tracing::error!(
                        error = %e,
                        policy = %name,
                        organization = %space.organization_name(),
                        space = %space.name,
                        "Failed to create scoped policy"
                    );
                    outcome.error.get_or_insert(e);
                }
            }
        }
        outcome
    }

    /// Delete the named policies. Absent policies are skipped.
    pub async fn delete_policies(&self, names: &[String]) -> StorageResult<()> {
        for name in names {
            self.store.delete_policy(name).await?;
        }
        Ok(())
    }

    /// Delete all four scoped policies of a space. Absent policies are skipped.
    pub async fn delete_scoped_policies(&self, space: &Space) -> StorageResult<()> {
        for role in ScopedRole::ALL {
            let name = scoped_policy_name(space.organization_name(), &space.name, role);
            self.store.delete_policy(&name).await?;
        }
        tracing::debug!(
            organization = %space.organization_name(),
            space = %space.name,
            "Scoped policies deleted"
        );
        Ok(())
    }

    /// Delete every policy named with the organization's prefix.
    pub async fn delete_organization_policies(
        &self,
        organization: &Organization,
    ) -> StorageResult<usize> {
        let names = self
            .store
            .list_policies(&organization_policy_prefix(&organization.name))
            .await?;
        for name in &names {
            self.store.delete_policy(name).await?;
        }
        tracing::info!(
            organization = %organization.name,
            deleted = names.len(),
            "Organization policies deleted"
        );
        Ok(names.len())
    }

    /// Merge the space's public statements into the aggregate, creating it first when missing.
    /// Returns how many statements were added.
    pub async fn add_public_access(&self, space: &Space) -> StorageResult<usize> {
        let start = Instant::now();
        let _guard = self.aggregate_lock.lock().await;

        if self.store.list_policies(PUBLIC_ACCESS_POLICY).await?.is_empty() {
            let text = self.rendered(PolicyTemplate::AllPublic, space).await?;
            let skeleton = PolicyDocument::parse(&text)?;
            tracing::info!(policy = PUBLIC_ACCESS_POLICY, "Creating public access policy");
            self.store.create_policy(PUBLIC_ACCESS_POLICY, &skeleton).await?;
        }

        let mut aggregate = self.resolve_aggregate().await?;
        let fragment = self.space_statements(space).await?;
        let added = aggregate.merge(&fragment);
        if added == 0 {
            tracing::debug!(
                organization = %space.organization_name(),
                space = %space.name,
                "Public access already granted"
            );
            return Ok(0);
        }

        self.replace_aggregate(&aggregate).await?;
        tracing::info!(
            organization = %space.organization_name(),
            space = %space.name,
            statements = added,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Public access granted"
        );
        Ok(added)
    }

    /// Remove the space's public statements from the aggregate. Returns how many were removed.
    pub async fn remove_public_access(&self, space: &Space) -> StorageResult<usize> {
        let _guard = self.aggregate_lock.lock().await;

        let mut aggregate = self.resolve_aggregate().await?;
        let fragment = self.space_statements(space).await?;
        let removed = aggregate.subtract(&fragment);
        if removed > 0 {
            self.replace_aggregate(&aggregate).await?;
        }
        tracing::info!(
            organization = %space.organization_name(),
            space = %space.name,
            statements = removed,
            "Public access revoked"
        );
        Ok(removed)
    }

    /// Whether the aggregate currently holds the space's public statements.
    ///
    /// A missing aggregate means no space is public.
    pub async fn has_public_access(&self, space: &Space) -> StorageResult<bool> {
        let _guard = self.aggregate_lock.lock().await;

        if self.store.list_policies(PUBLIC_ACCESS_POLICY).await?.is_empty() {
            return Ok(false);
        }
        let aggregate = self.resolve_aggregate().await?;
        let fragment = self.space_statements(space).await?;
        Ok(aggregate.contains_all(&fragment))
    }

    /// Look up the aggregate, requiring exactly one match.
    async fn resolve_aggregate(&self) -> StorageResult<PolicyDocument> {
        let matches = self.store.list_policies(PUBLIC_ACCESS_POLICY).await?;
        if matches.len() != 1 {
            return Err(StorageError::PolicyAmbiguous {
                name: PUBLIC_ACCESS_POLICY.to_string(),
                matches: matches.len(),
            });
        }
        self.store
            .get_policy(&matches[0])
            .await?
            .ok_or_else(|| StorageError::PolicyAmbiguous {
                name: PUBLIC_ACCESS_POLICY.to_string(),
                matches: 0,
            })
    }

    async fn replace_aggregate(&self, document: &PolicyDocument) -> StorageResult<()> {
        self.store.delete_policy(PUBLIC_ACCESS_POLICY).await?;
        self.store.create_policy(PUBLIC_ACCESS_POLICY, document).await
    }
}
