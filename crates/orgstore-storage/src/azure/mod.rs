//! Managed cloud blob provider.
//!
//! An organization is one storage account, a space is one blob container inside
//! it. Account creation is asynchronous on the provider side, so container
//! creation polls the account's provisioning state under the retry executor.

pub mod client;
pub mod error;

use std::sync::Arc;

use async_trait::async_trait;
use orgstore_core::constants::LOADINGZONE;
use orgstore_core::{AzureSettings, Organization, Space};

pub use client::{
    AccountManager, ArmClient, BlobServiceProperties, LifecyclePolicy, ProvisioningState,
    StorageAccount,
};
pub use error::{parse_management_failure, FailureKind, ManagementFailure};

use crate::retry::RetryExecutor;
use crate::traits::{StorageError, StorageProvider, StorageResult};
use crate::StorageBackend;

pub struct AzureStorage {
    accounts: Arc<dyn AccountManager>,
    settings: AzureSettings,
    retry: RetryExecutor,
}

impl AzureStorage {
    pub fn new(
        accounts: Arc<dyn AccountManager>,
        settings: AzureSettings,
        retry: RetryExecutor,
    ) -> Self {
        Self {
            accounts,
            settings,
            retry,
        }
    }

    async fn wait_for_account(&self, name: &str) -> StorageResult<()> {
        self.retry
            .run("provision storage account", |_| async move {
                match self.accounts.find_account(name).await? {
                    Some(account) if account.provisioning_state == ProvisioningState::Succeeded => {
                        Ok(())
                    }
                    Some(account) => Err(StorageError::NotReady(format!(
                        "storage account '{}' is {:?}",
                        name, account.provisioning_state
                    ))),
                    None => Err(StorageError::NotReady(format!(
                        "storage account '{}' not visible yet",
                        name
                    ))),
                }
            })
            .await
            .map_err(|e| e.into_storage_error("provision storage account"))
    }

    async fn configure_account(&self, name: &str) -> StorageResult<()> {
        let properties = BlobServiceProperties::from_settings(&self.settings);
        self.accounts.configure_blob_service(name, &properties).await?;

        if self.settings.blob_versioning_enabled {
            let policy = LifecyclePolicy::from_settings(&self.settings);
            self.accounts.set_lifecycle_policy(name, &policy).await?;
        }
        Ok(())
    }

    /// Create a container once the account is provisioned. An existing container ends the loop.
    /// Returns whether the container was created.
    async fn create_container(&self, account: &str, container: &str) -> StorageResult<bool> {
        tracing::debug!(account = %account, container = %container, "Creating blob container");

        let created = self
            .retry
            .run("create blob container", |_| async move {
                let Some(state) = self
                    .accounts
                    .find_account(account)
                    .await?
                    .map(|a| a.provisioning_state)
                else {
                    return Err(StorageError::NotReady(format!(
                        "storage account '{}' does not exist",
                        account
                    )));
                };
                if state != ProvisioningState::Succeeded {
                    return Err(StorageError::NotReady(format!(
                        "storage account '{}' is {:?}",
                        account, state
                    )));
                }

                if self.accounts.container_exists(account, container).await? {
                    tracing::warn!(
                        account = %account,
                        container = %container,
                        "Blob container already exists"
                    );
                    return Ok(false);
                }
                self.accounts
                    .create_container(account, container)
                    .await
                    .map(|()| true)
            })
            .await
            .map_err(|e| {
                let err = e.into_storage_error("create blob container");
                tracing::error!(
                    account = %account,
                    container = %container,
                    error = %err,
                    "Unable to create blob container"
                );
                err
            })?;

        if created {
            tracing::debug!(account = %account, container = %container, "Blob container created");
        }
        Ok(created)
    }
}

#[async_trait]
impl StorageProvider for AzureStorage {
    async fn create_organization_storage(&self, organization: &Organization) -> StorageResult<()> {
        let name = organization.name.as_str();
        tracing::debug!(organization = %name, "Creating storage account");

        if self.accounts.find_account(name).await?.is_some() {
            tracing::warn!(organization = %name, "Storage account already exists, nothing to do");
            return Ok(());
        }

        self.accounts.create_account(name).await?;
        self.wait_for_account(name).await?;
        self.configure_account(name).await?;

        tracing::info!(organization = %name, "Storage account created");
        Ok(())
    }

    async fn create_loadingzone(&self, organization: &Organization) -> StorageResult<()> {
        self.create_container(&organization.name, LOADINGZONE)
            .await
            .map(|_| ())
    }

    async fn create_space_storage(&self, space: &Space) -> StorageResult<bool> {
        self.create_container(space.organization_name(), &space.name)
            .await
    }

    async fn delete_organization_storage(&self, organization: &Organization) -> StorageResult<()> {
        if self.accounts.find_account(&organization.name).await?.is_none() {
            tracing::debug!(organization = %organization.name, "Storage account already absent");
            return Ok(());
        }
        self.accounts.delete_account(&organization.name).await?;
        tracing::info!(organization = %organization.name, "Storage account deleted");
        Ok(())
    }

    async fn delete_space_storage(&self, space: &Space) -> StorageResult<()> {
        let account = space.organization_name();
        if self.accounts.find_account(account).await?.is_none() {
            return Ok(());
        }
        if self.accounts.container_exists(account, &space.name).await? {
            self.accounts.delete_container(account, &space.name).await?;
            tracing::info!(
                organization = %account,
                space = %space.name,
                "Blob container deleted"
            );
        }
        Ok(())
    }

    fn backend_type(&self) -> StorageBackend {
        StorageBackend::Azure
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::retry::RetryPolicy;
    use orgstore_core::Confidentiality;
    use std::collections::{BTreeSet, HashMap};
    use std::sync::Mutex;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;

    /// Accounts become `Succeeded` after a number of lookups.
    #[derive(Default)]
    struct FakeAccounts {
        accounts: Mutex<HashMap<String, u32>>,
        containers: Mutex<BTreeSet<(String, String)>>,
        lookups_until_ready: u32,
        configured: Mutex<Vec<String>>,
        create_failure: Option<(u16, &'static str)>,
    }

    #[async_trait]
    impl AccountManager for FakeAccounts {
        async fn find_account(&self, name: &str) -> StorageResult<Option<StorageAccount>> {
            let mut accounts = self.accounts.lock().unwrap();
            Ok(accounts.get_mut(name).map(|lookups| {
                *lookups += 1;
                StorageAccount {
                    name: name.to_string(),
                    provisioning_state: if *lookups > self.lookups_until_ready {
                        ProvisioningState::Succeeded
                    } else {
                        ProvisioningState::Creating
                    },
                }
            }))
        }

        async fn create_account(&self, name: &str) -> StorageResult<StorageAccount> {
            if let Some((status, body)) = self.create_failure {
                return Err(parse_management_failure(Some(status), body).into_storage_error(name));
            }
            self.accounts.lock().unwrap().insert(name.to_string(), 0);
            Ok(StorageAccount {
                name: name.to_string(),
                provisioning_state: ProvisioningState::Creating,
            })
        }

        async fn delete_account(&self, name: &str) -> StorageResult<()> {
            self.accounts.lock().unwrap().remove(name);
            self.containers.lock().unwrap().retain(|(a, _)| a != name);
            Ok(())
        }

        async fn configure_blob_service(
            &self,
            account: &str,
            _properties: &BlobServiceProperties,
        ) -> StorageResult<()> {
            self.configured.lock().unwrap().push(format!("{}:blob", account));
            Ok(())
        }

        async fn set_lifecycle_policy(
            &self,
            account: &str,
            _policy: &LifecyclePolicy,
        ) -> StorageResult<()> {
            self.configured.lock().unwrap().push(format!("{}:lifecycle", account));
            Ok(())
        }

        async fn container_exists(&self, account: &str, container: &str) -> StorageResult<bool> {
            Ok(self
                .containers
                .lock()
                .unwrap()
                .contains(&(account.to_string(), container.to_string())))
        }

        async fn create_container(&self, account: &str, container: &str) -> StorageResult<()> {
            self.containers
                .lock()
                .unwrap()
                .insert((account.to_string(), container.to_string()));
            Ok(())
        }

        async fn delete_container(&self, account: &str, container: &str) -> StorageResult<()> {
            self.containers
                .lock()
                .unwrap()
                .remove(&(account.to_string(), container.to_string()));
            Ok(())
        }
    }

    fn storage(fake: Arc<FakeAccounts>, max_retries: u32) -> AzureStorage {
        AzureStorage::new(
            fake,
            AzureSettings::default(),
            RetryExecutor::new(
                RetryPolicy::new(max_retries, Duration::from_secs(10)),
                CancellationToken::new(),
            ),
        )
    }

    #[tokio::test(start_paused = true)]
    async fn test_create_organization_waits_and_configures() {
        let fake = Arc::new(FakeAccounts {
            lookups_until_ready: 2,
            ..Default::default()
        });
        let storage = storage(fake.clone(), 5);
        let acme = Organization::new("acme");

        storage.create_organization_storage(&acme).await.unwrap();
        storage.create_loadingzone(&acme).await.unwrap();

        assert_eq!(
            *fake.configured.lock().unwrap(),
            vec!["acme:blob".to_string(), "acme:lifecycle".to_string()]
        );
        assert!(fake.container_exists("acme", "loadingzone").await.unwrap());
    }

    #[tokio::test(start_paused = true)]
    async fn test_existing_account_is_left_alone() {
        let fake = Arc::new(FakeAccounts::default());
        fake.accounts.lock().unwrap().insert("acme".to_string(), 0);
        let storage = storage(fake.clone(), 5);

        storage
            .create_organization_storage(&Organization::new("acme"))
            .await
            .unwrap();
        assert!(fake.configured.lock().unwrap().is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_space_without_account_exhausts_retries() {
        let fake = Arc::new(FakeAccounts::default());
        let storage = storage(fake, 3);
        let space = Space::new(Organization::new("acme"), "reports", Confidentiality::Internal);
        let start = tokio::time::Instant::now();

        let err = storage.create_space_storage(&space).await.unwrap_err();
        match err {
            StorageError::RetryExhausted {
                attempts,
                last_error,
                ..
            } => {
                assert_eq!(attempts, 3);
                assert!(matches!(*last_error, StorageError::NotReady(_)));
            }
            other => panic!("unexpected error: {:?}", other),
        }
        assert_eq!(start.elapsed(), Duration::from_secs(20));
    }

    #[tokio::test(start_paused = true)]
    async fn test_existing_container_stops_retrying() {
        let fake = Arc::new(FakeAccounts::default());
        fake.accounts.lock().unwrap().insert("acme".to_string(), 0);
        fake.create_container("acme", "reports").await.unwrap();
        let storage = storage(fake, 3);
        let start = tokio::time::Instant::now();

        let space = Space::new(Organization::new("acme"), "reports", Confidentiality::Internal);
        assert!(!storage.create_space_storage(&space).await.unwrap());
        assert_eq!(start.elapsed(), Duration::ZERO);
    }

    #[tokio::test]
    async fn test_permission_error_is_classified() {
        let fake = Arc::new(FakeAccounts {
            create_failure: Some((
                403,
                r#"{"error":{"code":"AuthorizationFailed","message":"denied"}}"#,
            )),
            ..Default::default()
        });
        let err = storage(fake, 1)
            .create_organization_storage(&Organization::new("acme"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::PermissionDenied { .. }));
    }

    #[tokio::test]
    async fn test_name_taken_is_classified() {
        let fake = Arc::new(FakeAccounts {
            create_failure: Some((
                409,
                r#"{"code":"StorageAccountAlreadyTaken","message":"taken"}"#,
            )),
            ..Default::default()
        });
        let err = storage(fake, 1)
            .create_organization_storage(&Organization::new("acme"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::NameConflict { .. }));
    }

    #[tokio::test]
    async fn test_delete_absent_resources_succeeds() {
        let fake = Arc::new(FakeAccounts::default());
        let storage = storage(fake, 1);
        let acme = Organization::new("acme");
        let space = Space::new(acme.clone(), "reports", Confidentiality::Internal);

        storage.delete_space_storage(&space).await.unwrap();
        storage.delete_organization_storage(&acme).await.unwrap();
    }
}
