#[cfg(feature = "storage-azure")]
use crate::azure::{ArmClient, AzureStorage};
#[cfg(feature = "storage-local")]
use crate::LocalStorage;
use crate::policy::{DirectoryTemplates, EmbeddedTemplates, TemplateSource};
#[cfg(feature = "storage-s3")]
use crate::policy::{IamPolicyStore, PolicyManager};
#[cfg(feature = "storage-s3")]
use crate::{PrefixStorage, S3Bucket};
use crate::{RetryExecutor, RetryPolicy, StorageBackend, StorageError, StorageOrchestrator, StorageResult};
use orgstore_core::Config;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Template source selected by configuration: a directory override or the built-in set.
pub fn create_template_source(config: &Config) -> Arc<dyn TemplateSource> {
    match &config.policy_template_dir {
        Some(dir) => {
            tracing::info!(dir = %dir.display(), "Loading policy templates from directory");
            Arc::new(DirectoryTemplates::new(dir.clone()))
        }
        None => Arc::new(EmbeddedTemplates),
    }
}

/// Create the orchestrator for the configured storage backend
///
/// `cancel` aborts retry waits of the managed cloud backend on shutdown.
pub async fn create_orchestrator(
    config: &Config,
    cancel: CancellationToken,
) -> StorageResult<StorageOrchestrator> {
    let orchestrator = match config.storage_backend {
        #[cfg(feature = "storage-azure")]
        StorageBackend::Azure => {
            let client = ArmClient::new(config.azure.clone())?;
            let retry = RetryExecutor::new(RetryPolicy::from(&config.retry), cancel);
            let storage = AzureStorage::new(Arc::new(client), config.azure.clone(), retry);
            StorageOrchestrator::new(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-azure"))]
        StorageBackend::Azure => {
            return Err(StorageError::ConfigError(
                "Azure storage backend not available (storage-azure feature not enabled)"
                    .to_string(),
            ))
        }

        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let bucket_name = config.s3.bucket.trim();
            if bucket_name.is_empty() {
                return Err(StorageError::ConfigError(
                    "S3_BUCKET not configured".to_string(),
                ));
            }
            let sdk_config = crate::s3::load_sdk_config(&config.s3).await?;
            let bucket = S3Bucket::new(
                &sdk_config,
                bucket_name.to_string(),
                config.s3.endpoint.as_deref(),
            );
            let store = IamPolicyStore::new(&sdk_config, config.s3.iam_endpoint.as_deref());
            let policies = Arc::new(PolicyManager::new(
                Arc::new(store),
                create_template_source(config),
                bucket_name,
            ));
            let storage = PrefixStorage::new(Arc::new(bucket), policies.clone());
            StorageOrchestrator::new(Arc::new(storage)).with_policies(policies)
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => {
            return Err(StorageError::ConfigError(
                "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
            ))
        }

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let storage = LocalStorage::new(config.local.root.clone()).await?;
            StorageOrchestrator::new(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => {
            return Err(StorageError::ConfigError(
                "Local storage backend not available (storage-local feature not enabled)"
                    .to_string(),
            ))
        }
    };

    tracing::info!(backend = %config.storage_backend, "Storage backend initialized");
    Ok(orchestrator.with_failure_mode(config.policy_failure_mode))
}
