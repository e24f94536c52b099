//! IAM-compatible policy store.

use async_trait::async_trait;
use aws_config::SdkConfig;
use aws_sdk_iam::error::{DisplayErrorContext, ProvideErrorMetadata, SdkError};
use aws_sdk_iam::types::PolicyScopeType;
use aws_sdk_iam::Client;

use super::document::PolicyDocument;
use super::store::PolicyStore;
use crate::traits::{StorageError, StorageResult};

/// Customer-managed IAM policies, addressed by name.
#[derive(Clone, Debug)]
pub struct IamPolicyStore {
    client: Client,
}

impl IamPolicyStore {
    /// # Arguments
    /// * `sdk_config` - Shared AWS configuration (region, credentials)
    /// * `endpoint_url` - Optional custom endpoint for IAM-compatible services
    pub fn new(sdk_config: &SdkConfig, endpoint_url: Option<&str>) -> Self {
        let mut builder = aws_sdk_iam::config::Builder::from(sdk_config);
        if let Some(endpoint) = endpoint_url {
            builder = builder.endpoint_url(endpoint);
        }
        Self {
            client: Client::from_conf(builder.build()),
        }
    }

    /// (name, arn, default version) of every local policy starting with `prefix`.
    async fn find_policies(
        &self,
        prefix: &str,
    ) -> StorageResult<Vec<(String, String, Option<String>)>> {
        let mut pages = self
            .client
            .list_policies()
            .scope(PolicyScopeType::Local)
            .into_paginator()
            .send();

        let mut found = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| classify("list policies", e))?;
            for policy in page.policies() {
                let (Some(name), Some(arn)) = (policy.policy_name(), policy.arn()) else {
                    continue;
                };
                if name.starts_with(prefix) {
                    found.push((
                        name.to_string(),
                        arn.to_string(),
                        policy.default_version_id().map(String::from),
                    ));
                }
            }
        }
        Ok(found)
    }

    async fn find_policy(&self, name: &str) -> StorageResult<Option<(String, Option<String>)>> {
        Ok(self
            .find_policies(name)
            .await?
            .into_iter()
            .find(|(candidate, _, _)| candidate == name)
            .map(|(_, arn, version)| (arn, version)))
    }
}

fn classify<E, R>(operation: &str, err: SdkError<E, R>) -> StorageError
where
    E: ProvideErrorMetadata + std::error::Error + Send + Sync + 'static,
    R: std::fmt::Debug,
{
    let code = err.code().unwrap_or_default().to_string();
    let message = DisplayErrorContext(&err).to_string();
    tracing::error!(operation = %operation, code = %code, error = %message, "IAM request failed");
    match code.as_str() {
        "AccessDenied" | "AccessDeniedException" => StorageError::PermissionDenied { code, message },
        _ => StorageError::BackendError(format!("{}: {}", operation, message)),
    }
}

#[async_trait]
impl PolicyStore for IamPolicyStore {
    async fn create_policy(&self, name: &str, document: &PolicyDocument) -> StorageResult<()> {
        let json = document.to_json()?;
        match self
            .client
            .create_policy()
            .policy_name(name)
            .policy_document(json)
            .send()
            .await
        {
            Ok(_) => {
                tracing::info!(policy = %name, "IAM policy created");
                Ok(())
            }
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_entity_already_exists_exception()) =>
            {
                Err(StorageError::AlreadyExists(name.to_string()))
            }
            Err(e) => Err(classify("create policy", e)),
        }
    }

    async fn delete_policy(&self, name: &str) -> StorageResult<()> {
        let Some((arn, _)) = self.find_policy(name).await? else {
            tracing::debug!(policy = %name, "IAM policy already absent");
            return Ok(());
        };

        // A policy with non-default versions cannot be deleted.
        let versions = self
            .client
            .list_policy_versions()
            .policy_arn(&arn)
            .send()
            .await
            .map_err(|e| classify("list policy versions", e))?;
        for version in versions.versions() {
            if version.is_default_version() {
                continue;
            }
            if let Some(version_id) = version.version_id() {
                self.client
                    .delete_policy_version()
                    .policy_arn(&arn)
                    .version_id(version_id)
                    .send()
                    .await
                    .map_err(|e| classify("delete policy version", e))?;
            }
        }

        match self.client.delete_policy().policy_arn(&arn).send().await {
            Ok(_) => {
                tracing::info!(policy = %name, "IAM policy deleted");
                Ok(())
            }
            Err(e)
                if e.as_service_error()
                    .is_some_and(|se| se.is_no_such_entity_exception()) =>
            {
                Ok(())
            }
            Err(e) => Err(classify("delete policy", e)),
        }
    }

    async fn list_policies(&self, prefix: &str) -> StorageResult<Vec<String>> {
        Ok(self
            .find_policies(prefix)
            .await?
            .into_iter()
            .map(|(name, _, _)| name)
            .collect())
    }

    async fn get_policy(&self, name: &str) -> StorageResult<Option<PolicyDocument>> {
        let Some((arn, default_version)) = self.find_policy(name).await? else {
            return Ok(None);
        };
        let version_id = default_version.unwrap_or_else(|| "v1".to_string());

        let output = self
            .client
            .get_policy_version()
            .policy_arn(&arn)
            .version_id(&version_id)
            .send()
            .await
            .map_err(|e| classify("get policy version", e))?;

        let encoded = output
            .policy_version()
            .and_then(|v| v.document())
            .ok_or_else(|| {
                StorageError::InvalidPolicy(format!("policy '{}' has no document", name))
            })?;
        // IAM returns documents URL-encoded.
        let decoded = urlencoding::decode(encoded)
            .map_err(|e| StorageError::InvalidPolicy(e.to_string()))?;
        PolicyDocument::parse(&decoded).map(Some)
    }
}
