//! Azure Resource Manager client for storage accounts and blob containers.

use std::time::{Duration, Instant};

use async_trait::async_trait;
use orgstore_core::AzureSettings;
use reqwest::{Method, StatusCode};
use serde::{Deserialize, Serialize};
use serde_json::json;
use tokio::sync::Mutex;

use super::error::parse_management_failure;
use crate::traits::{StorageError, StorageResult};

const API_VERSION: &str = "2023-01-01";
const LIFECYCLE_RULE_NAME: &str = "migrate-blob-versions-until-cool-archive-delete";
const CORS_METHODS: [&str; 10] = [
    "DELETE", "GET", "HEAD", "MERGE", "POST", "OPTIONS", "PUT", "PATCH", "CONNECT", "TRACE",
];
// Refresh the token a minute before it expires
const TOKEN_REFRESH_MARGIN: Duration = Duration::from_secs(60);

/// Provisioning state reported for a storage account.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ProvisioningState {
    Creating,
    ResolvingDns,
    Succeeded,
    Other(String),
}

impl From<&str> for ProvisioningState {
    fn from(value: &str) -> Self {
        match value {
            "Creating" => ProvisioningState::Creating,
            "ResolvingDNS" => ProvisioningState::ResolvingDns,
            "Succeeded" => ProvisioningState::Succeeded,
            other => ProvisioningState::Other(other.to_string()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StorageAccount {
    pub name: String,
    pub provisioning_state: ProvisioningState,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeleteRetentionPolicy {
    pub enabled: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub days: Option<u32>,
}

impl DeleteRetentionPolicy {
    fn new(enabled: bool, days: u32) -> Self {
        Self {
            enabled,
            days: enabled.then_some(days),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorsRule {
    pub allowed_origins: Vec<String>,
    pub allowed_methods: Vec<String>,
    pub allowed_headers: Vec<String>,
    pub exposed_headers: Vec<String>,
    pub max_age_in_seconds: u32,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CorsRules {
    pub cors_rules: Vec<CorsRule>,
}

/// Account-level blob service configuration applied once after creation.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct BlobServiceProperties {
    pub is_versioning_enabled: bool,
    pub delete_retention_policy: DeleteRetentionPolicy,
    pub container_delete_retention_policy: DeleteRetentionPolicy,
    pub cors: CorsRules,
}

impl BlobServiceProperties {
    pub fn from_settings(settings: &AzureSettings) -> Self {
        let cors_rules = settings
            .cors_origins
            .iter()
            .map(|origin| CorsRule {
                allowed_origins: vec![origin.clone()],
                allowed_methods: CORS_METHODS.iter().map(|m| m.to_string()).collect(),
                allowed_headers: vec!["*".to_string()],
                exposed_headers: vec!["*".to_string()],
                max_age_in_seconds: settings.cors_max_age_secs,
            })
            .collect();

        Self {
            is_versioning_enabled: settings.blob_versioning_enabled,
            delete_retention_policy: DeleteRetentionPolicy::new(
                settings.soft_delete_blobs_enabled,
                settings.retention_deleted_blobs_days,
            ),
            container_delete_retention_policy: DeleteRetentionPolicy::new(
                settings.soft_delete_containers_enabled,
                settings.retention_deleted_containers_days,
            ),
            cors: CorsRules { cors_rules },
        }
    }
}

/// Lifecycle rule moving old blob versions to cool, then archive tier, then deleting them.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LifecyclePolicy {
    pub cool_tier_after_days: f32,
    pub archive_tier_after_days: f32,
    pub delete_after_days: f32,
}

impl LifecyclePolicy {
    pub fn from_settings(settings: &AzureSettings) -> Self {
        Self {
            cool_tier_after_days: settings.blob_versions_until_cool_tier_days,
            archive_tier_after_days: settings.blob_versions_until_archive_tier_days,
            delete_after_days: settings.blob_versions_until_delete_days,
        }
    }

    pub fn to_body(&self) -> serde_json::Value {
        json!({
            "properties": {
                "policy": {
                    "rules": [{
                        "enabled": true,
                        "name": LIFECYCLE_RULE_NAME,
                        "type": "Lifecycle",
                        "definition": {
                            "actions": {
                                "version": {
                                    "tierToCool": { "daysAfterCreationGreaterThan": self.cool_tier_after_days },
                                    "tierToArchive": { "daysAfterCreationGreaterThan": self.archive_tier_after_days },
                                    "delete": { "daysAfterCreationGreaterThan": self.delete_after_days }
                                }
                            },
                            "filters": { "blobTypes": ["blockBlob"] }
                        }
                    }]
                }
            }
        })
    }
}

/// Management operations on storage accounts and their containers.
#[async_trait]
pub trait AccountManager: Send + Sync {
    async fn find_account(&self, name: &str) -> StorageResult<Option<StorageAccount>>;

    /// Start account creation; provisioning continues asynchronously.
    async fn create_account(&self, name: &str) -> StorageResult<StorageAccount>;

    async fn delete_account(&self, name: &str) -> StorageResult<()>;

    async fn configure_blob_service(
        &self,
        account: &str,
        properties: &BlobServiceProperties,
    ) -> StorageResult<()>;

    async fn set_lifecycle_policy(&self, account: &str, policy: &LifecyclePolicy)
        -> StorageResult<()>;

    async fn container_exists(&self, account: &str, container: &str) -> StorageResult<bool>;

    async fn create_container(&self, account: &str, container: &str) -> StorageResult<()>;

    async fn delete_container(&self, account: &str, container: &str) -> StorageResult<()>;
}

#[derive(Deserialize)]
struct TokenResponse {
    access_token: String,
    expires_in: u64,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AccountProperties {
    #[serde(default)]
    provisioning_state: Option<String>,
}

#[derive(Deserialize)]
struct AccountResponse {
    name: String,
    #[serde(default)]
    properties: Option<AccountProperties>,
}

impl AccountResponse {
    fn into_account(self) -> StorageAccount {
        let state = self
            .properties
            .and_then(|p| p.provisioning_state)
            .unwrap_or_else(|| "Creating".to_string());
        StorageAccount {
            name: self.name,
            provisioning_state: ProvisioningState::from(state.as_str()),
        }
    }
}

struct CachedToken {
    value: String,
    expires_at: Instant,
}

/// REST client for the Azure Resource Manager, authenticated with client credentials.
pub struct ArmClient {
    http: reqwest::Client,
    settings: AzureSettings,
    token: Mutex<Option<CachedToken>>,
}

impl ArmClient {
    pub fn new(settings: AzureSettings) -> StorageResult<Self> {
        let http = reqwest::Client::builder()
            .timeout(Duration::from_secs(60))
            .build()
            .map_err(|e| StorageError::ConfigError(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            http,
            settings,
            token: Mutex::new(None),
        })
    }

    fn account_url(&self, name: &str) -> String {
        format!(
            "{}/subscriptions/{}/resourceGroups/{}/providers/Microsoft.Storage/storageAccounts/{}",
            self.settings.management_endpoint.trim_end_matches('/'),
            self.settings.subscription_id,
            self.settings.resource_group,
            name
        )
    }

    fn container_url(&self, account: &str, container: &str) -> String {
        format!(
            "{}/blobServices/default/containers/{}",
            self.account_url(account),
            container
        )
    }

    async fn access_token(&self) -> StorageResult<String> {
        let mut cached = self.token.lock().await;
        if let Some(token) = cached.as_ref() {
            if token.expires_at > Instant::now() + TOKEN_REFRESH_MARGIN {
                return Ok(token.value.clone());
            }
        }

        let url = format!(
            "{}/{}/oauth2/v2.0/token",
            self.settings.login_endpoint.trim_end_matches('/'),
            self.settings.tenant_id
        );
        let scope = format!(
            "{}/.default",
            self.settings.management_endpoint.trim_end_matches('/')
        );
        let body = format!(
            "grant_type=client_credentials&client_id={}&client_secret={}&scope={}",
            urlencoding::encode(&self.settings.client_id),
            urlencoding::encode(&self.settings.client_secret),
            urlencoding::encode(&scope)
        );

        let response = self
            .http
            .post(&url)
            .header(reqwest::header::CONTENT_TYPE, "application/x-www-form-urlencoded")
            .body(body)
            .send()
            .await
            .map_err(|e| StorageError::BackendError(format!("token request failed: {}", e)))?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            return Err(parse_management_failure(Some(status.as_u16()), &text)
                .into_storage_error("token"));
        }

        let token: TokenResponse = response
            .json()
            .await
            .map_err(|e| StorageError::BackendError(format!("invalid token response: {}", e)))?;

        *cached = Some(CachedToken {
            value: token.access_token.clone(),
            expires_at: Instant::now() + Duration::from_secs(token.expires_in),
        });
        Ok(token.access_token)
    }

    /// Send a management request. Returns the status and body of any response below 400
    /// and of 404; other statuses become classified errors.
    async fn send(
        &self,
        method: Method,
        url: &str,
        body: Option<serde_json::Value>,
        resource: &str,
    ) -> StorageResult<(StatusCode, String)> {
        let token = self.access_token().await?;
        let mut request = self
            .http
            .request(method.clone(), format!("{}?api-version={}", url, API_VERSION))
            .bearer_auth(token);
        if let Some(body) = body {
            request = request.json(&body);
        }

        let start = Instant::now();
        let response = request.send().await.map_err(|e| {
            StorageError::BackendError(format!("{} {} failed: {}", method, resource, e))
        })?;
        let status = response.status();
        let text = response.text().await.unwrap_or_default();

        tracing::debug!(
            method = %method,
            resource = %resource,
            status = status.as_u16(),
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "Azure management request"
        );

        if status.is_success() || status.is_redirection() || status == StatusCode::NOT_FOUND {
            return Ok((status, text));
        }
        let failure = parse_management_failure(Some(status.as_u16()), &text);
        tracing::error!(
            resource = %resource,
            status = status.as_u16(),
            code = %failure.code,
            error = %failure.message,
            "Azure management request failed"
        );
        Err(failure.into_storage_error(resource))
    }
}

fn parse_account(text: &str, name: &str) -> StorageAccount {
    serde_json::from_str::<AccountResponse>(text)
        .map(AccountResponse::into_account)
        .unwrap_or_else(|_| StorageAccount {
            name: name.to_string(),
            provisioning_state: ProvisioningState::Creating,
        })
}

#[async_trait]
impl AccountManager for ArmClient {
    async fn find_account(&self, name: &str) -> StorageResult<Option<StorageAccount>> {
        let (status, text) = self
            .send(Method::GET, &self.account_url(name), None, name)
            .await?;
        if status == StatusCode::NOT_FOUND {
            return Ok(None);
        }
        Ok(Some(parse_account(&text, name)))
    }

    async fn create_account(&self, name: &str) -> StorageResult<StorageAccount> {
        let body = json!({
            "sku": { "name": "Standard_LRS" },
            "kind": "StorageV2",
            "location": self.settings.region,
            "properties": {}
        });
        let (status, text) = self
            .send(Method::PUT, &self.account_url(name), Some(body), name)
            .await?;
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::Unknown(format!(
                "resource group '{}' not found",
                self.settings.resource_group
            )));
        }
        Ok(parse_account(&text, name))
    }

    async fn delete_account(&self, name: &str) -> StorageResult<()> {
        self.send(Method::DELETE, &self.account_url(name), None, name)
            .await
            .map(|_| ())
    }

    async fn configure_blob_service(
        &self,
        account: &str,
        properties: &BlobServiceProperties,
    ) -> StorageResult<()> {
        let body = json!({ "properties": properties });
        let url = format!("{}/blobServices/default", self.account_url(account));
        self.send(Method::PUT, &url, Some(body), account)
            .await
            .map(|_| ())
    }

    async fn set_lifecycle_policy(
        &self,
        account: &str,
        policy: &LifecyclePolicy,
    ) -> StorageResult<()> {
        let url = format!("{}/managementPolicies/default", self.account_url(account));
        self.send(Method::PUT, &url, Some(policy.to_body()), account)
            .await
            .map(|_| ())
    }

    async fn container_exists(&self, account: &str, container: &str) -> StorageResult<bool> {
        let (status, _) = self
            .send(
                Method::GET,
                &self.container_url(account, container),
                None,
                container,
            )
            .await?;
        Ok(status != StatusCode::NOT_FOUND)
    }

    async fn create_container(&self, account: &str, container: &str) -> StorageResult<()> {
        let (status, _) = self
            .send(
                Method::PUT,
                &self.container_url(account, container),
                Some(json!({ "properties": {} })),
                container,
            )
            .await?;
        if status == StatusCode::NOT_FOUND {
            return Err(StorageError::NotReady(format!(
                "storage account '{}' not found",
                account
            )));
        }
        Ok(())
    }

    async fn delete_container(&self, account: &str, container: &str) -> StorageResult<()> {
        self.send(
            Method::DELETE,
            &self.container_url(account, container),
            None,
            container,
        )
        .await
        .map(|_| ())
    }
}
