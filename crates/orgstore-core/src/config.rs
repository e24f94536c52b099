//! Configuration module
//!
//! Process configuration is read once from the environment and then passed as an
//! explicit value into adapter construction. Nothing here is mutated after load.

use std::env;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use crate::storage_types::StorageBackend;

// Common constants
const SERVER_PORT: u16 = 4000;
const RETRY_MAX_RETRIES: u32 = 5;
const RETRY_DELAY_MS: u64 = 10_000;
const SUPERUSER_ROLE: &str = "SDK_ADMIN";
const ORG_CREATE_ROLE: &str = "org_create_permission";
const AZURE_MANAGEMENT_ENDPOINT: &str = "https://management.azure.com";
const AZURE_LOGIN_ENDPOINT: &str = "https://login.microsoftonline.com";
const AZURE_CORS_MAX_AGE_SECS: u32 = 3600;
const BLOB_VERSIONS_UNTIL_COOL_TIER_DAYS: f32 = 1.0;
const BLOB_VERSIONS_UNTIL_ARCHIVE_TIER_DAYS: f32 = 2.0;
const BLOB_VERSIONS_UNTIL_DELETE_DAYS: f32 = 14.0;
const RETENTION_DELETED_DAYS: u32 = 14;

/// What to do when scoped policy creation fails after the space storage exists.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum PolicyFailureMode {
    /// Log the failure and report success; the space is left without its policies.
    #[default]
    Log,
    /// Delete whatever was created for the space and report the failure.
    Rollback,
}

impl FromStr for PolicyFailureMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "log" => Ok(PolicyFailureMode::Log),
            "rollback" => Ok(PolicyFailureMode::Rollback),
            _ => Err(anyhow::anyhow!("Invalid policy failure mode: {}", s)),
        }
    }
}

/// Retry budget for operations against backends with asynchronous provisioning.
#[derive(Clone, Debug, PartialEq)]
pub struct RetrySettings {
    pub max_retries: u32,
    pub delay: Duration,
    /// Overall bound on one retried operation, sleeps included.
    pub deadline: Option<Duration>,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: RETRY_MAX_RETRIES,
            delay: Duration::from_millis(RETRY_DELAY_MS),
            deadline: None,
        }
    }
}

#[derive(Clone, Debug)]
pub struct LocalSettings {
    pub root: PathBuf,
}

impl Default for LocalSettings {
    fn default() -> Self {
        Self {
            root: env::temp_dir(),
        }
    }
}

#[derive(Clone, Debug, Default)]
pub struct S3Settings {
    pub bucket: String,
    pub region: Option<String>,
    /// Custom endpoint for S3-compatible providers (MinIO etc.)
    pub endpoint: Option<String>,
    pub iam_endpoint: Option<String>,
}

#[derive(Clone, Debug)]
pub struct AzureSettings {
    pub subscription_id: String,
    pub resource_group: String,
    pub region: String,
    pub tenant_id: String,
    pub client_id: String,
    pub client_secret: String,
    pub management_endpoint: String,
    pub login_endpoint: String,
    pub cors_origins: Vec<String>,
    pub cors_max_age_secs: u32,
    pub blob_versions_until_cool_tier_days: f32,
    pub blob_versions_until_archive_tier_days: f32,
    pub blob_versions_until_delete_days: f32,
    pub retention_deleted_blobs_days: u32,
    pub retention_deleted_containers_days: u32,
    pub soft_delete_blobs_enabled: bool,
    pub soft_delete_containers_enabled: bool,
    pub blob_versioning_enabled: bool,
}

impl Default for AzureSettings {
    fn default() -> Self {
        Self {
            subscription_id: String::new(),
            resource_group: String::new(),
            region: String::new(),
            tenant_id: String::new(),
            client_id: String::new(),
            client_secret: String::new(),
            management_endpoint: AZURE_MANAGEMENT_ENDPOINT.to_string(),
            login_endpoint: AZURE_LOGIN_ENDPOINT.to_string(),
            cors_origins: Vec::new(),
            cors_max_age_secs: AZURE_CORS_MAX_AGE_SECS,
            blob_versions_until_cool_tier_days: BLOB_VERSIONS_UNTIL_COOL_TIER_DAYS,
            blob_versions_until_archive_tier_days: BLOB_VERSIONS_UNTIL_ARCHIVE_TIER_DAYS,
            blob_versions_until_delete_days: BLOB_VERSIONS_UNTIL_DELETE_DAYS,
            retention_deleted_blobs_days: RETENTION_DELETED_DAYS,
            retention_deleted_containers_days: RETENTION_DELETED_DAYS,
            soft_delete_blobs_enabled: true,
            soft_delete_containers_enabled: true,
            blob_versioning_enabled: true,
        }
    }
}

/// Application configuration.
#[derive(Clone, Debug)]
pub struct Config {
    pub server_port: u16,
    pub environment: String,
    pub jwt_secret: String,
    pub superuser_role: String,
    pub org_create_role: String,
    pub storage_backend: StorageBackend,
    pub retry: RetrySettings,
    pub policy_failure_mode: PolicyFailureMode,
    pub policy_template_dir: Option<PathBuf>,
    pub local: LocalSettings,
    pub s3: S3Settings,
    pub azure: AzureSettings,
}

fn parse_or<T: FromStr>(value: Option<String>, default: T) -> T {
    value.and_then(|v| v.trim().parse().ok()).unwrap_or(default)
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.map(|s| s.trim().to_string()).filter(|s| !s.is_empty())
}

impl Config {
    /// Check if the application is running in production mode
    pub fn is_production(&self) -> bool {
        let env = self.environment.to_lowercase();
        env == "production" || env == "prod"
    }

    pub fn from_env() -> Result<Self, anyhow::Error> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build the configuration from any key lookup; `from_env` uses the process environment.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, anyhow::Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        let environment = lookup("ENVIRONMENT")
            .or_else(|| lookup("APP_ENV"))
            .unwrap_or_else(|| "development".to_string());

        let storage_backend = match non_empty(lookup("STORAGE_BACKEND")) {
            Some(s) => s.parse()?,
            None => StorageBackend::Local,
        };

        let policy_failure_mode = match non_empty(lookup("POLICY_FAILURE_MODE")) {
            Some(s) => s.parse()?,
            None => PolicyFailureMode::default(),
        };

        let retry = RetrySettings {
            max_retries: parse_or(lookup("STORAGE_RETRY_MAX_RETRIES"), RETRY_MAX_RETRIES),
            delay: Duration::from_millis(parse_or(
                lookup("STORAGE_RETRY_DELAY_MS"),
                RETRY_DELAY_MS,
            )),
            deadline: non_empty(lookup("STORAGE_RETRY_DEADLINE_SECS"))
                .and_then(|s| s.parse::<u64>().ok())
                .map(Duration::from_secs),
        };

        let local = LocalSettings {
            root: non_empty(lookup("LOCAL_STORAGE_ROOT"))
                .map(PathBuf::from)
                .unwrap_or_else(env::temp_dir),
        };

        let s3 = S3Settings {
            bucket: lookup("S3_BUCKET").unwrap_or_default(),
            region: non_empty(lookup("S3_REGION")).or_else(|| non_empty(lookup("AWS_REGION"))),
            endpoint: non_empty(lookup("S3_ENDPOINT")),
            iam_endpoint: non_empty(lookup("IAM_ENDPOINT")),
        };

        let defaults = AzureSettings::default();
        let azure = AzureSettings {
            subscription_id: lookup("AZURE_SUBSCRIPTION_ID").unwrap_or_default(),
            resource_group: lookup("AZURE_RESOURCE_GROUP").unwrap_or_default(),
            region: lookup("AZURE_REGION").unwrap_or_default(),
            tenant_id: lookup("AZURE_TENANT_ID").unwrap_or_default(),
            client_id: lookup("AZURE_CLIENT_ID").unwrap_or_default(),
            client_secret: lookup("AZURE_CLIENT_SECRET").unwrap_or_default(),
            management_endpoint: non_empty(lookup("AZURE_MANAGEMENT_ENDPOINT"))
                .unwrap_or(defaults.management_endpoint),
            login_endpoint: non_empty(lookup("AZURE_LOGIN_ENDPOINT"))
                .unwrap_or(defaults.login_endpoint),
            cors_origins: lookup("AZURE_CORS_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or_default(),
            cors_max_age_secs: parse_or(
                lookup("AZURE_CORS_MAX_AGE_SECS"),
                defaults.cors_max_age_secs,
            ),
            blob_versions_until_cool_tier_days: parse_or(
                lookup("AZURE_BLOB_VERSIONS_UNTIL_COOL_TIER_DAYS"),
                defaults.blob_versions_until_cool_tier_days,
            ),
            blob_versions_until_archive_tier_days: parse_or(
                lookup("AZURE_BLOB_VERSIONS_UNTIL_ARCHIVE_TIER_DAYS"),
                defaults.blob_versions_until_archive_tier_days,
            ),
            blob_versions_until_delete_days: parse_or(
                lookup("AZURE_BLOB_VERSIONS_UNTIL_DELETE_DAYS"),
                defaults.blob_versions_until_delete_days,
            ),
            retention_deleted_blobs_days: parse_or(
                lookup("AZURE_RETENTION_DELETED_BLOBS_DAYS"),
                defaults.retention_deleted_blobs_days,
            ),
            retention_deleted_containers_days: parse_or(
                lookup("AZURE_RETENTION_DELETED_CONTAINERS_DAYS"),
                defaults.retention_deleted_containers_days,
            ),
            soft_delete_blobs_enabled: parse_or(
                lookup("AZURE_SOFT_DELETE_BLOBS_ENABLED"),
                defaults.soft_delete_blobs_enabled,
            ),
            soft_delete_containers_enabled: parse_or(
                lookup("AZURE_SOFT_DELETE_CONTAINERS_ENABLED"),
                defaults.soft_delete_containers_enabled,
            ),
            blob_versioning_enabled: parse_or(
                lookup("AZURE_BLOB_VERSIONING_ENABLED"),
                defaults.blob_versioning_enabled,
            ),
        };

        let config = Config {
            server_port: lookup("PORT")
                .unwrap_or_else(|| SERVER_PORT.to_string())
                .parse()
                .map_err(|_| anyhow::anyhow!("PORT must be a valid number"))?,
            environment,
            jwt_secret: lookup("JWT_SECRET")
                .ok_or_else(|| anyhow::anyhow!("JWT_SECRET must be set"))?,
            superuser_role: non_empty(lookup("SUPERUSER_ROLE"))
                .unwrap_or_else(|| SUPERUSER_ROLE.to_string()),
            org_create_role: non_empty(lookup("ORG_CREATE_ROLE"))
                .unwrap_or_else(|| ORG_CREATE_ROLE.to_string()),
            storage_backend,
            retry,
            policy_failure_mode,
            policy_template_dir: non_empty(lookup("POLICY_TEMPLATE_DIR")).map(PathBuf::from),
            local,
            s3,
            azure,
        };

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), anyhow::Error> {
        if self.jwt_secret.len() < 32 {
            return Err(anyhow::anyhow!(
                "JWT_SECRET must be at least 32 characters long"
            ));
        }

        if let Some(deadline) = self.retry.deadline {
            if deadline.is_zero() {
                return Err(anyhow::anyhow!(
                    "STORAGE_RETRY_DEADLINE_SECS must be greater than zero"
                ));
            }
        }

        // Validate storage backend configuration
        match self.storage_backend {
            StorageBackend::S3 => {
                if self.s3.bucket.trim().is_empty() {
                    return Err(anyhow::anyhow!(
                        "S3_BUCKET must be set when using S3 storage backend"
                    ));
                }
                if self.s3.region.is_none() {
                    return Err(anyhow::anyhow!(
                        "S3_REGION or AWS_REGION must be set when using S3 storage backend"
                    ));
                }
            }
            StorageBackend::Azure => {
                let required = [
                    ("AZURE_SUBSCRIPTION_ID", &self.azure.subscription_id),
                    ("AZURE_RESOURCE_GROUP", &self.azure.resource_group),
                    ("AZURE_REGION", &self.azure.region),
                    ("AZURE_TENANT_ID", &self.azure.tenant_id),
                    ("AZURE_CLIENT_ID", &self.azure.client_id),
                    ("AZURE_CLIENT_SECRET", &self.azure.client_secret),
                ];
                for (key, value) in required {
                    if value.trim().is_empty() {
                        return Err(anyhow::anyhow!(
                            "{} must be set when using azure storage backend",
                            key
                        ));
                    }
                }
            }
            StorageBackend::Local => {}
        }

        Ok(())
    }
}
