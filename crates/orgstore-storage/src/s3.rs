use async_trait::async_trait;
use aws_config::meta::region::RegionProviderChain;
use aws_config::retry::{RetryConfig, RetryMode};
use aws_config::{BehaviorVersion, SdkConfig};
use aws_sdk_s3::error::{DisplayErrorContext, SdkError};
use aws_sdk_s3::operation::head_object::HeadObjectError;
use aws_sdk_s3::primitives::ByteStream;
use aws_sdk_s3::types::{Delete, ObjectIdentifier};
use aws_sdk_s3::Client;
use orgstore_core::constants::KEY_DELIMITER;
use orgstore_core::S3Settings;

use crate::bucket::ObjectBucket;
use crate::traits::{StorageError, StorageResult};

// DeleteObjects accepts at most 1000 keys per request
const DELETE_BATCH_SIZE: usize = 1000;

/// Load the AWS configuration shared by the S3 and IAM clients.
pub async fn load_sdk_config(settings: &S3Settings) -> StorageResult<SdkConfig> {
    let region = settings.region.clone().ok_or_else(|| {
        StorageError::ConfigError("S3_REGION or AWS_REGION not configured".to_string())
    })?;
    let region_provider = RegionProviderChain::first_try(aws_config::Region::new(region));

    let retry_config = RetryConfig::standard()
        .with_max_attempts(5)
        .with_retry_mode(RetryMode::Adaptive);

    Ok(aws_config::defaults(BehaviorVersion::latest())
        .region(region_provider)
        .retry_config(retry_config)
        .load()
        .await)
}

/// One S3 bucket holding every organization under its own key prefix.
#[derive(Clone, Debug)]
pub struct S3Bucket {
    client: Client,
    bucket: String,
}

impl S3Bucket {
    /// Create a new S3Bucket
    ///
    /// # Arguments
    /// * `sdk_config` - Shared AWS configuration
    /// * `bucket` - S3 bucket name
    /// * `endpoint_url` - Optional custom endpoint URL for S3-compatible providers
    ///   (e.g., "http://localhost:9000" for MinIO)
    pub fn new(sdk_config: &SdkConfig, bucket: String, endpoint_url: Option<&str>) -> Self {
        let client = match endpoint_url {
            Some(endpoint) => {
                // Path-style addressing is required by MinIO and most S3-compatible providers
                let config = aws_sdk_s3::config::Builder::from(sdk_config)
                    .endpoint_url(endpoint)
                    .force_path_style(true)
                    .build();
                Client::from_conf(config)
            }
            None => Client::new(sdk_config),
        };

        Self { client, bucket }
    }

    fn backend_error<E, R>(&self, operation: &str, key: &str, err: SdkError<E, R>) -> StorageError
    where
        E: std::error::Error + Send + Sync + 'static,
        R: std::fmt::Debug,
    {
        let message = DisplayErrorContext(&err).to_string();
        tracing::error!(
            error = %message,
            bucket = %self.bucket,
            key = %key,
            "S3 {} failed",
            operation
        );
        StorageError::BackendError(format!("{} '{}': {}", operation, key, message))
    }
}

#[async_trait]
impl ObjectBucket for S3Bucket {
    fn bucket_name(&self) -> &str {
        &self.bucket
    }

    async fn prefix_exists(&self, prefix: &str) -> StorageResult<bool> {
        let output = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .max_keys(1)
            .send()
            .await
            .map_err(|e| self.backend_error("list", prefix, e))?;
        Ok(!output.contents().is_empty())
    }

    async fn object_exists(&self, key: &str) -> StorageResult<bool> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(_) => Ok(true),
            Err(SdkError::ServiceError(service_err))
                if matches!(service_err.err(), HeadObjectError::NotFound(_)) =>
            {
                Ok(false)
            }
            Err(e) => Err(self.backend_error("head", key, e)),
        }
    }

    async fn create_empty_object(&self, key: &str) -> StorageResult<()> {
        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .body(ByteStream::from_static(b""))
            .send()
            .await
            .map_err(|e| self.backend_error("put", key, e))?;

        tracing::debug!(bucket = %self.bucket, key = %key, "Marker object created");
        Ok(())
    }

    async fn delete_objects_by_prefix(&self, prefix: &str) -> StorageResult<usize> {
        let keys = self.list_keys(prefix).await?;

        for batch in keys.chunks(DELETE_BATCH_SIZE) {
            let objects = batch
                .iter()
                .map(|key| ObjectIdentifier::builder().key(key).build())
                .collect::<Result<Vec<_>, _>>()
                .map_err(|e| StorageError::BackendError(e.to_string()))?;
            let delete = Delete::builder()
                .set_objects(Some(objects))
                .quiet(true)
                .build()
                .map_err(|e| StorageError::BackendError(e.to_string()))?;

            self.client
                .delete_objects()
                .bucket(&self.bucket)
                .delete(delete)
                .send()
                .await
                .map_err(|e| self.backend_error("delete", prefix, e))?;
        }

        tracing::info!(
            bucket = %self.bucket,
            prefix = %prefix,
            deleted = keys.len(),
            "Objects deleted by prefix"
        );
        Ok(keys.len())
    }

    async fn list_keys(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .into_paginator()
            .send();

        let mut keys = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| self.backend_error("list", prefix, e))?;
            keys.extend(page.contents().iter().filter_map(|o| o.key().map(String::from)));
        }
        Ok(keys)
    }

    async fn list_child_prefixes(&self, prefix: &str) -> StorageResult<Vec<String>> {
        let mut pages = self
            .client
            .list_objects_v2()
            .bucket(&self.bucket)
            .prefix(prefix)
            .delimiter(KEY_DELIMITER.to_string())
            .into_paginator()
            .send();

        let mut children = Vec::new();
        while let Some(page) = pages.next().await {
            let page = page.map_err(|e| self.backend_error("list", prefix, e))?;
            children.extend(
                page.common_prefixes()
                    .iter()
                    .filter_map(|p| p.prefix().map(String::from)),
            );
        }
        Ok(children)
    }
}
