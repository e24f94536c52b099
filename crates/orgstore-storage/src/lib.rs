//! Orgstore Storage Library
//!
//! This crate provisions and tears down the storage of organizations and their
//! spaces. It includes the StorageProvider trait with implementations for Azure
//! blob storage, S3-compatible object storage and the local filesystem, plus the
//! policy manager and the orchestrator sequencing them.
//!
//! # Resource layout
//!
//! All backends derive their identifiers through `orgstore_core::naming`:
//!
//! - **Azure**: storage account `{organization}`, container `{space}`
//! - **S3**: marker objects `{organization}/` and `{organization}/{space}/` in one bucket,
//!   IAM policies `{organization}_{space}_{role}` and the shared `spc_all_public`
//! - **Local**: directories `{root}/{organization}/{space}`

#[cfg(feature = "storage-azure")]
pub mod azure;
pub mod bucket;
pub mod factory;
#[cfg(feature = "storage-local")]
pub mod local;
pub mod memory;
pub mod orchestrator;
pub mod policy;
pub mod prefix;
pub mod retry;
#[cfg(feature = "storage-s3")]
pub mod s3;
pub mod traits;

// Re-export commonly used types
#[cfg(feature = "storage-azure")]
pub use azure::AzureStorage;
pub use bucket::ObjectBucket;
pub use factory::{create_orchestrator, create_template_source};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
pub use memory::{InMemoryBucket, InMemoryPolicyStore};
pub use orchestrator::StorageOrchestrator;
pub use orgstore_core::StorageBackend;
pub use policy::PolicyManager;
pub use prefix::PrefixStorage;
pub use retry::{RetryError, RetryExecutor, RetryPolicy};
#[cfg(feature = "storage-s3")]
pub use s3::S3Bucket;
pub use traits::{StorageError, StorageProvider, StorageResult};
