//! Orgstore Core Library
//!
//! This crate provides the domain models, resource naming, error metadata and
//! configuration shared by the storage and API crates.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod naming;
pub mod storage_types;

// Re-export commonly used types
pub use config::{
    AzureSettings, Config, LocalSettings, PolicyFailureMode, RetrySettings, S3Settings,
};
pub use error::{AppError, ErrorCategory, ErrorMetadata, LogLevel};
pub use models::{Confidentiality, Organization, ScopedRole, Space};
pub use storage_types::StorageBackend;
