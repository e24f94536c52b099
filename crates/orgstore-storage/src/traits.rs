//! Storage provider abstraction
//!
//! This module defines the StorageProvider trait that every backend variant implements,
//! and the error type shared by providers, policy management and the orchestrator.

use async_trait::async_trait;
use orgstore_core::error::codes;
use orgstore_core::naming::NameError;
use orgstore_core::{AppError, ErrorCategory, ErrorMetadata, LogLevel, Organization, Space};
use thiserror::Error;

use crate::StorageBackend;

/// Storage operation errors
#[derive(Debug, Error)]
pub enum StorageError {
    #[error(transparent)]
    InvalidName(#[from] NameError),

    #[error("Failed to load policy template '{name}': {reason}")]
    TemplateLoad { name: String, reason: String },

    #[error("Invalid policy document: {0}")]
    InvalidPolicy(String),

    /// Lookup of a policy that must exist exactly once returned zero or several matches.
    #[error("Expected exactly one policy named '{name}', found {matches}")]
    PolicyAmbiguous { name: String, matches: usize },

    #[error("'{0}' already exists")]
    AlreadyExists(String),

    #[error("Organization storage '{organization}' does not exist")]
    OrganizationStorageMissing { organization: String },

    #[error("Permission denied by storage provider ({code}): {message}")]
    PermissionDenied { code: String, message: String },

    #[error("Name '{name}' is already taken at the storage provider: {message}")]
    NameConflict { name: String, message: String },

    #[error("Unknown storage provider error: {0}")]
    Unknown(String),

    /// Provider state not yet usable; retried by the caller.
    #[error("Resource not ready: {0}")]
    NotReady(String),

    #[error("{operation} failed after {attempts} attempts: {last_error}")]
    RetryExhausted {
        operation: String,
        attempts: u32,
        #[source]
        last_error: Box<StorageError>,
    },

    #[error("{operation} exceeded its deadline after {attempts} attempts")]
    DeadlineExceeded {
        operation: String,
        attempts: u32,
        last_error: Option<Box<StorageError>>,
    },

    #[error("{operation} cancelled after {attempts} attempts")]
    Cancelled { operation: String, attempts: u32 },

    #[error("Storage backend error: {0}")]
    BackendError(String),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    ConfigError(String),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

impl StorageError {
    /// The error that ended a retried operation, if any.
    pub fn last_error(&self) -> Option<&StorageError> {
        match self {
            StorageError::RetryExhausted { last_error, .. } => Some(last_error),
            StorageError::DeadlineExceeded { last_error, .. } => last_error.as_deref(),
            _ => None,
        }
    }
}

impl ErrorMetadata for StorageError {
    fn error_code(&self) -> u32 {
        match self {
            StorageError::InvalidName(_) => codes::INVALID_NAME,
            StorageError::TemplateLoad { .. } => codes::TEMPLATE_LOAD,
            StorageError::PolicyAmbiguous { matches: 0, .. } => codes::POLICY_NOT_FOUND,
            StorageError::PolicyAmbiguous { .. } => codes::MULTIPLE_POLICIES_FOUND,
            StorageError::OrganizationStorageMissing { .. } => codes::ORGANIZATION_STORAGE_MISSING,
            StorageError::AlreadyExists(_) => codes::ALREADY_EXISTS,
            StorageError::NameConflict { .. } => codes::NAME_TAKEN,
            StorageError::PermissionDenied { .. } => codes::PERMISSION_DENIED,
            StorageError::Unknown(_) | StorageError::InvalidPolicy(_) => codes::UNKNOWN,
            StorageError::RetryExhausted { .. } | StorageError::DeadlineExceeded { .. } => {
                codes::RETRY_EXHAUSTED
            }
            StorageError::Cancelled { .. } => codes::CANCELLED,
            StorageError::NotReady(_) | StorageError::BackendError(_) | StorageError::IoError(_) => {
                codes::BACKEND
            }
            StorageError::ConfigError(_) => codes::CONFIGURATION,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            StorageError::InvalidName(_) | StorageError::OrganizationStorageMissing { .. } => {
                ErrorCategory::BadRequest
            }
            StorageError::PolicyAmbiguous { .. }
            | StorageError::AlreadyExists(_)
            | StorageError::NameConflict { .. } => ErrorCategory::Conflict,
            StorageError::PermissionDenied { .. }
            | StorageError::RetryExhausted { .. }
            | StorageError::DeadlineExceeded { .. }
            | StorageError::NotReady(_)
            | StorageError::BackendError(_)
            | StorageError::IoError(_) => ErrorCategory::BadGateway,
            StorageError::TemplateLoad { .. }
            | StorageError::InvalidPolicy(_)
            | StorageError::Unknown(_)
            | StorageError::Cancelled { .. }
            | StorageError::ConfigError(_) => ErrorCategory::Internal,
        }
    }

    fn client_message(&self) -> String {
        match self {
            StorageError::TemplateLoad { name, .. } => {
                format!("unable to load policy template '{}'.", name)
            }
            StorageError::PolicyAmbiguous { name, matches: 0 } => {
                format!("unable to find policy '{}'.", name)
            }
            StorageError::PolicyAmbiguous { name, .. } => {
                format!("multiple policies found for '{}'.", name)
            }
            StorageError::IoError(_) => "storage backend error.".to_string(),
            StorageError::ConfigError(_) => "storage is not configured correctly.".to_string(),
            other => other.to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            StorageError::InvalidName(_) => LogLevel::Debug,
            // shutdown interrupting a retry wait is not a backend failure
            StorageError::AlreadyExists(_) | StorageError::Cancelled { .. } => LogLevel::Warn,
            _ => LogLevel::Error,
        }
    }
}

impl From<StorageError> for AppError {
    fn from(err: StorageError) -> Self {
        match err {
            StorageError::InvalidName(e) => AppError::InvalidName(e),
            other => AppError::provisioning(&other),
        }
    }
}

/// Storage provider abstraction
///
/// Each backend (managed cloud blob storage, prefix-emulated object storage, local
/// filesystem) materializes organizations and spaces in its own way. Creation is
/// idempotent: an existing resource is logged and left untouched. Deleting an absent
/// resource succeeds.
#[async_trait]
pub trait StorageProvider: Send + Sync {
    /// Create the storage resource for an organization.
    async fn create_organization_storage(&self, organization: &Organization) -> StorageResult<()>;

    /// Create the loadingzone space of an organization.
    async fn create_loadingzone(&self, organization: &Organization) -> StorageResult<()>;

    /// Create the storage resource for a space. The parent organization must exist.
    /// Returns `false` when the space already existed.
    async fn create_space_storage(&self, space: &Space) -> StorageResult<bool>;

    /// Delete an organization and everything stored under it.
    async fn delete_organization_storage(&self, organization: &Organization) -> StorageResult<()>;

    /// Delete a space and everything stored under it.
    async fn delete_space_storage(&self, space: &Space) -> StorageResult<()>;

    /// Whether `create_organization_storage` already creates the loadingzone.
    fn creates_loadingzone_with_organization(&self) -> bool {
        false
    }

    /// Get the storage backend type
    fn backend_type(&self) -> StorageBackend;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_policy_ambiguous_codes() {
        let missing = StorageError::PolicyAmbiguous {
            name: "spc_all_public".to_string(),
            matches: 0,
        };
        assert_eq!(missing.error_code(), 20051);
        assert_eq!(missing.http_status_code(), 409);
        assert_eq!(missing.client_message(), "unable to find policy 'spc_all_public'.");

        let multiple = StorageError::PolicyAmbiguous {
            name: "spc_all_public".to_string(),
            matches: 2,
        };
        assert_eq!(multiple.error_code(), 20052);
    }

    #[test]
    fn test_retry_exhausted_keeps_last_error() {
        let err = StorageError::RetryExhausted {
            operation: "create container".to_string(),
            attempts: 3,
            last_error: Box::new(StorageError::NotReady("Creating".to_string())),
        };
        assert_eq!(err.error_code(), 50002);
        assert_eq!(err.category(), ErrorCategory::BadGateway);
        assert!(matches!(err.last_error(), Some(StorageError::NotReady(_))));
        assert!(err.to_string().contains("Creating"));
    }

    #[test]
    fn test_cancelled_is_reported_but_not_logged_as_failure() {
        let err = StorageError::Cancelled {
            operation: "create blob container".to_string(),
            attempts: 1,
        };
        assert_eq!(err.error_code(), 50003);
        assert_eq!(err.log_level(), LogLevel::Warn);

        let app: AppError = err.into();
        assert_eq!(app.log_level(), LogLevel::Warn);
    }

    #[test]
    fn test_conversion_into_app_error() {
        let app: AppError = StorageError::PermissionDenied {
            code: "AuthorizationFailed".to_string(),
            message: "no".to_string(),
        }
        .into();
        assert_eq!(app.error_code(), 50000);
        assert_eq!(app.http_status_code(), 502);

        let app: AppError = StorageError::from(NameError::Empty { kind: "space" }).into();
        assert!(matches!(app, AppError::InvalidName(_)));
    }

    #[test]
    fn test_missing_organization_is_bad_request() {
        let err = StorageError::OrganizationStorageMissing {
            organization: "acme".to_string(),
        };
        assert_eq!(err.error_code(), 20061);
        assert_eq!(err.http_status_code(), 400);
    }
}
