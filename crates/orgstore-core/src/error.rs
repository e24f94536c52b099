//! Error types module
//!
//! Errors are described by a numeric error code, a classification category and
//! a client message. Library crates implement [`ErrorMetadata`] for their own
//! error enums; the API layer only ever renders the metadata.

use crate::naming::NameError;

/// Log level for error reporting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogLevel {
    /// Debug level - for expected errors like validation failures
    Debug,
    /// Warning level - for recoverable issues
    Warn,
    /// Error level - for unexpected failures
    Error,
}

/// Classification of a fatal error as seen by callers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorCategory {
    BadRequest,
    Unauthorized,
    Forbidden,
    Conflict,
    BadGateway,
    Internal,
}

impl ErrorCategory {
    pub fn http_status_code(self) -> u16 {
        match self {
            ErrorCategory::BadRequest => 400,
            ErrorCategory::Unauthorized => 401,
            ErrorCategory::Forbidden => 403,
            ErrorCategory::Conflict => 409,
            ErrorCategory::BadGateway => 502,
            ErrorCategory::Internal => 500,
        }
    }

    pub fn reason_phrase(self) -> &'static str {
        match self {
            ErrorCategory::BadRequest => "Bad Request",
            ErrorCategory::Unauthorized => "Unauthorized",
            ErrorCategory::Forbidden => "Forbidden",
            ErrorCategory::Conflict => "Conflict",
            ErrorCategory::BadGateway => "Bad Gateway",
            ErrorCategory::Internal => "Internal Server Error",
        }
    }
}

/// Metadata for error responses - defines how an error should be presented
pub trait ErrorMetadata {
    /// Numeric error code (e.g. 20031)
    fn error_code(&self) -> u32;

    /// Classification category
    fn category(&self) -> ErrorCategory;

    /// Client-facing message (may differ from internal error message)
    fn client_message(&self) -> String;

    /// Log level for this error
    fn log_level(&self) -> LogLevel;

    /// HTTP status code to return
    fn http_status_code(&self) -> u16 {
        self.category().http_status_code()
    }
}

/// Numeric codes, grouped by origin.
pub mod codes {
    pub const INVALID_NAME: u32 = 20001;
    pub const INSUFFICIENT_PRIVILEGE: u32 = 20031;
    pub const TEMPLATE_LOAD: u32 = 20041;
    pub const POLICY_NOT_FOUND: u32 = 20051;
    pub const MULTIPLE_POLICIES_FOUND: u32 = 20052;
    pub const ORGANIZATION_STORAGE_MISSING: u32 = 20061;
    pub const ALREADY_EXISTS: u32 = 40000;
    pub const NAME_TAKEN: u32 = 40001;
    pub const UNAUTHENTICATED: u32 = 40101;
    pub const PERMISSION_DENIED: u32 = 50000;
    pub const UNKNOWN: u32 = 50001;
    pub const RETRY_EXHAUSTED: u32 = 50002;
    pub const CANCELLED: u32 = 50003;
    pub const BACKEND: u32 = 50004;
    pub const CONFIGURATION: u32 = 50005;
}

/// API-facing error union.
#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("insufficient privilege")]
    InsufficientPrivilege,

    #[error("Unauthorized: {0}")]
    Unauthorized(String),

    #[error(transparent)]
    InvalidName(#[from] NameError),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Internal error: {0}")]
    Internal(String),

    /// A classified failure raised by a storage operation.
    #[error("{code}: {message}")]
    Provisioning {
        code: u32,
        category: ErrorCategory,
        message: String,
        log_level: LogLevel,
    },
}

impl AppError {
    /// Capture the metadata of any classified error.
    pub fn provisioning<E: ErrorMetadata + std::fmt::Display>(err: &E) -> Self {
        AppError::Provisioning {
            code: err.error_code(),
            category: err.category(),
            message: err.client_message(),
            log_level: err.log_level(),
        }
    }

    pub fn error_type(&self) -> &'static str {
        match self {
            AppError::InsufficientPrivilege => "InsufficientPrivilege",
            AppError::Unauthorized(_) => "Unauthorized",
            AppError::InvalidName(_) => "InvalidName",
            AppError::InvalidInput(_) => "InvalidInput",
            AppError::Internal(_) => "Internal",
            AppError::Provisioning { .. } => "Provisioning",
        }
    }
}

impl From<anyhow::Error> for AppError {
    fn from(err: anyhow::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::InvalidInput(format!("JSON parsing error: {}", err))
    }
}

impl ErrorMetadata for AppError {
    fn error_code(&self) -> u32 {
        match self {
            AppError::InsufficientPrivilege => codes::INSUFFICIENT_PRIVILEGE,
            AppError::Unauthorized(_) => codes::UNAUTHENTICATED,
            AppError::InvalidName(_) | AppError::InvalidInput(_) => codes::INVALID_NAME,
            AppError::Internal(_) => codes::UNKNOWN,
            AppError::Provisioning { code, .. } => *code,
        }
    }

    fn category(&self) -> ErrorCategory {
        match self {
            AppError::InsufficientPrivilege => ErrorCategory::Forbidden,
            AppError::Unauthorized(_) => ErrorCategory::Unauthorized,
            AppError::InvalidName(_) | AppError::InvalidInput(_) => ErrorCategory::BadRequest,
            AppError::Internal(_) => ErrorCategory::Internal,
            AppError::Provisioning { category, .. } => *category,
        }
    }

    fn client_message(&self) -> String {
        match self {
            AppError::Internal(_) => "unknown error.".to_string(),
            AppError::Provisioning { message, .. } => message.clone(),
            other => other.to_string(),
        }
    }

    fn log_level(&self) -> LogLevel {
        match self {
            AppError::InsufficientPrivilege
            | AppError::Unauthorized(_)
            | AppError::InvalidName(_)
            | AppError::InvalidInput(_) => LogLevel::Debug,
            AppError::Internal(_) => LogLevel::Error,
            AppError::Provisioning { log_level, .. } => *log_level,
        }
    }
}
