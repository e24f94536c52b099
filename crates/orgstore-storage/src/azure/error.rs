//! Translation of Azure management failures into classified storage errors.
//!
//! All parsing of management error responses happens in [`parse_management_failure`].
//! Three shapes are known:
//!
//! - ARM envelope: `{"error":{"code":"AuthorizationFailed","message":"..."}}`
//! - flat body: `{"code":"StorageAccountAlreadyTaken","message":"..."}`
//! - legacy SDK text: `Status code 403, {"error":{"code":"...","message":"..."}}`
//!
//! Anything else keeps the raw text as message with an empty code.

use std::sync::LazyLock;

use regex::Regex;
use serde::Deserialize;

use crate::traits::StorageError;

static STATUS_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)status\s*code[:=]?\s*(\d{3})").expect("valid status code pattern")
});

static CODE_AND_MESSAGE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\{"code":"([^"]+)","message":"([^"]+)"\}"#).expect("valid error body pattern")
});

const PERMISSION_CODES: [&str; 3] = [
    "AuthorizationFailed",
    "LinkedAuthorizationFailed",
    "AuthorizationPermissionMismatch",
];

const NAME_CONFLICT_CODES: [&str; 2] = ["StorageAccountAlreadyTaken", "AccountAlreadyExists"];

/// Classification of a management failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureKind {
    PermissionDenied,
    NameConflict,
    Unknown,
}

/// A failed management request after parsing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagementFailure {
    pub status: Option<u16>,
    pub code: String,
    pub message: String,
}

#[derive(Deserialize)]
struct ErrorDetail {
    code: String,
    #[serde(default)]
    message: String,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum ErrorBody {
    Envelope { error: ErrorDetail },
    Flat(ErrorDetail),
}

fn parse_json(text: &str) -> Option<ErrorDetail> {
    match serde_json::from_str::<ErrorBody>(text).ok()? {
        ErrorBody::Envelope { error } => Some(error),
        ErrorBody::Flat(detail) => Some(detail),
    }
}

/// Parse a management failure from an HTTP status (if known) and the response text.
pub fn parse_management_failure(status: Option<u16>, body: &str) -> ManagementFailure {
    let body = body.trim();

    let status = status.or_else(|| {
        STATUS_CODE
            .captures(body)
            .and_then(|c| c.get(1))
            .and_then(|m| m.as_str().parse().ok())
    });

    let detail = parse_json(body).or_else(|| {
        // legacy text carries the JSON after a prefix
        body.find('{')
            .and_then(|start| parse_json(&body[start..]))
            .or_else(|| {
                CODE_AND_MESSAGE.captures(body).map(|c| ErrorDetail {
                    code: c[1].to_string(),
                    message: c[2].to_string(),
                })
            })
    });

    match detail {
        Some(detail) => ManagementFailure {
            status,
            code: detail.code,
            message: detail.message,
        },
        None => ManagementFailure {
            status,
            code: String::new(),
            message: body.to_string(),
        },
    }
}

impl ManagementFailure {
    pub fn kind(&self) -> FailureKind {
        let code = self.code.as_str();
        if self.status == Some(403) || PERMISSION_CODES.contains(&code) {
            FailureKind::PermissionDenied
        } else if self.status == Some(409) || NAME_CONFLICT_CODES.contains(&code) {
            FailureKind::NameConflict
        } else {
            FailureKind::Unknown
        }
    }

    /// Convert into a storage error; `resource` names the account or container involved.
    pub fn into_storage_error(self, resource: &str) -> StorageError {
        match self.kind() {
            FailureKind::PermissionDenied => StorageError::PermissionDenied {
                code: self.code,
                message: self.message,
            },
            FailureKind::NameConflict => StorageError::NameConflict {
                name: resource.to_string(),
                message: format!("{} - {}", self.code, self.message),
            },
            FailureKind::Unknown => StorageError::Unknown(match self.status {
                Some(status) => format!("{} ({}): {} {}", resource, status, self.code, self.message),
                None => format!("{}: {} {}", resource, self.code, self.message),
            }),
        }
    }
}
