use crate::error::HttpAppError;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use orgstore_core::AppError;
use serde::{Deserialize, Serialize};

/// Realm-level roles granted by the identity provider.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RealmAccess {
    #[serde(default)]
    pub roles: Vec<String>,
}

/// JWT claims structure
#[derive(Debug, Serialize, Deserialize)]
pub struct JwtClaims {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sub: Option<String>,
    pub exp: i64, // expiration timestamp
    #[serde(default)]
    pub realm_access: RealmAccess,
}

/// Caller identity extracted from the bearer token and stored in request extensions
#[derive(Debug, Clone)]
pub struct CallerContext {
    pub subject: Option<String>,
    pub roles: Vec<String>,
}

impl From<JwtClaims> for CallerContext {
    fn from(claims: JwtClaims) -> Self {
        Self {
            subject: claims.sub,
            roles: claims.realm_access.roles,
        }
    }
}

impl CallerContext {
    /// Role names compare case-insensitively.
    pub fn has_role(&self, role: &str) -> bool {
        self.roles.iter().any(|r| r.eq_ignore_ascii_case(role))
    }

    pub fn require_role(&self, role: &str) -> Result<(), AppError> {
        if self.has_role(role) {
            return Ok(());
        }
        tracing::warn!(
            subject = ?self.subject,
            required_role = role,
            "Caller lacks required role"
        );
        Err(AppError::InsufficientPrivilege)
    }
}

impl<S> FromRequestParts<S> for CallerContext
where
    S: Send + Sync,
{
    type Rejection = HttpAppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<CallerContext>()
            .cloned()
            .ok_or_else(|| {
                HttpAppError(AppError::Unauthorized("Missing caller context".to_string()))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn caller(roles: &[&str]) -> CallerContext {
        CallerContext {
            subject: Some("user-1".to_string()),
            roles: roles.iter().map(|r| r.to_string()).collect(),
        }
    }

    #[test]
    fn test_role_match_ignores_case() {
        let ctx = caller(&["sdk_admin"]);
        assert!(ctx.has_role("SDK_ADMIN"));
        assert!(ctx.require_role("SDK_ADMIN").is_ok());
    }

    #[test]
    fn test_missing_role_is_insufficient_privilege() {
        let ctx = caller(&["viewer"]);
        let err = ctx.require_role("org_create_permission").unwrap_err();
        assert!(matches!(err, AppError::InsufficientPrivilege));
    }

    #[test]
    fn test_claims_without_realm_access_have_no_roles() {
        let claims: JwtClaims = serde_json::from_str(r#"{"exp": 1}"#).unwrap();
        let ctx = CallerContext::from(claims);
        assert!(ctx.roles.is_empty());
        assert!(ctx.subject.is_none());
    }
}
