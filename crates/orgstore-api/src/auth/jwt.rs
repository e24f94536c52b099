use crate::auth::models::JwtClaims;
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use orgstore_core::AppError;

/// Validates HS256 bearer tokens signed with the shared secret.
#[derive(Clone)]
pub struct JwtValidator {
    decoding_key: DecodingKey,
    validation: Validation,
}

impl JwtValidator {
    pub fn new(secret: &str) -> Self {
        let mut validation = Validation::new(Algorithm::HS256);
        validation.validate_exp = true;
        validation.validate_nbf = true;
        validation.leeway = 0;

        Self {
            decoding_key: DecodingKey::from_secret(secret.as_bytes()),
            validation,
        }
    }

    /// Validate and decode a token
    pub fn validate_token(&self, token: &str) -> Result<JwtClaims, AppError> {
        let token_data =
            decode::<JwtClaims>(token, &self.decoding_key, &self.validation).map_err(|e| {
                tracing::debug!("JWT validation failed: {}", e);
                match e.kind() {
                    jsonwebtoken::errors::ErrorKind::ExpiredSignature => {
                        AppError::Unauthorized("Token has expired".to_string())
                    }
                    jsonwebtoken::errors::ErrorKind::ImmatureSignature => {
                        AppError::Unauthorized("Token is not yet valid (nbf)".to_string())
                    }
                    jsonwebtoken::errors::ErrorKind::InvalidSignature => {
                        AppError::Unauthorized("Invalid token signature".to_string())
                    }
                    _ => AppError::Unauthorized(format!("Invalid token: {}", e)),
                }
            })?;

        Ok(token_data.claims)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::auth::models::RealmAccess;
    use jsonwebtoken::{encode, EncodingKey, Header};

    const SECRET: &str = "a-test-secret-that-is-at-least-32-chars";

    fn token(secret: &str, exp: i64) -> String {
        let claims = JwtClaims {
            sub: Some("user-1".to_string()),
            exp,
            realm_access: RealmAccess {
                roles: vec!["SDK_ADMIN".to_string()],
            },
        };
        encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .unwrap()
    }

    fn in_one_hour() -> i64 {
        chrono::Utc::now().timestamp() + 3600
    }

    #[test]
    fn test_valid_token_yields_roles() {
        let validator = JwtValidator::new(SECRET);
        let claims = validator.validate_token(&token(SECRET, in_one_hour())).unwrap();
        assert_eq!(claims.realm_access.roles, vec!["SDK_ADMIN"]);
    }

    #[test]
    fn test_wrong_secret_rejected() {
        let validator = JwtValidator::new(SECRET);
        let other = token("another-secret-that-is-at-least-32-chars", in_one_hour());
        let err = validator.validate_token(&other).unwrap_err();
        assert!(matches!(err, AppError::Unauthorized(_)));
    }

    #[test]
    fn test_expired_token_rejected() {
        let validator = JwtValidator::new(SECRET);
        let expired = token(SECRET, chrono::Utc::now().timestamp() - 60);
        let err = validator.validate_token(&expired).unwrap_err();
        assert!(err.to_string().contains("expired"));
    }
}
