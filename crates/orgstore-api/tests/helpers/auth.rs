//! Bearer tokens for tests.

use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use orgstore_api::auth::{JwtClaims, RealmAccess};

pub const TEST_JWT_SECRET: &str = "integration-test-secret-with-32-chars-min";

pub const SUPERUSER: &str = "SDK_ADMIN";
pub const ORG_CREATOR: &str = "org_create_permission";

/// Sign a token carrying the given realm roles.
pub fn token_with_roles(roles: &[&str]) -> String {
    let claims = JwtClaims {
        sub: Some("test-user".to_string()),
        exp: chrono::Utc::now().timestamp() + 3600,
        realm_access: RealmAccess {
            roles: roles.iter().map(|r| r.to_string()).collect(),
        },
    };
    encode(
        &Header::new(Algorithm::HS256),
        &claims,
        &EncodingKey::from_secret(TEST_JWT_SECRET.as_bytes()),
    )
    .expect("Failed to sign test token")
}

pub fn bearer(token: &str) -> String {
    format!("Bearer {}", token)
}
