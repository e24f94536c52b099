//! Bearer-token authentication and role checks.

pub mod jwt;
pub mod middleware;
pub mod models;

pub use jwt::JwtValidator;
pub use middleware::auth_middleware;
pub use models::{CallerContext, JwtClaims, RealmAccess};
