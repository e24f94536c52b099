//! API constants
//!
//! Route prefixes of the storage context endpoints.

/// Version segment of every context route.
pub const API_VERSION: &str = "v2.0";

/// Base path of the organization context routes.
pub const ORGANIZATION_CONTEXT_PATH: &str = "/v2.0/context/organization";

/// Liveness probe path (unauthenticated).
pub const HEALTH_PATH: &str = "/health";

/// Request bodies are tiny JSON documents.
pub const MAX_BODY_BYTES: usize = 64 * 1024;

/// Requests served at once; each may hold a provider call for the whole retry budget.
pub const HTTP_CONCURRENCY_LIMIT: usize = 256;
