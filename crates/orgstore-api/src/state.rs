//! Application state shared by all handlers.

use orgstore_core::Config;
use orgstore_storage::StorageOrchestrator;
use std::sync::Arc;

/// Roles checked by the context handlers.
#[derive(Debug, Clone)]
pub struct RoleConfig {
    /// Allowed to create and delete any storage context
    pub superuser: String,
    /// Allowed to create organization contexts
    pub org_create: String,
}

impl RoleConfig {
    pub fn from_config(config: &Config) -> Self {
        Self {
            superuser: config.superuser_role.clone(),
            org_create: config.org_create_role.clone(),
        }
    }
}

pub struct AppState {
    pub orchestrator: Arc<StorageOrchestrator>,
    pub roles: RoleConfig,
}

impl AppState {
    pub fn new(orchestrator: Arc<StorageOrchestrator>, config: &Config) -> Self {
        Self {
            orchestrator,
            roles: RoleConfig::from_config(config),
        }
    }
}
