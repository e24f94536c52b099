//! Application setup and initialization
//!
//! Kept out of main.rs so integration tests can build the same router.

pub mod routes;
pub mod server;
pub mod storage;

use crate::state::AppState;
use anyhow::{Context, Result};
use orgstore_core::Config;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

/// Initialize the entire application
///
/// `cancel` is handed to the storage backend so retry waits stop on shutdown.
pub async fn initialize_app(
    config: Config,
    cancel: CancellationToken,
) -> Result<(Arc<AppState>, axum::Router)> {
    // Validate configuration first - fail fast on misconfiguration
    config
        .validate()
        .context("Configuration validation failed")?;

    tracing::info!(
        environment = %config.environment,
        storage_backend = %config.storage_backend,
        policy_failure_mode = ?config.policy_failure_mode,
        "Configuration loaded and validated successfully"
    );

    let orchestrator = storage::setup_storage(&config, cancel).await?;
    let state = Arc::new(AppState::new(orchestrator, &config));
    let router = routes::setup_routes(&config, state.clone());

    Ok((state, router))
}
