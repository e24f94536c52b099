//! Storage orchestrator setup

use anyhow::{Context, Result};
use orgstore_core::Config;
use orgstore_storage::{create_orchestrator, StorageOrchestrator};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub async fn setup_storage(
    config: &Config,
    cancel: CancellationToken,
) -> Result<Arc<StorageOrchestrator>> {
    let orchestrator = create_orchestrator(config, cancel)
        .await
        .with_context(|| format!("Failed to initialize {} storage", config.storage_backend))?;

    Ok(Arc::new(orchestrator))
}
