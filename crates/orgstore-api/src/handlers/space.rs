use crate::auth::CallerContext;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use orgstore_core::Confidentiality;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct CreateSpaceRequest {
    pub name: String,
    /// `PUBLIC`, `INTERNAL` or `PRIVATE`; defaults to internal
    #[serde(default)]
    pub confidentiality: Confidentiality,
}

#[tracing::instrument(
    skip_all,
    fields(
        organization = %organization,
        space = %payload.name,
        confidentiality = %payload.confidentiality,
        operation = "create_space_context"
    )
)]
pub async fn create_space_context(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Path(organization): Path<String>,
    ValidatedJson(payload): ValidatedJson<CreateSpaceRequest>,
) -> Result<StatusCode, HttpAppError> {
    caller.require_role(&state.roles.superuser)?;

    state
        .orchestrator
        .create_space_storage(&organization, &payload.name, payload.confidentiality)
        .await?;

    Ok(StatusCode::OK)
}

#[tracing::instrument(
    skip_all,
    fields(organization = %organization, space = %space, operation = "delete_space_context")
)]
pub async fn delete_space_context(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Path((organization, space)): Path<(String, String)>,
) -> Result<StatusCode, HttpAppError> {
    caller.require_role(&state.roles.superuser)?;

    state
        .orchestrator
        .delete_space_storage(&organization, &space)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
