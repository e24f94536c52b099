use crate::auth::CallerContext;
use crate::error::{HttpAppError, ValidatedJson};
use crate::state::AppState;
use axum::{
    extract::{Path, State},
    http::StatusCode,
};
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Deserialize)]
pub struct CreateOrganizationRequest {
    pub name: String,
}

/// Provision the storage of a new organization and its loadingzone.
#[tracing::instrument(
    skip_all,
    fields(organization = %payload.name, operation = "create_organization_context")
)]
pub async fn create_organization_context(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    ValidatedJson(payload): ValidatedJson<CreateOrganizationRequest>,
) -> Result<StatusCode, HttpAppError> {
    caller.require_role(&state.roles.org_create)?;

    state
        .orchestrator
        .create_organization_storage(&payload.name)
        .await?;

    Ok(StatusCode::OK)
}

/// Remove all storage of an organization.
#[tracing::instrument(
    skip_all,
    fields(organization = %organization, operation = "delete_organization_context")
)]
pub async fn delete_organization_context(
    State(state): State<Arc<AppState>>,
    caller: CallerContext,
    Path(organization): Path<String>,
) -> Result<StatusCode, HttpAppError> {
    caller.require_role(&state.roles.superuser)?;

    state
        .orchestrator
        .delete_organization_storage(&organization)
        .await?;

    Ok(StatusCode::NO_CONTENT)
}
