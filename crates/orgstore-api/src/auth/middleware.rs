use crate::auth::jwt::JwtValidator;
use crate::auth::models::CallerContext;
use crate::error::HttpAppError;
use axum::{
    extract::{Request, State},
    http::header::AUTHORIZATION,
    middleware::Next,
    response::{IntoResponse, Response},
};
use orgstore_core::AppError;
use std::sync::Arc;

/// Reject requests without a valid bearer token; otherwise attach the caller context.
pub async fn auth_middleware(
    State(validator): State<Arc<JwtValidator>>,
    mut request: Request,
    next: Next,
) -> Response {
    let auth_header = match request
        .headers()
        .get(AUTHORIZATION)
        .and_then(|h| h.to_str().ok())
    {
        Some(h) => h,
        None => {
            return HttpAppError(AppError::Unauthorized(
                "Missing authorization header".to_string(),
            ))
            .into_response();
        }
    };

    let Some(token) = auth_header.strip_prefix("Bearer ") else {
        return HttpAppError(AppError::Unauthorized(
            "Invalid authorization header format".to_string(),
        ))
        .into_response();
    };

    match validator.validate_token(token) {
        Ok(claims) => {
            let caller = CallerContext::from(claims);
            tracing::debug!(subject = ?caller.subject, roles = ?caller.roles, "Caller authenticated");
            request.extensions_mut().insert(caller);
            next.run(request).await
        }
        Err(e) => HttpAppError(e).into_response(),
    }
}
