//! HTTP error response conversion
//!
//! Handlers return `Result<_, HttpAppError>`. Anything convertible into `AppError`
//! (storage errors included) renders as a JSON body with the numeric error code
//! and the status of its category.

use axum::{
    extract::rejection::JsonRejection,
    extract::{FromRequest, Request},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use chrono::{DateTime, Utc};
use orgstore_core::{AppError, ErrorMetadata, LogLevel};
use orgstore_storage::StorageError;
use serde::{de::DeserializeOwned, Serialize};

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorResponse {
    pub timestamp: DateTime<Utc>,
    /// HTTP status code
    pub status: u16,
    /// Reason phrase of the status
    pub error: String,
    /// Machine-readable error code for programmatic handling
    pub error_code: u32,
    pub message: String,
}

impl ErrorResponse {
    pub fn from_error(error: &AppError) -> Self {
        let category = error.category();
        Self {
            timestamp: Utc::now(),
            status: category.http_status_code(),
            error: category.reason_phrase().to_string(),
            error_code: error.error_code(),
            message: error.client_message(),
        }
    }
}

/// Wrapper type for AppError to implement IntoResponse
/// This is necessary because of Rust's orphan rules - we can't implement
/// IntoResponse (external trait) for AppError (external type from orgstore-core)
#[derive(Debug)]
pub struct HttpAppError(pub AppError);

impl From<AppError> for HttpAppError {
    fn from(err: AppError) -> Self {
        HttpAppError(err)
    }
}

impl From<StorageError> for HttpAppError {
    fn from(err: StorageError) -> Self {
        tracing::debug!(error = %err, "Storage operation failed");
        HttpAppError(err.into())
    }
}

impl From<anyhow::Error> for HttpAppError {
    fn from(err: anyhow::Error) -> Self {
        HttpAppError(err.into())
    }
}

/// Convert JSON body deserialization failures into a 400 with our ErrorResponse format.
impl From<JsonRejection> for HttpAppError {
    fn from(rejection: JsonRejection) -> Self {
        HttpAppError(AppError::InvalidInput(format!(
            "Invalid request body: {}",
            rejection.body_text()
        )))
    }
}

/// JSON body extractor that returns our ErrorResponse format (400 + JSON) on deserialization failure.
#[derive(Debug, Clone, Copy)]
pub struct ValidatedJson<T>(pub T);

impl<T, S> FromRequest<S> for ValidatedJson<T>
where
    T: DeserializeOwned + Send,
    S: Send + Sync,
    Json<T>: FromRequest<S, Rejection = JsonRejection>,
{
    type Rejection = HttpAppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(inner) = Json::<T>::from_request(req, state)
            .await
            .map_err(HttpAppError::from)?;
        Ok(ValidatedJson(inner))
    }
}

fn log_error(error: &AppError) {
    let error_type = error.error_type();
    let error_code = error.error_code();
    match error.log_level() {
        LogLevel::Debug => {
            tracing::debug!(error = %error, error_type, error_code, "Request failed");
        }
        LogLevel::Warn => {
            tracing::warn!(error = %error, error_type, error_code, "Request failed");
        }
        LogLevel::Error => {
            tracing::error!(error = %error, error_type, error_code, "Request failed");
        }
    }
}

impl IntoResponse for HttpAppError {
    fn into_response(self) -> Response {
        let app_error = &self.0;
        log_error(app_error);

        let status = StatusCode::from_u16(app_error.http_status_code())
            .unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        (status, Json(ErrorResponse::from_error(app_error))).into_response()
    }
}
