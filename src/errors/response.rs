use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::sync::Arc;
use utoipa::ToSchema;

use super::caught::{ApiException, CaughtError, ModelValidationError, ValidationDetail};
use super::translator::{INTERNAL_ERROR_CODE, INTERNAL_ERROR_MESSAGE};

/// Body of every error response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorEnvelope {
    pub error: ErrorBody,
}

/// Error details
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct ErrorBody {
    /// Stable machine-readable error code
    pub code: String,
    /// Human-readable summary
    pub message: String,
    /// Validation payload, only present for `validation_error`
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schema(value_type = Option<Object>)]
    pub details: Option<Value>,
}

impl ErrorEnvelope {
    pub fn new(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
                details: None,
            },
        }
    }

    pub fn with_details(code: impl Into<String>, message: impl Into<String>, details: Value) -> Self {
        Self {
            error: ErrorBody {
                code: code.into(),
                message: message.into(),
                details: Some(details),
            },
        }
    }
}

/// Error stashed in response extensions until the exception middleware translates it
#[derive(Debug, Clone)]
pub struct PendingError(pub Arc<CaughtError>);

/// Handler-facing error type.
///
/// Handlers return `Result<T, ApiError>` and propagate with `?`. The response produced here is a
/// placeholder; the exception middleware replaces it with the translated one.
#[derive(Debug)]
pub struct ApiError(pub CaughtError);

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let mut response = (
            StatusCode::INTERNAL_SERVER_ERROR,
            Json(ErrorEnvelope::new(INTERNAL_ERROR_CODE, INTERNAL_ERROR_MESSAGE)),
        )
            .into_response();
        response
            .extensions_mut()
            .insert(PendingError(Arc::new(self.0)));
        response
    }
}

impl<E> From<E> for ApiError
where
    E: Into<CaughtError>,
{
    fn from(error: E) -> Self {
        Self(error.into())
    }
}

/// Helpers for raising common errors from handlers
impl ApiError {
    pub fn not_found() -> Self {
        Self(CaughtError::not_found())
    }

    pub fn validation(detail: ValidationDetail) -> Self {
        Self(CaughtError::Validation(detail))
    }

    pub fn model_validation(error: ModelValidationError) -> Self {
        Self(CaughtError::ModelValidation(error))
    }

    pub fn api(exception: ApiException) -> Self {
        Self(CaughtError::Api(exception))
    }

    pub fn internal(error: impl Into<anyhow::Error>) -> Self {
        Self(CaughtError::Unhandled(error.into()))
    }
}
