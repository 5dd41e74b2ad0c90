//! Translation of caught errors into the uniform error envelope.
//!
//! Rules are evaluated top to bottom, first match wins:
//!
//! 1. a model validation error is normalized into a handler validation error;
//! 2. the classifier decides whether the error is known; unknown errors go to the unhandled path;
//! 3. validation errors become `validation_error` and carry the payload as `details`;
//! 4. not-found errors become `not_found`;
//! 5. framework errors use their default code and their own detail when it is a plain string;
//! 6. everything else the classifier knows becomes `error_{status}`.
//!
//! Exactly one summary record is logged per translation. The unhandled path also logs the raw
//! error at debug level, which is the only place the original error text ends up.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::Value;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use super::caught::{CaughtError, ErrorKind, ExceptionDetail};
use super::classifier::{Classification, DefaultClassifier, ExceptionClassifier};
use super::response::ErrorEnvelope;

pub const VALIDATION_ERROR_CODE: &str = "validation_error";
pub const VALIDATION_ERROR_MESSAGE: &str = "Invalid input data.";
pub const NOT_FOUND_CODE: &str = "not_found";
pub const NOT_FOUND_MESSAGE: &str = "Resource not found.";
pub const INTERNAL_ERROR_CODE: &str = "internal_error";
pub const INTERNAL_ERROR_MESSAGE: &str = "An unexpected error occurred.";
pub const GENERIC_ERROR_MESSAGE: &str = "An error occurred.";

/// What the dispatch layer knows about the request that failed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestContext {
    /// Identifier of the handler that raised, `"unknown"` when it cannot be determined
    pub handler: String,
    pub method: String,
    pub path: String,
}

impl Default for RequestContext {
    fn default() -> Self {
        Self {
            handler: "unknown".to_string(),
            method: String::new(),
            path: String::new(),
        }
    }
}

impl RequestContext {
    pub fn new(handler: impl Into<String>) -> Self {
        Self {
            handler: handler.into(),
            ..Self::default()
        }
    }

    pub fn with_request(mut self, method: impl Into<String>, path: impl Into<String>) -> Self {
        self.method = method.into();
        self.path = path.into();
        self
    }
}

/// Status code plus envelope, ready to be sent
#[derive(Debug, Clone, PartialEq)]
pub struct Translation {
    pub status: StatusCode,
    pub envelope: ErrorEnvelope,
}

impl IntoResponse for Translation {
    fn into_response(self) -> Response {
        (self.status, Json(self.envelope)).into_response()
    }
}

/// Shareable translator bound to a classifier
#[derive(Clone)]
pub struct ErrorTranslator {
    classifier: Arc<dyn ExceptionClassifier>,
}

impl Default for ErrorTranslator {
    fn default() -> Self {
        Self::new(DefaultClassifier::new())
    }
}

impl std::fmt::Debug for ErrorTranslator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ErrorTranslator").finish_non_exhaustive()
    }
}

impl ErrorTranslator {
    pub fn new(classifier: impl ExceptionClassifier + 'static) -> Self {
        Self {
            classifier: Arc::new(classifier),
        }
    }

    pub fn translate(&self, error: &CaughtError, context: &RequestContext) -> Translation {
        translate(error, context, self.classifier.as_ref())
    }
}

/// Translate `error` into a status and envelope, logging the outcome.
///
/// Never panics: a classifier that panics is treated as having no mapping.
pub fn translate(
    error: &CaughtError,
    context: &RequestContext,
    classifier: &dyn ExceptionClassifier,
) -> Translation {
    let normalized;
    let error = match error {
        CaughtError::ModelValidation(err) => {
            normalized = CaughtError::Validation(err.clone().into_detail());
            &normalized
        }
        other => other,
    };

    let classification = panic::catch_unwind(AssertUnwindSafe(|| classifier.classify(error)))
        .ok()
        .flatten();

    match classification {
        Some(classification) => translate_known(error, classification),
        None => translate_unhandled(error, context),
    }
}

fn translate_known(error: &CaughtError, classification: Classification) -> Translation {
    let Classification { status, body } = classification;

    let (code, message, details) = match (error.kind(), error) {
        (ErrorKind::ValidationFailure, _) => (
            VALIDATION_ERROR_CODE.to_string(),
            VALIDATION_ERROR_MESSAGE.to_string(),
            Some(body),
        ),
        (ErrorKind::NotFound, _) => (NOT_FOUND_CODE.to_string(), NOT_FOUND_MESSAGE.to_string(), None),
        (ErrorKind::FrameworkKnownError, CaughtError::Api(exc)) => {
            let code = if exc.default_code().is_empty() {
                fallback_code(status)
            } else {
                exc.default_code().to_string()
            };
            let message = match exc.detail() {
                ExceptionDetail::Text(text) if !text.is_empty() => text.clone(),
                _ if !exc.default_detail().is_empty() => exc.default_detail().to_string(),
                _ => GENERIC_ERROR_MESSAGE.to_string(),
            };
            (code, message, None)
        }
        _ => (fallback_code(status), GENERIC_ERROR_MESSAGE.to_string(), None),
    };

    log_summary(status, &code, &message);

    Translation {
        status,
        envelope: build_envelope(code, message, details),
    }
}

fn translate_unhandled(error: &CaughtError, context: &RequestContext) -> Translation {
    debug!(
        handler = %context.handler,
        method = %context.method,
        path = %context.path,
        error = ?error,
        "Unhandled exception in {}: {:#}",
        context.handler,
        error
    );

    let status = StatusCode::INTERNAL_SERVER_ERROR;
    log_summary(status, INTERNAL_ERROR_CODE, INTERNAL_ERROR_MESSAGE);

    Translation {
        status,
        envelope: ErrorEnvelope::new(INTERNAL_ERROR_CODE, INTERNAL_ERROR_MESSAGE),
    }
}

fn fallback_code(status: StatusCode) -> String {
    format!("error_{}", status.as_u16())
}

fn build_envelope(code: String, message: String, details: Option<Value>) -> ErrorEnvelope {
    match details {
        Some(details) => ErrorEnvelope::with_details(code, message, details),
        None => ErrorEnvelope::new(code, message),
    }
}

fn log_summary(status: StatusCode, code: &str, message: &str) {
    let status_code = status.as_u16();
    if status_code >= 500 {
        error!(status = status_code, code, "Server error [{}]: {}", code, message);
    } else if status_code >= 400 {
        warn!(status = status_code, code, "Client error [{}]: {}", code, message);
    } else {
        info!(status = status_code, code, "Error translated [{}]: {}", code, message);
    }
}
