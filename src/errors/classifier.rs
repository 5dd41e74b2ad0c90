//! Baseline "known vs. unknown" decision for caught errors.
//!
//! The translator asks an [`ExceptionClassifier`] for the status and default body of an error.
//! Returning `None` means the error is unknown and gets the generic 500 answer.

use axum::http::StatusCode;
use serde_json::{json, Value};

use super::caught::{CaughtError, ExceptionDetail};
use super::codes::ApiExceptionKind;

/// Status and body the framework would answer with on its own
#[derive(Debug, Clone, PartialEq)]
pub struct Classification {
    pub status: StatusCode,
    pub body: Value,
}

impl Classification {
    pub fn new(status: StatusCode, body: Value) -> Self {
        Self { status, body }
    }
}

pub trait ExceptionClassifier: Send + Sync {
    /// Baseline response for `error`, or `None` when there is no registered mapping
    fn classify(&self, error: &CaughtError) -> Option<Classification>;
}

type Matcher = Box<dyn Fn(&anyhow::Error) -> bool + Send + Sync>;

/// Built-in classifier.
///
/// Knows every variant except [`CaughtError::Unhandled`]. Concrete error types carried by an
/// unhandled error can be given a status with [`DefaultClassifier::register`].
#[derive(Default)]
pub struct DefaultClassifier {
    registered: Vec<(Matcher, StatusCode)>,
}

impl DefaultClassifier {
    pub fn new() -> Self {
        Self::default()
    }

    /// Answer errors of type `E` (found anywhere in the `anyhow` chain) with `status`
    pub fn register<E>(mut self, status: StatusCode) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        let matcher: Matcher =
            Box::new(|error: &anyhow::Error| error.chain().any(|cause| cause.is::<E>()));
        self.registered.push((matcher, status));
        self
    }

    fn classify_registered(&self, error: &anyhow::Error) -> Option<Classification> {
        self.registered
            .iter()
            .find(|(matches, _)| matches(error))
            .map(|(_, status)| Classification::new(*status, json!({ "detail": error.to_string() })))
    }
}

impl std::fmt::Debug for DefaultClassifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DefaultClassifier")
            .field("registered", &self.registered.len())
            .finish()
    }
}

impl ExceptionClassifier for DefaultClassifier {
    fn classify(&self, error: &CaughtError) -> Option<Classification> {
        match error {
            CaughtError::ModelValidation(err) => Some(Classification::new(
                StatusCode::BAD_REQUEST,
                err.clone().into_detail().to_value(),
            )),
            CaughtError::Validation(detail) => {
                Some(Classification::new(StatusCode::BAD_REQUEST, detail.to_value()))
            }
            CaughtError::NotFound(_) => Some(Classification::new(
                StatusCode::NOT_FOUND,
                json!({ "detail": ApiExceptionKind::NotFound.default_detail() }),
            )),
            CaughtError::PermissionDenied(_) => Some(Classification::new(
                StatusCode::FORBIDDEN,
                json!({ "detail": ApiExceptionKind::PermissionDenied.default_detail() }),
            )),
            CaughtError::Api(exc) => {
                let body = match exc.detail() {
                    ExceptionDetail::Text(text) => json!({ "detail": text }),
                    ExceptionDetail::Structured(value) => value.clone(),
                };
                Some(Classification::new(exc.status(), body))
            }
            CaughtError::Unhandled(err) => self.classify_registered(err),
        }
    }
}
