//! Boundary between handlers and clients: every error leaving a handler is translated here.

use axum::{
    extract::{MatchedPath, Request, State},
    http::{header, Method, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
};
use std::any::Any;
use std::sync::Arc;

use crate::api::handlers::AppState;
use crate::errors::{ApiError, ApiException, CaughtError, PendingError, RequestContext};
use crate::metrics::API_ERRORS_TOTAL;

/// Translate pending handler errors into error envelopes.
///
/// Also covers error responses produced inside the router without a JSON body, such as the bare
/// 405 for a known path or a missing docs asset.
pub async fn exception_handler(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Response {
    let method = request.method().clone();
    let path = request.uri().path().to_string();
    let handler = request
        .extensions()
        .get::<MatchedPath>()
        .map(|matched| format!("{} {}", method, matched.as_str()))
        .unwrap_or_else(|| "unknown".to_string());

    let mut response = next.run(request).await;

    let error = match response.extensions_mut().remove::<PendingError>() {
        Some(PendingError(error)) => error,
        None if is_bare_error(&response) => Arc::new(bare_error(response.status(), &method)),
        None => return response,
    };

    let context = RequestContext::new(handler).with_request(method.as_str(), path);
    let translation = state.translator.translate(&error, &context);

    API_ERRORS_TOTAL
        .with_label_values(&[
            translation.envelope.error.code.as_str(),
            translation.status.as_str(),
        ])
        .inc();

    let allow = response.headers().get(header::ALLOW).cloned();
    let mut translated = translation.into_response();
    if let Some(allow) = allow {
        translated.headers_mut().insert(header::ALLOW, allow);
    }
    translated
}

/// Error status whose body is not JSON
fn is_bare_error(response: &Response) -> bool {
    let status = response.status();
    if !(status.is_client_error() || status.is_server_error()) {
        return false;
    }
    !response
        .headers()
        .get(header::CONTENT_TYPE)
        .and_then(|value| value.to_str().ok())
        .is_some_and(|value| value.starts_with("application/json"))
}

fn bare_error(status: StatusCode, method: &Method) -> CaughtError {
    match status {
        StatusCode::NOT_FOUND => CaughtError::not_found(),
        StatusCode::METHOD_NOT_ALLOWED => ApiException::method_not_allowed(method).into(),
        other => ApiException::custom(other, "", other.canonical_reason().unwrap_or_default()).into(),
    }
}

/// Turn a handler panic into an unhandled error for [`exception_handler`]
pub fn handle_panic(payload: Box<dyn Any + Send + 'static>) -> Response {
    let message = if let Some(message) = payload.downcast_ref::<String>() {
        message.clone()
    } else if let Some(message) = payload.downcast_ref::<&str>() {
        message.to_string()
    } else {
        "non-string panic payload".to_string()
    };

    ApiError::internal(anyhow::anyhow!("handler panicked: {message}")).into_response()
}
