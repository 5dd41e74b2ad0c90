use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use std::fmt;
use utoipa::ToSchema;

/// Built-in framework errors with a registered status, code and default detail
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "snake_case")]
pub enum ApiExceptionKind {
    /// Request body could not be parsed
    ParseError,

    /// Credentials were supplied but rejected
    AuthenticationFailed,

    /// No credentials were supplied
    NotAuthenticated,

    /// Caller is not allowed to perform the action
    PermissionDenied,

    /// Resource lookup failed
    NotFound,

    /// HTTP method not supported by the route
    MethodNotAllowed,

    /// Accept header cannot be satisfied
    NotAcceptable,

    /// Request content type is not supported
    UnsupportedMediaType,

    /// Too many requests
    Throttled,
}

impl fmt::Display for ApiExceptionKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.default_code())
    }
}

impl ApiExceptionKind {
    /// Get HTTP status code for this error
    pub fn status_code(&self) -> StatusCode {
        match self {
            Self::ParseError => StatusCode::BAD_REQUEST,
            Self::AuthenticationFailed => StatusCode::UNAUTHORIZED,
            Self::NotAuthenticated => StatusCode::UNAUTHORIZED,
            Self::PermissionDenied => StatusCode::FORBIDDEN,
            Self::NotFound => StatusCode::NOT_FOUND,
            Self::MethodNotAllowed => StatusCode::METHOD_NOT_ALLOWED,
            Self::NotAcceptable => StatusCode::NOT_ACCEPTABLE,
            Self::UnsupportedMediaType => StatusCode::UNSUPPORTED_MEDIA_TYPE,
            Self::Throttled => StatusCode::TOO_MANY_REQUESTS,
        }
    }

    /// Machine-readable code reported to clients
    pub fn default_code(&self) -> &'static str {
        match self {
            Self::ParseError => "parse_error",
            Self::AuthenticationFailed => "authentication_failed",
            Self::NotAuthenticated => "not_authenticated",
            Self::PermissionDenied => "permission_denied",
            Self::NotFound => "not_found",
            Self::MethodNotAllowed => "method_not_allowed",
            Self::NotAcceptable => "not_acceptable",
            Self::UnsupportedMediaType => "unsupported_media_type",
            Self::Throttled => "throttled",
        }
    }

    /// Detail used when the raised error does not carry a plain string of its own
    pub fn default_detail(&self) -> &'static str {
        match self {
            Self::ParseError => "Malformed request.",
            Self::AuthenticationFailed => "Incorrect authentication credentials.",
            Self::NotAuthenticated => "Authentication credentials were not provided.",
            Self::PermissionDenied => "You do not have permission to perform this action.",
            Self::NotFound => "Not found.",
            Self::MethodNotAllowed => "Method not allowed.",
            Self::NotAcceptable => "Could not satisfy the request Accept header.",
            Self::UnsupportedMediaType => "Unsupported media type in request.",
            Self::Throttled => "Request was throttled.",
        }
    }
}
