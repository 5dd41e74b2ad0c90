//! Errors observed while a request is being handled.
//!
//! Handlers raise a [`CaughtError`] (usually through [`super::ApiError`]) and let it propagate.
//! Classification is an ordered match over the variants, see [`super::translator`].

use axum::http::StatusCode;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;
use std::fmt;

use super::codes::ApiExceptionKind;

/// Field name to the list of messages reported for it
pub type FieldErrors = BTreeMap<String, Vec<String>>;

/// Coarse discriminator of a caught error
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    ValidationFailure,
    NotFound,
    FrameworkKnownError,
    Unhandled,
}

/// Structured payload of a validation failure.
///
/// Serializes as an object for per-field messages and as an array for non-field messages.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum ValidationDetail {
    Fields(FieldErrors),
    NonField(Vec<String>),
}

impl ValidationDetail {
    /// Single field with a single message
    pub fn field(name: impl Into<String>, message: impl Into<String>) -> Self {
        let mut fields = FieldErrors::new();
        fields.insert(name.into(), vec![message.into()]);
        Self::Fields(fields)
    }

    /// Mark each of `names` as required
    pub fn required<I, S>(names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self::Fields(
            names
                .into_iter()
                .map(|name| (name.into(), vec![REQUIRED_FIELD_MESSAGE.to_string()]))
                .collect(),
        )
    }

    pub fn to_value(&self) -> Value {
        match self {
            Self::Fields(fields) => Value::Object(
                fields
                    .iter()
                    .map(|(field, messages)| {
                        let messages = messages.iter().cloned().map(Value::String).collect();
                        (field.clone(), Value::Array(messages))
                    })
                    .collect(),
            ),
            Self::NonField(messages) => {
                Value::Array(messages.iter().cloned().map(Value::String).collect())
            }
        }
    }
}

/// Message attached to a missing required field
pub const REQUIRED_FIELD_MESSAGE: &str = "This field is required.";

/// Validation error raised below the handler layer (model `clean`-style checks).
///
/// It may or may not know which fields its messages belong to.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("model validation failed: {}", .messages.join("; "))]
pub struct ModelValidationError {
    message_dict: Option<FieldErrors>,
    messages: Vec<String>,
}

impl ModelValidationError {
    pub fn from_fields(fields: FieldErrors) -> Self {
        let messages = fields.values().flatten().cloned().collect();
        Self {
            message_dict: Some(fields),
            messages,
        }
    }

    pub fn from_messages<I, S>(messages: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            message_dict: None,
            messages: messages.into_iter().map(Into::into).collect(),
        }
    }

    pub fn message_dict(&self) -> Option<&FieldErrors> {
        self.message_dict.as_ref()
    }

    pub fn messages(&self) -> &[String] {
        &self.messages
    }

    /// Convert into the handler-layer validation payload
    pub fn into_detail(self) -> ValidationDetail {
        match self.message_dict {
            Some(fields) => ValidationDetail::Fields(fields),
            None => ValidationDetail::NonField(self.messages),
        }
    }
}

/// Instance detail of an [`ApiException`]
#[derive(Debug, Clone, PartialEq)]
pub enum ExceptionDetail {
    Text(String),
    Structured(Value),
}

impl fmt::Display for ExceptionDetail {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Text(text) => f.write_str(text),
            Self::Structured(value) => write!(f, "{value}"),
        }
    }
}

/// Error type the framework knows how to answer: registered status, default code and detail
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("{detail}")]
pub struct ApiException {
    status: StatusCode,
    default_code: String,
    default_detail: String,
    detail: ExceptionDetail,
}

impl ApiException {
    /// Built-in error carrying its default detail
    pub fn new(kind: ApiExceptionKind) -> Self {
        Self {
            status: kind.status_code(),
            default_code: kind.default_code().to_string(),
            default_detail: kind.default_detail().to_string(),
            detail: ExceptionDetail::Text(kind.default_detail().to_string()),
        }
    }

    /// Application-defined error with its own registration
    pub fn custom(
        status: StatusCode,
        default_code: impl Into<String>,
        default_detail: impl Into<String>,
    ) -> Self {
        let default_detail = default_detail.into();
        Self {
            status,
            default_code: default_code.into(),
            detail: ExceptionDetail::Text(default_detail.clone()),
            default_detail,
        }
    }

    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = ExceptionDetail::Text(detail.into());
        self
    }

    pub fn with_structured_detail(mut self, detail: Value) -> Self {
        self.detail = ExceptionDetail::Structured(detail);
        self
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn default_code(&self) -> &str {
        &self.default_code
    }

    pub fn default_detail(&self) -> &str {
        &self.default_detail
    }

    pub fn detail(&self) -> &ExceptionDetail {
        &self.detail
    }

    pub fn parse_error(reason: impl fmt::Display) -> Self {
        Self::new(ApiExceptionKind::ParseError).with_detail(format!("JSON parse error - {reason}"))
    }

    pub fn method_not_allowed(method: impl fmt::Display) -> Self {
        Self::new(ApiExceptionKind::MethodNotAllowed)
            .with_detail(format!("Method \"{method}\" not allowed."))
    }

    pub fn unsupported_media_type(media_type: impl fmt::Display) -> Self {
        Self::new(ApiExceptionKind::UnsupportedMediaType)
            .with_detail(format!("Unsupported media type \"{media_type}\" in request."))
    }
}

/// Anything that can escape a handler
#[derive(Debug, thiserror::Error)]
pub enum CaughtError {
    #[error(transparent)]
    ModelValidation(#[from] ModelValidationError),

    #[error("validation failed: {}", .0.to_value())]
    Validation(ValidationDetail),

    #[error("not found: {}", .0.as_deref().unwrap_or("no detail"))]
    NotFound(Option<String>),

    #[error("permission denied: {}", .0.as_deref().unwrap_or("no detail"))]
    PermissionDenied(Option<String>),

    #[error(transparent)]
    Api(#[from] ApiException),

    #[error(transparent)]
    Unhandled(#[from] anyhow::Error),
}

impl CaughtError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            Self::ModelValidation(_) | Self::Validation(_) => ErrorKind::ValidationFailure,
            Self::NotFound(_) => ErrorKind::NotFound,
            Self::PermissionDenied(_) | Self::Api(_) => ErrorKind::FrameworkKnownError,
            Self::Unhandled(_) => ErrorKind::Unhandled,
        }
    }

    pub fn not_found() -> Self {
        Self::NotFound(None)
    }

    /// Wrap an arbitrary error that the framework has no mapping for
    pub fn unhandled<E>(error: E) -> Self
    where
        E: std::error::Error + Send + Sync + 'static,
    {
        Self::Unhandled(anyhow::Error::new(error))
    }
}

impl From<ValidationDetail> for CaughtError {
    fn from(detail: ValidationDetail) -> Self {
        Self::Validation(detail)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_validation_detail_serializes_as_object_or_array() {
        let fields = ValidationDetail::required(["name", "year"]);
        assert_eq!(
            serde_json::to_value(&fields).unwrap(),
            json!({"name": ["This field is required."], "year": ["This field is required."]})
        );
        assert_eq!(serde_json::to_value(&fields).unwrap(), fields.to_value());

        let non_field = ValidationDetail::NonField(vec!["Dates overlap.".to_string()]);
        assert_eq!(serde_json::to_value(&non_field).unwrap(), json!(["Dates overlap."]));
        assert_eq!(non_field.to_value(), json!(["Dates overlap."]));
    }

    #[test]
    fn test_model_validation_normalization() {
        let mut fields = FieldErrors::new();
        fields.insert("vin".to_string(), vec!["Too short.".to_string(), "Bad checksum.".to_string()]);
        let err = ModelValidationError::from_fields(fields.clone());
        assert_eq!(err.messages().len(), 2);
        assert_eq!(err.into_detail(), ValidationDetail::Fields(fields));

        let err = ModelValidationError::from_messages(["Start must precede end."]);
        assert!(err.message_dict().is_none());
        assert_eq!(
            err.into_detail(),
            ValidationDetail::NonField(vec!["Start must precede end.".to_string()])
        );
    }

    #[test]
    fn test_kind_discriminator() {
        let validation: CaughtError = ValidationDetail::field("name", "Too long.").into();
        assert_eq!(validation.kind(), ErrorKind::ValidationFailure);

        let model: CaughtError = ModelValidationError::from_messages(["x"]).into();
        assert_eq!(model.kind(), ErrorKind::ValidationFailure);

        assert_eq!(CaughtError::not_found().kind(), ErrorKind::NotFound);
        assert_eq!(
            CaughtError::PermissionDenied(None).kind(),
            ErrorKind::FrameworkKnownError
        );

        let api: CaughtError = ApiException::new(ApiExceptionKind::Throttled).into();
        assert_eq!(api.kind(), ErrorKind::FrameworkKnownError);

        let unhandled: CaughtError = anyhow::anyhow!("boom").into();
        assert_eq!(unhandled.kind(), ErrorKind::Unhandled);
    }

    #[test]
    fn test_api_exception_details() {
        let exc = ApiException::method_not_allowed("DELETE");
        assert_eq!(exc.status(), StatusCode::METHOD_NOT_ALLOWED);
        assert_eq!(exc.default_code(), "method_not_allowed");
        assert_eq!(
            exc.detail(),
            &ExceptionDetail::Text("Method \"DELETE\" not allowed.".to_string())
        );

        let exc = ApiException::custom(StatusCode::CONFLICT, "duplicate", "Already exists.");
        assert_eq!(exc.detail(), &ExceptionDetail::Text("Already exists.".to_string()));
        assert_eq!(exc.to_string(), "Already exists.");
    }
}
