//! Uniform error handling for API responses

pub mod caught;
pub mod classifier;
pub mod codes;
pub mod response;
pub mod translator;

pub use caught::{
    ApiException, CaughtError, ErrorKind, ExceptionDetail, FieldErrors, ModelValidationError,
    ValidationDetail, REQUIRED_FIELD_MESSAGE,
};
pub use classifier::{Classification, DefaultClassifier, ExceptionClassifier};
pub use codes::ApiExceptionKind;
pub use response::{ApiError, ErrorBody, ErrorEnvelope, PendingError};
pub use translator::{translate, ErrorTranslator, RequestContext, Translation};
