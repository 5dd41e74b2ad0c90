use utoipa::OpenApi;

use crate::api::handlers::HealthResponse;
use crate::config::DocsConfig;
use crate::errors::{ErrorBody, ErrorEnvelope};

#[derive(OpenApi)]
#[openapi(
    info(
        title = "Moto API",
        version = "1.0.0",
        description = "API for managing moto data",
    ),
    paths(
        crate::api::handlers::health,
    ),
    components(
        schemas(
            HealthResponse,
            ErrorEnvelope,
            ErrorBody,
        )
    ),
    tags(
        (name = "health", description = "Health check endpoints"),
    )
)]
pub struct ApiDoc;

/// OpenAPI document with the configured title, description and version
pub fn openapi_document(docs: &DocsConfig) -> utoipa::openapi::OpenApi {
    let mut document = ApiDoc::openapi();
    document.info.title = docs.title.clone();
    document.info.description = Some(docs.description.clone());
    document.info.version = docs.version.clone();
    document
}
