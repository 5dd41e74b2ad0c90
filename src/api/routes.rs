use axum::{
    http::{header, HeaderValue, Method},
    middleware,
    routing::get,
    Router,
};
use tower_http::{
    catch_panic::CatchPanicLayer,
    compression::CompressionLayer,
    cors::{AllowOrigin, CorsLayer},
    trace::TraceLayer,
};
use tracing::warn;
use utoipa_swagger_ui::SwaggerUi;

use super::handlers::{health, not_found, AppState};
use super::middleware::{exception_handler, handle_panic, logging_middleware};
use super::openapi::openapi_document;
use crate::config::CorsConfig;
use crate::metrics;

pub const API_V1_PREFIX: &str = "/api/v1";

/// Router with only the built-in endpoints
pub fn create_router(state: AppState) -> Router {
    build_router(state, Router::new())
}

/// Mount `api_v1` under [`API_V1_PREFIX`] next to the built-in endpoints and install the
/// middleware stack.
pub fn build_router(state: AppState, api_v1: Router<AppState>) -> Router {
    let cors = cors_layer(&state.config.cors);
    let openapi = openapi_document(&state.config.docs);

    let v1 = Router::new().route("/health/", get(health)).merge(api_v1);

    Router::new()
        .nest(API_V1_PREFIX, v1)
        // Metrics endpoint (Prometheus)
        .route("/metrics", get(metrics::metrics_handler))
        // OpenAPI documentation
        .merge(SwaggerUi::new("/api/schema/swagger-ui").url("/api/schema/", openapi))
        .fallback(not_found)
        // Order matters: panics surface as errors before the exception handler sees the response
        .layer(CatchPanicLayer::custom(handle_panic))
        .layer(middleware::from_fn_with_state(state.clone(), exception_handler))
        .layer(middleware::from_fn(logging_middleware))
        .layer(middleware::from_fn(metrics::middleware::track_metrics))
        .layer(CompressionLayer::new())
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

fn cors_layer(config: &CorsConfig) -> CorsLayer {
    let origins: Vec<HeaderValue> = config
        .allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::list(origins))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::PATCH,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::ACCEPT, header::AUTHORIZATION, header::CONTENT_TYPE])
        .allow_credentials(config.allow_credentials)
}
