use axum::{extract::State, response::Json};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use utoipa::ToSchema;

use crate::config::Config;
use crate::errors::{ApiError, ErrorTranslator};

pub type AppState = Arc<AppStateInner>;

pub struct AppStateInner {
    pub config: Arc<Config>,
    pub translator: ErrorTranslator,
}

impl AppStateInner {
    /// State with the built-in error classifier
    pub fn new(config: Config) -> Self {
        Self::with_translator(config, ErrorTranslator::default())
    }

    pub fn with_translator(config: Config, translator: ErrorTranslator) -> Self {
        Self {
            config: Arc::new(config),
            translator,
        }
    }
}

/// Health check response
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
pub struct HealthResponse {
    /// Always "healthy" while the process serves requests
    pub status: String,
    /// Configured service name
    pub service: String,
}

/// Health check endpoint
#[utoipa::path(
    get,
    path = "/api/v1/health/",
    tag = "health",
    responses(
        (status = 200, description = "Service is healthy", body = HealthResponse)
    )
)]
pub async fn health(State(state): State<AppState>) -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy".to_string(),
        service: state.config.server.service_name.clone(),
    })
}

/// Router fallback for paths no route matches
pub async fn not_found() -> ApiError {
    ApiError::not_found()
}
