use axum::{extract::State, http::StatusCode};
use serde::Serialize;
use tracing::error;

use crate::response::ApiResponse;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

pub async fn health_check() -> ApiResponse<HealthResponse> {
    ApiResponse::success(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Ready once the central database answers.
pub async fn readiness_check(State(state): State<AppState>) -> Result<ApiResponse<HealthResponse>, ApiResponse<()>> {
    match sqlx::query("SELECT 1").execute(&state.db).await {
        Ok(_) => Ok(ApiResponse::success(HealthResponse {
            status: "ready",
            version: env!("CARGO_PKG_VERSION"),
        })),
        Err(e) => {
            error!("Readiness check failed: {}", e);
            Err(ApiResponse::error(
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                "Central database unavailable",
            ))
        }
    }
}
