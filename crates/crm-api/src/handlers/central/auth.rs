// ============================================================================
// CRM API - Central Auth Handlers
// File: crates/crm-api/src/handlers/central/auth.rs
// ============================================================================
//! Landlord administrator login

use axum::extract::State;
use crm_core::services::{LoginResult, UserInfo};
use validator::Validate;

use crate::dto::LoginRequest;
use crate::handlers::ApiResult;
use crate::middleware::{AppJson, CentralAdmin};
use crate::response::ApiResponse;
use crate::state::AppState;

/// Login handler - POST /api/central/auth/login
pub async fn login(State(state): State<AppState>, AppJson(payload): AppJson<LoginRequest>) -> ApiResult<LoginResult> {
    payload.validate()?;
    let result = state.central_auth().login(&payload.email, &payload.password).await?;
    Ok(ApiResponse::success_with_message(result, "Logged in"))
}

/// Current administrator - GET /api/central/auth/me
pub async fn me(State(state): State<AppState>, admin: CentralAdmin) -> ApiResult<UserInfo> {
    Ok(ApiResponse::success(state.central_auth().me(&admin.user_id).await?))
}
