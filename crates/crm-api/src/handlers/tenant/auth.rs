//! Tenant user login

use axum::extract::State;
use crm_core::services::{LoginResult, UserInfo};
use validator::Validate;

use crate::dto::LoginRequest;
use crate::handlers::ApiResult;
use crate::middleware::{AppJson, TenantAuth, TenantContext};
use crate::response::ApiResponse;
use crate::state::AppState;

/// Login handler - POST /api/auth/login
pub async fn login(
    State(state): State<AppState>,
    ctx: TenantContext,
    AppJson(payload): AppJson<LoginRequest>,
) -> ApiResult<LoginResult> {
    payload.validate()?;
    let result = ctx.auth(state.jwt.clone()).login(&payload.email, &payload.password).await?;
    Ok(ApiResponse::success_with_message(result, "Logged in"))
}

/// Current user with effective permissions - GET /api/auth/me
pub async fn me(State(state): State<AppState>, ctx: TenantContext, auth: TenantAuth) -> ApiResult<UserInfo> {
    Ok(ApiResponse::success(ctx.auth(state.jwt.clone()).me(&auth.user_id).await?))
}
