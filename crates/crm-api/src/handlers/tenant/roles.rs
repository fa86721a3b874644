//! Role handlers - /api/roles. Managing roles is part of user management.

use crm_core::domain::{Role, PERMISSIONS};
use crm_core::services::{NewRole, RoleChanges};
use uuid::Uuid;

use crate::handlers::ApiResult;
use crate::middleware::{AppJson, AppPath, TenantAuth, TenantContext};
use crate::response::ApiResponse;

const MANAGE: &str = "users.manage";

pub async fn list(ctx: TenantContext, auth: TenantAuth) -> ApiResult<Vec<Role>> {
    auth.require(MANAGE)?;
    Ok(ApiResponse::success(ctx.roles().list().await?))
}

/// Permission keys a role may hold - GET /api/permissions
pub async fn permissions(_ctx: TenantContext, auth: TenantAuth) -> ApiResult<Vec<&'static str>> {
    auth.require(MANAGE)?;
    Ok(ApiResponse::success(PERMISSIONS.to_vec()))
}

pub async fn create(ctx: TenantContext, auth: TenantAuth, AppJson(input): AppJson<NewRole>) -> ApiResult<Role> {
    auth.require(MANAGE)?;
    let role = ctx.roles().create(input).await?;
    Ok(ApiResponse::created(role, "Role created"))
}

pub async fn get(ctx: TenantContext, auth: TenantAuth, AppPath(id): AppPath<Uuid>) -> ApiResult<Role> {
    auth.require(MANAGE)?;
    Ok(ApiResponse::success(ctx.roles().get(&id).await?))
}

pub async fn update(
    ctx: TenantContext,
    auth: TenantAuth,
    AppPath(id): AppPath<Uuid>,
    AppJson(changes): AppJson<RoleChanges>,
) -> ApiResult<Role> {
    auth.require(MANAGE)?;
    let role = ctx.roles().update(&id, changes).await?;
    Ok(ApiResponse::success_with_message(role, "Role updated"))
}

pub async fn delete(ctx: TenantContext, auth: TenantAuth, AppPath(id): AppPath<Uuid>) -> ApiResult<()> {
    auth.require(MANAGE)?;
    ctx.roles().delete(&id).await?;
    Ok(ApiResponse::message("Role deleted"))
}
