//! Tenant user handlers - /api/users

use crm_core::domain::{NewTenantUser, TenantUser, UserChanges};
use crm_shared::PaginatedResult;
use uuid::Uuid;

use crate::dto::{PageQuery, RoleIdsRequest, SearchQuery};
use crate::handlers::ApiResult;
use crate::middleware::{AppJson, AppPath, AppQuery, TenantAuth, TenantContext};
use crate::response::ApiResponse;

const MANAGE: &str = "users.manage";

pub async fn list(
    ctx: TenantContext,
    auth: TenantAuth,
    AppQuery(query): AppQuery<SearchQuery>,
    AppQuery(page): AppQuery<PageQuery>,
) -> ApiResult<PaginatedResult<TenantUser>> {
    auth.require(MANAGE)?;
    Ok(ApiResponse::success(ctx.users().list(query.search, page.pagination()).await?))
}

/// Seat limit of the tenant's tier applies - POST /api/users
pub async fn create(ctx: TenantContext, auth: TenantAuth, AppJson(input): AppJson<NewTenantUser>) -> ApiResult<TenantUser> {
    auth.require(MANAGE)?;
    let user = ctx.users().create(input).await?;
    Ok(ApiResponse::created(user, "User created"))
}

pub async fn get(ctx: TenantContext, auth: TenantAuth, AppPath(id): AppPath<Uuid>) -> ApiResult<TenantUser> {
    auth.require(MANAGE)?;
    Ok(ApiResponse::success(ctx.users().get(&id).await?))
}

pub async fn update(
    ctx: TenantContext,
    auth: TenantAuth,
    AppPath(id): AppPath<Uuid>,
    AppJson(changes): AppJson<UserChanges>,
) -> ApiResult<TenantUser> {
    auth.require(MANAGE)?;
    let user = ctx.users().update(&id, changes).await?;
    Ok(ApiResponse::success_with_message(user, "User updated"))
}

/// PUT /api/users/{id}/roles
pub async fn assign_roles(
    ctx: TenantContext,
    auth: TenantAuth,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<RoleIdsRequest>,
) -> ApiResult<TenantUser> {
    auth.require(MANAGE)?;
    let user = ctx.users().assign_roles(&id, request.role_ids).await?;
    Ok(ApiResponse::success_with_message(user, "Roles assigned"))
}

pub async fn delete(ctx: TenantContext, auth: TenantAuth, AppPath(id): AppPath<Uuid>) -> ApiResult<()> {
    auth.require(MANAGE)?;
    ctx.users().delete(&id, &auth.user_id).await?;
    Ok(ApiResponse::message("User deleted"))
}
