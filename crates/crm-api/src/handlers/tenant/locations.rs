//! Location hierarchy handlers (country, governorate, city)

use crm_core::domain::{Location, LocationTree, NewLocation};
use serde::Serialize;
use uuid::Uuid;

use crate::dto::{RenameRequest, TreeQuery};
use crate::handlers::ApiResult;
use crate::middleware::{AppJson, AppPath, AppQuery, TenantAuth, TenantContext};
use crate::response::ApiResponse;

const MANAGE: &str = "locations.manage";

#[derive(Debug, Serialize)]
pub struct DeletedSubtree {
    pub deleted: u64,
}

/// Nested tree, optionally rooted at `?root=` - GET /api/locations/tree
pub async fn tree(
    ctx: TenantContext,
    _auth: TenantAuth,
    AppQuery(query): AppQuery<TreeQuery>,
) -> ApiResult<Vec<LocationTree>> {
    Ok(ApiResponse::success(ctx.locations().tree(query.root).await?))
}

/// Root when `parent_id` is absent, child otherwise - POST /api/locations
pub async fn create(ctx: TenantContext, auth: TenantAuth, AppJson(input): AppJson<NewLocation>) -> ApiResult<Location> {
    auth.require(MANAGE)?;
    let location = ctx.locations().create(input).await?;
    Ok(ApiResponse::created(location, "Location created"))
}

pub async fn get(ctx: TenantContext, _auth: TenantAuth, AppPath(id): AppPath<Uuid>) -> ApiResult<Location> {
    Ok(ApiResponse::success(ctx.locations().get(&id).await?))
}

pub async fn rename(
    ctx: TenantContext,
    auth: TenantAuth,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<RenameRequest>,
) -> ApiResult<Location> {
    auth.require(MANAGE)?;
    let location = ctx.locations().rename(&id, &request.name).await?;
    Ok(ApiResponse::success_with_message(location, "Location renamed"))
}

pub async fn ancestors(ctx: TenantContext, _auth: TenantAuth, AppPath(id): AppPath<Uuid>) -> ApiResult<Vec<Location>> {
    Ok(ApiResponse::success(ctx.locations().ancestors(&id).await?))
}

pub async fn descendants(ctx: TenantContext, _auth: TenantAuth, AppPath(id): AppPath<Uuid>) -> ApiResult<Vec<Location>> {
    Ok(ApiResponse::success(ctx.locations().descendants(&id).await?))
}

/// Removes the location and everything below it - DELETE /api/locations/{id}
pub async fn delete(ctx: TenantContext, auth: TenantAuth, AppPath(id): AppPath<Uuid>) -> ApiResult<DeletedSubtree> {
    auth.require(MANAGE)?;
    let deleted = ctx.locations().delete(&id).await?;
    Ok(ApiResponse::success_with_message(DeletedSubtree { deleted }, "Location deleted"))
}
