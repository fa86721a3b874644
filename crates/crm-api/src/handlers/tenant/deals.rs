//! Deal handlers - /api/deals

use crm_core::domain::{Deal, DealChanges, DealFilter, NewDeal};
use crm_shared::PaginatedResult;
use uuid::Uuid;

use crate::dto::{PageQuery, StageMoveRequest};
use crate::handlers::ApiResult;
use crate::middleware::{AppJson, AppPath, AppQuery, TenantAuth, TenantContext};
use crate::response::ApiResponse;

const MODULE: &str = "deals";

pub async fn list(
    ctx: TenantContext,
    auth: TenantAuth,
    AppQuery(filter): AppQuery<DealFilter>,
    AppQuery(page): AppQuery<PageQuery>,
) -> ApiResult<PaginatedResult<Deal>> {
    ctx.module(MODULE)?;
    auth.require("deals.view")?;
    Ok(ApiResponse::success(ctx.deals().list(&filter, page.pagination()).await?))
}

/// Without a `stage_id` the deal opens on the default pipeline's first stage.
pub async fn create(ctx: TenantContext, auth: TenantAuth, AppJson(input): AppJson<NewDeal>) -> ApiResult<Deal> {
    ctx.module(MODULE)?;
    auth.require("deals.create")?;
    let deal = ctx.deals().create(input).await?;
    Ok(ApiResponse::created(deal, "Deal created"))
}

pub async fn get(ctx: TenantContext, auth: TenantAuth, AppPath(id): AppPath<Uuid>) -> ApiResult<Deal> {
    ctx.module(MODULE)?;
    auth.require("deals.view")?;
    Ok(ApiResponse::success(ctx.deals().get(&id).await?))
}

pub async fn update(
    ctx: TenantContext,
    auth: TenantAuth,
    AppPath(id): AppPath<Uuid>,
    AppJson(changes): AppJson<DealChanges>,
) -> ApiResult<Deal> {
    ctx.module(MODULE)?;
    auth.require("deals.update")?;
    let deal = ctx.deals().update(&id, changes).await?;
    Ok(ApiResponse::success_with_message(deal, "Deal updated"))
}

/// PUT /api/deals/{id}/stage
pub async fn move_stage(
    ctx: TenantContext,
    auth: TenantAuth,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<StageMoveRequest>,
) -> ApiResult<Deal> {
    ctx.module(MODULE)?;
    auth.require("deals.update")?;
    let deal = ctx.deals().move_stage(&id, &request.stage_id).await?;
    Ok(ApiResponse::success_with_message(deal, "Deal moved"))
}

pub async fn delete(ctx: TenantContext, auth: TenantAuth, AppPath(id): AppPath<Uuid>) -> ApiResult<()> {
    ctx.module(MODULE)?;
    auth.require("deals.delete")?;
    ctx.deals().delete(&id).await?;
    Ok(ApiResponse::message("Deal deleted"))
}
