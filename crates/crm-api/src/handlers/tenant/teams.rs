//! Team handlers - /api/teams

use crm_core::domain::Team;
use crm_core::services::{NewTeam, TeamChanges};
use uuid::Uuid;

use crate::dto::MemberIdsRequest;
use crate::handlers::ApiResult;
use crate::middleware::{AppJson, AppPath, TenantAuth, TenantContext};
use crate::response::ApiResponse;

const MODULE: &str = "teams";
const MANAGE: &str = "teams.manage";

pub async fn list(ctx: TenantContext, _auth: TenantAuth) -> ApiResult<Vec<Team>> {
    ctx.module(MODULE)?;
    Ok(ApiResponse::success(ctx.teams().list().await?))
}

pub async fn create(ctx: TenantContext, auth: TenantAuth, AppJson(input): AppJson<NewTeam>) -> ApiResult<Team> {
    ctx.module(MODULE)?;
    auth.require(MANAGE)?;
    let team = ctx.teams().create(input).await?;
    Ok(ApiResponse::created(team, "Team created"))
}

pub async fn get(ctx: TenantContext, _auth: TenantAuth, AppPath(id): AppPath<Uuid>) -> ApiResult<Team> {
    ctx.module(MODULE)?;
    Ok(ApiResponse::success(ctx.teams().get(&id).await?))
}

pub async fn update(
    ctx: TenantContext,
    auth: TenantAuth,
    AppPath(id): AppPath<Uuid>,
    AppJson(changes): AppJson<TeamChanges>,
) -> ApiResult<Team> {
    ctx.module(MODULE)?;
    auth.require(MANAGE)?;
    let team = ctx.teams().update(&id, changes).await?;
    Ok(ApiResponse::success_with_message(team, "Team updated"))
}

/// PUT /api/teams/{id}/members
pub async fn set_members(
    ctx: TenantContext,
    auth: TenantAuth,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<MemberIdsRequest>,
) -> ApiResult<Team> {
    ctx.module(MODULE)?;
    auth.require(MANAGE)?;
    let team = ctx.teams().set_members(&id, request.member_ids).await?;
    Ok(ApiResponse::success_with_message(team, "Members updated"))
}

pub async fn delete(ctx: TenantContext, auth: TenantAuth, AppPath(id): AppPath<Uuid>) -> ApiResult<()> {
    ctx.module(MODULE)?;
    auth.require(MANAGE)?;
    ctx.teams().delete(&id).await?;
    Ok(ApiResponse::message("Team deleted"))
}
