//! Pipeline and stage handlers. Reads are open to any tenant user because
//! lead and deal screens need the stage list.

use crm_core::domain::{NewStage, Pipeline, Stage, StageChanges};
use crm_core::services::{NewPipeline, PipelineChanges};
use uuid::Uuid;

use crate::dto::ReorderStagesRequest;
use crate::handlers::ApiResult;
use crate::middleware::{AppJson, AppPath, TenantAuth, TenantContext};
use crate::response::ApiResponse;

const MANAGE: &str = "pipelines.manage";

pub async fn list(ctx: TenantContext, _auth: TenantAuth) -> ApiResult<Vec<Pipeline>> {
    Ok(ApiResponse::success(ctx.pipelines().list().await?))
}

pub async fn get(ctx: TenantContext, _auth: TenantAuth, AppPath(id): AppPath<Uuid>) -> ApiResult<Pipeline> {
    Ok(ApiResponse::success(ctx.pipelines().get(&id).await?))
}

pub async fn create(ctx: TenantContext, auth: TenantAuth, AppJson(input): AppJson<NewPipeline>) -> ApiResult<Pipeline> {
    auth.require(MANAGE)?;
    let pipeline = ctx.pipelines().create(input).await?;
    Ok(ApiResponse::created(pipeline, "Pipeline created"))
}

pub async fn update(
    ctx: TenantContext,
    auth: TenantAuth,
    AppPath(id): AppPath<Uuid>,
    AppJson(changes): AppJson<PipelineChanges>,
) -> ApiResult<Pipeline> {
    auth.require(MANAGE)?;
    let pipeline = ctx.pipelines().update(&id, changes).await?;
    Ok(ApiResponse::success_with_message(pipeline, "Pipeline updated"))
}

pub async fn delete(ctx: TenantContext, auth: TenantAuth, AppPath(id): AppPath<Uuid>) -> ApiResult<()> {
    auth.require(MANAGE)?;
    ctx.pipelines().delete(&id).await?;
    Ok(ApiResponse::message("Pipeline deleted"))
}

/// POST /api/pipelines/{id}/stages
pub async fn add_stage(
    ctx: TenantContext,
    auth: TenantAuth,
    AppPath(id): AppPath<Uuid>,
    AppJson(input): AppJson<NewStage>,
) -> ApiResult<Stage> {
    auth.require(MANAGE)?;
    let stage = ctx.pipelines().add_stage(&id, input).await?;
    Ok(ApiResponse::created(stage, "Stage added"))
}

/// PUT /api/pipelines/{id}/stages/order
pub async fn reorder_stages(
    ctx: TenantContext,
    auth: TenantAuth,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<ReorderStagesRequest>,
) -> ApiResult<Pipeline> {
    auth.require(MANAGE)?;
    let pipeline = ctx.pipelines().reorder_stages(&id, request.stage_ids).await?;
    Ok(ApiResponse::success_with_message(pipeline, "Stages reordered"))
}

/// PUT /api/stages/{id}
pub async fn update_stage(
    ctx: TenantContext,
    auth: TenantAuth,
    AppPath(id): AppPath<Uuid>,
    AppJson(changes): AppJson<StageChanges>,
) -> ApiResult<Stage> {
    auth.require(MANAGE)?;
    let stage = ctx.pipelines().update_stage(&id, changes).await?;
    Ok(ApiResponse::success_with_message(stage, "Stage updated"))
}

/// DELETE /api/stages/{id}
pub async fn delete_stage(ctx: TenantContext, auth: TenantAuth, AppPath(id): AppPath<Uuid>) -> ApiResult<()> {
    auth.require(MANAGE)?;
    ctx.pipelines().delete_stage(&id).await?;
    Ok(ApiResponse::message("Stage deleted"))
}
