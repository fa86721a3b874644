// ============================================================================
// CRM API - Lead Handlers
// File: crates/crm-api/src/handlers/tenant/leads.rs
// ============================================================================
//! Leads, their pipeline stage and conversion into a contact (and deal).

use crm_core::domain::{Lead, LeadChanges, LeadFilter, NewLead};
use crm_core::services::{Conversion, ConvertLead};
use crm_shared::PaginatedResult;
use uuid::Uuid;

use crate::dto::{PageQuery, StageMoveRequest};
use crate::handlers::ApiResult;
use crate::middleware::{AppJson, AppPath, AppQuery, TenantAuth, TenantContext};
use crate::response::ApiResponse;

const MODULE: &str = "leads";

/// GET /api/leads
pub async fn list(
    ctx: TenantContext,
    auth: TenantAuth,
    AppQuery(filter): AppQuery<LeadFilter>,
    AppQuery(page): AppQuery<PageQuery>,
) -> ApiResult<PaginatedResult<Lead>> {
    ctx.module(MODULE)?;
    auth.require("leads.view")?;
    Ok(ApiResponse::success(ctx.leads().list(&filter, page.pagination()).await?))
}

/// POST /api/leads
pub async fn create(ctx: TenantContext, auth: TenantAuth, AppJson(input): AppJson<NewLead>) -> ApiResult<Lead> {
    ctx.module(MODULE)?;
    auth.require("leads.create")?;
    let lead = ctx.leads().create(input).await?;
    Ok(ApiResponse::created(lead, "Lead created"))
}

/// Lead with industries, services and custom values - GET /api/leads/{id}
pub async fn get(ctx: TenantContext, auth: TenantAuth, AppPath(id): AppPath<Uuid>) -> ApiResult<Lead> {
    ctx.module(MODULE)?;
    auth.require("leads.view")?;
    Ok(ApiResponse::success(ctx.leads().get(&id).await?))
}

/// PUT /api/leads/{id}
pub async fn update(
    ctx: TenantContext,
    auth: TenantAuth,
    AppPath(id): AppPath<Uuid>,
    AppJson(changes): AppJson<LeadChanges>,
) -> ApiResult<Lead> {
    ctx.module(MODULE)?;
    auth.require("leads.update")?;
    let lead = ctx.leads().update(&id, changes).await?;
    Ok(ApiResponse::success_with_message(lead, "Lead updated"))
}

/// DELETE /api/leads/{id}
pub async fn delete(ctx: TenantContext, auth: TenantAuth, AppPath(id): AppPath<Uuid>) -> ApiResult<()> {
    ctx.module(MODULE)?;
    auth.require("leads.delete")?;
    ctx.leads().delete(&id).await?;
    Ok(ApiResponse::message("Lead deleted"))
}

/// PUT /api/leads/{id}/stage
pub async fn move_stage(
    ctx: TenantContext,
    auth: TenantAuth,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<StageMoveRequest>,
) -> ApiResult<Lead> {
    ctx.module(MODULE)?;
    auth.require("leads.update")?;
    let lead = ctx.leads().move_stage(&id, &request.stage_id).await?;
    Ok(ApiResponse::success_with_message(lead, "Lead moved"))
}

/// POST /api/leads/{id}/convert
pub async fn convert(
    ctx: TenantContext,
    auth: TenantAuth,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<ConvertLead>,
) -> ApiResult<Conversion> {
    ctx.module(MODULE)?;
    auth.require("leads.update")?;
    auth.require("contacts.create")?;
    if request.create_deal {
        auth.require("deals.create")?;
    }
    let conversion = ctx.leads().convert(&id, request).await?;
    Ok(ApiResponse::created(conversion, "Lead converted"))
}
