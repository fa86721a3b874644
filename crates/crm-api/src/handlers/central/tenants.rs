//! Tenant and domain handlers - /api/central/tenants

use axum::extract::State;
use crm_core::domain::{Tenant, TenantDomain, TenantFilter};
use crm_core::services::TenantDetails;
use crm_shared::PaginatedResult;
use uuid::Uuid;

use crate::dto::{DomainRequest, PageQuery};
use crate::handlers::ApiResult;
use crate::middleware::{AppJson, AppPath, AppQuery};
use crate::response::ApiResponse;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<TenantFilter>,
    AppQuery(page): AppQuery<PageQuery>,
) -> ApiResult<PaginatedResult<Tenant>> {
    Ok(ApiResponse::success(state.tenants().list(&filter, page.pagination()).await?))
}

/// Tenant with its domains - GET /api/central/tenants/{id}
pub async fn get(State(state): State<AppState>, AppPath(id): AppPath<Uuid>) -> ApiResult<TenantDetails> {
    Ok(ApiResponse::success(state.tenants().get(&id).await?))
}

pub async fn suspend(State(state): State<AppState>, AppPath(id): AppPath<Uuid>) -> ApiResult<Tenant> {
    let tenant = state.tenants().suspend(&id).await?;
    Ok(ApiResponse::success_with_message(tenant, "Tenant suspended"))
}

pub async fn activate(State(state): State<AppState>, AppPath(id): AppPath<Uuid>) -> ApiResult<Tenant> {
    let tenant = state.tenants().activate(&id).await?;
    Ok(ApiResponse::success_with_message(tenant, "Tenant activated"))
}

/// POST /api/central/tenants/{id}/domains
pub async fn add_domain(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<DomainRequest>,
) -> ApiResult<TenantDomain> {
    let domain = state.tenants().add_domain(&id, &request.domain).await?;
    Ok(ApiResponse::created(domain, "Domain added"))
}

/// DELETE /api/central/tenants/{id}/domains/{domain_id}
pub async fn remove_domain(
    State(state): State<AppState>,
    AppPath((id, domain_id)): AppPath<(Uuid, Uuid)>,
) -> ApiResult<()> {
    state.tenants().remove_domain(&id, &domain_id).await?;
    Ok(ApiResponse::message("Domain removed"))
}
