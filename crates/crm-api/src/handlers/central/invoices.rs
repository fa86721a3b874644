//! Invoice handlers - /api/central/invoices

use axum::extract::State;
use crm_core::domain::{Invoice, InvoiceFilter};
use crm_shared::PaginatedResult;
use uuid::Uuid;

use crate::dto::{MarkPaidRequest, PageQuery};
use crate::handlers::ApiResult;
use crate::middleware::{AppJson, AppPath, AppQuery};
use crate::response::ApiResponse;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<InvoiceFilter>,
    AppQuery(page): AppQuery<PageQuery>,
) -> ApiResult<PaginatedResult<Invoice>> {
    Ok(ApiResponse::success(state.billing().list(&filter, page.pagination()).await?))
}

pub async fn get(State(state): State<AppState>, AppPath(id): AppPath<Uuid>) -> ApiResult<Invoice> {
    Ok(ApiResponse::success(state.billing().get(&id).await?))
}

/// Manual settlement - POST /api/central/invoices/{id}/mark-paid
pub async fn mark_paid(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<MarkPaidRequest>,
) -> ApiResult<Invoice> {
    let invoice = state.billing().mark_paid(&id, request.reference).await?;
    Ok(ApiResponse::success_with_message(invoice, "Invoice paid"))
}

/// POST /api/central/invoices/{id}/void
pub async fn void(State(state): State<AppState>, AppPath(id): AppPath<Uuid>) -> ApiResult<Invoice> {
    let invoice = state.billing().void(&id).await?;
    Ok(ApiResponse::success_with_message(invoice, "Invoice voided"))
}
