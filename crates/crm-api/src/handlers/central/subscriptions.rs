//! Subscription handlers - /api/central/subscriptions

use axum::extract::State;
use chrono::Utc;
use crm_core::domain::{Subscription, SubscriptionFilter};
use crm_core::services::{Renewal, SweepReport};
use crm_shared::PaginatedResult;
use uuid::Uuid;

use crate::dto::{AutoRenewRequest, PageQuery};
use crate::handlers::ApiResult;
use crate::middleware::{AppJson, AppPath, AppQuery};
use crate::response::ApiResponse;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<SubscriptionFilter>,
    AppQuery(page): AppQuery<PageQuery>,
) -> ApiResult<PaginatedResult<Subscription>> {
    Ok(ApiResponse::success(state.subscriptions().list(&filter, page.pagination()).await?))
}

pub async fn get(State(state): State<AppState>, AppPath(id): AppPath<Uuid>) -> ApiResult<Subscription> {
    Ok(ApiResponse::success(state.subscriptions().get(&id).await?))
}

/// POST /api/central/subscriptions/{id}/cancel
pub async fn cancel(State(state): State<AppState>, AppPath(id): AppPath<Uuid>) -> ApiResult<Subscription> {
    let subscription = state.subscriptions().cancel(&id).await?;
    Ok(ApiResponse::success_with_message(subscription, "Subscription cancelled"))
}

/// PUT /api/central/subscriptions/{id}/auto-renew
pub async fn set_auto_renew(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(request): AppJson<AutoRenewRequest>,
) -> ApiResult<Subscription> {
    let subscription = state.subscriptions().set_auto_renew(&id, request.auto_renew).await?;
    Ok(ApiResponse::success_with_message(subscription, "Auto-renew updated"))
}

/// POST /api/central/subscriptions/{id}/renew
pub async fn renew(State(state): State<AppState>, AppPath(id): AppPath<Uuid>) -> ApiResult<Renewal> {
    let renewal = state.subscriptions().renew(&id).await?;
    Ok(ApiResponse::created(renewal, "Renewal created"))
}

/// POST /api/central/subscriptions/sweep
pub async fn sweep(State(state): State<AppState>) -> ApiResult<SweepReport> {
    let report = state.subscriptions().sweep(Utc::now()).await?;
    Ok(ApiResponse::success_with_message(report, "Sweep completed"))
}
