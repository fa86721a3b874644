//! Tier handlers - /api/central/tiers

use axum::extract::State;
use crm_core::domain::{NewTier, Tier, TierChanges};
use crm_shared::PaginatedResult;
use uuid::Uuid;

use crate::dto::{PageQuery, TierListQuery};
use crate::handlers::ApiResult;
use crate::middleware::{AppJson, AppPath, AppQuery};
use crate::response::ApiResponse;
use crate::state::AppState;

pub async fn list(
    State(state): State<AppState>,
    AppQuery(query): AppQuery<TierListQuery>,
    AppQuery(page): AppQuery<PageQuery>,
) -> ApiResult<PaginatedResult<Tier>> {
    Ok(ApiResponse::success(state.tiers().list(query.active_only, page.pagination()).await?))
}

pub async fn create(State(state): State<AppState>, AppJson(input): AppJson<NewTier>) -> ApiResult<Tier> {
    let tier = state.tiers().create(input).await?;
    Ok(ApiResponse::created(tier, "Tier created"))
}

pub async fn get(State(state): State<AppState>, AppPath(id): AppPath<Uuid>) -> ApiResult<Tier> {
    Ok(ApiResponse::success(state.tiers().get(&id).await?))
}

pub async fn update(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(changes): AppJson<TierChanges>,
) -> ApiResult<Tier> {
    let tier = state.tiers().update(&id, changes).await?;
    Ok(ApiResponse::success_with_message(tier, "Tier updated"))
}

/// POST /api/central/tiers/{id}/deactivate
pub async fn deactivate(State(state): State<AppState>, AppPath(id): AppPath<Uuid>) -> ApiResult<Tier> {
    let tier = state.tiers().deactivate(&id).await?;
    Ok(ApiResponse::success_with_message(tier, "Tier deactivated"))
}
