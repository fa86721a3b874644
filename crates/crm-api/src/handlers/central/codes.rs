//! Activation and discount code handlers

use axum::extract::State;
use crm_core::domain::{ActivationCode, ActivationCodeFilter, DiscountCode, NewDiscountCode, PriceQuote};
use crm_shared::PaginatedResult;
use uuid::Uuid;

use crate::dto::{GenerateCodesRequest, PageQuery, QuoteRequest};
use crate::handlers::ApiResult;
use crate::middleware::{AppJson, AppPath, AppQuery};
use crate::response::ApiResponse;
use crate::state::AppState;

/// POST /api/central/activation-codes
pub async fn generate_activation_codes(
    State(state): State<AppState>,
    AppJson(request): AppJson<GenerateCodesRequest>,
) -> ApiResult<Vec<ActivationCode>> {
    let codes = state
        .activation_codes()
        .generate(&request.tier_id, request.count, request.expires_at)
        .await?;
    let message = format!("{} activation codes generated", codes.len());
    Ok(ApiResponse::created(codes, &message))
}

/// GET /api/central/activation-codes
pub async fn list_activation_codes(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<ActivationCodeFilter>,
    AppQuery(page): AppQuery<PageQuery>,
) -> ApiResult<PaginatedResult<ActivationCode>> {
    Ok(ApiResponse::success(
        state.activation_codes().list(&filter, page.pagination()).await?,
    ))
}

/// POST /api/central/activation-codes/{id}/revoke
pub async fn revoke_activation_code(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<ActivationCode> {
    let code = state.activation_codes().revoke(&id).await?;
    Ok(ApiResponse::success_with_message(code, "Activation code revoked"))
}

/// POST /api/central/discount-codes
pub async fn create_discount_code(
    State(state): State<AppState>,
    AppJson(input): AppJson<NewDiscountCode>,
) -> ApiResult<DiscountCode> {
    let code = state.discount_codes().create(input).await?;
    Ok(ApiResponse::created(code, "Discount code created"))
}

/// GET /api/central/discount-codes
pub async fn list_discount_codes(
    State(state): State<AppState>,
    AppQuery(page): AppQuery<PageQuery>,
) -> ApiResult<PaginatedResult<DiscountCode>> {
    Ok(ApiResponse::success(state.discount_codes().list(page.pagination()).await?))
}

/// POST /api/central/discount-codes/{id}/deactivate
pub async fn deactivate_discount_code(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
) -> ApiResult<DiscountCode> {
    let code = state.discount_codes().deactivate(&id).await?;
    Ok(ApiResponse::success_with_message(code, "Discount code deactivated"))
}

/// POST /api/central/discount-codes/quote
pub async fn quote(State(state): State<AppState>, AppJson(request): AppJson<QuoteRequest>) -> ApiResult<PriceQuote> {
    Ok(ApiResponse::success(
        state.discount_codes().quote(&request.code, &request.tier_id).await?,
    ))
}
