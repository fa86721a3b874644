// ============================================================================
// CRM API - Provisioning Handlers
// File: crates/crm-api/src/handlers/central/provisioning.rs
// ============================================================================
//! Subscription purchase and activation code redemption. Both may create a
//! tenant database, so they run the full provisioning flow.

use axum::extract::State;
use crm_core::domain::ProvisionOutcome;
use crm_core::services::{ProvisionRequest, RedemptionOutcome};
use tracing::info;
use validator::Validate;

use crate::dto::RedeemCodeRequest;
use crate::handlers::ApiResult;
use crate::middleware::AppJson;
use crate::response::ApiResponse;
use crate::state::AppState;

/// Purchase handler - POST /api/central/provisioning
pub async fn purchase(
    State(state): State<AppState>,
    AppJson(request): AppJson<ProvisionRequest>,
) -> ApiResult<ProvisionOutcome> {
    request.validate()?;
    let outcome = state.provisioning().provision(request).await?;
    info!("Tenant {} provisioned for client {}", outcome.tenant.id, outcome.tenant.client_id);
    Ok(ApiResponse::created(outcome, "Tenant provisioned"))
}

/// Redeem handler - POST /api/central/activation-codes/redeem
pub async fn redeem(
    State(state): State<AppState>,
    AppJson(request): AppJson<RedeemCodeRequest>,
) -> ApiResult<RedemptionOutcome> {
    request.validate()?;
    let outcome = state
        .provisioning()
        .redeem_activation_code(&request.code, &request.client_id, request.admin)
        .await?;
    let message = match &outcome {
        RedemptionOutcome::Provisioned(_) => "Activation code redeemed, tenant provisioned",
        RedemptionOutcome::Extended { .. } => "Activation code redeemed, subscription extended",
    };
    Ok(ApiResponse::success_with_message(outcome, message))
}
