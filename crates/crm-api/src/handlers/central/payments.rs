// ============================================================================
// CRM API - Payment Gateway Callback
// File: crates/crm-api/src/handlers/central/payments.rs
// ============================================================================
//! Unauthenticated endpoint; the request is trusted only through its HMAC
//! signature, which the billing service checks before touching storage.

use axum::{body::Bytes, extract::State, http::HeaderMap};
use chrono::Utc;
use crm_core::services::CallbackOutcome;
use crm_shared::constants::{PAYMENT_SIGNATURE_HEADER, PAYMENT_TIMESTAMP_HEADER};

use crate::error::ApiError;
use crate::handlers::ApiResult;
use crate::response::ApiResponse;
use crate::state::AppState;

fn header<'a>(headers: &'a HeaderMap, name: &str) -> Result<&'a str, ApiError> {
    headers
        .get(name)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .ok_or_else(|| ApiError::unauthorized(format!("Missing {} header", name)))
}

/// Callback handler - POST /api/central/payments/callback
pub async fn callback(State(state): State<AppState>, headers: HeaderMap, body: Bytes) -> ApiResult<CallbackOutcome> {
    let timestamp: i64 = header(&headers, PAYMENT_TIMESTAMP_HEADER)?
        .parse()
        .map_err(|_| ApiError::BadRequest(format!("{} must be a unix timestamp", PAYMENT_TIMESTAMP_HEADER)))?;
    let signature = header(&headers, PAYMENT_SIGNATURE_HEADER)?;

    let outcome = state
        .billing()
        .handle_callback(timestamp, signature, &body, Utc::now())
        .await?;
    let message = if outcome.changed {
        "Payment applied"
    } else {
        "Payment already applied"
    };
    Ok(ApiResponse::success_with_message(outcome, message))
}
