use chrono::Utc;
use crm_core::domain::DashboardSummary;

use crate::handlers::ApiResult;
use crate::middleware::{TenantAuth, TenantContext};
use crate::response::ApiResponse;

/// Home screen figures - GET /api/dashboard
pub async fn summary(ctx: TenantContext, _auth: TenantAuth) -> ApiResult<DashboardSummary> {
    Ok(ApiResponse::success(ctx.dashboard().summary(Utc::now()).await?))
}
