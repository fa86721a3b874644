//! Industries, services and custom field definitions

use crm_core::domain::{CatalogItem, CatalogKind, CustomField};
use crm_core::error::DomainError;
use crm_core::services::{CatalogItemInput, CustomFieldChanges, NewCustomField};
use uuid::Uuid;

use crate::error::ApiError;
use crate::handlers::ApiResult;
use crate::middleware::{AppJson, AppPath, TenantAuth, TenantContext};
use crate::response::ApiResponse;

const MANAGE: &str = "catalog.manage";

/// `/api/catalog/{kind}` segment to catalog kind.
fn kind(segment: &str) -> Result<CatalogKind, ApiError> {
    match segment {
        "industries" => Ok(CatalogKind::Industry),
        "services" => Ok(CatalogKind::Service),
        other => Err(DomainError::not_found("catalog", other).into()),
    }
}

pub async fn list_items(ctx: TenantContext, _auth: TenantAuth, AppPath(segment): AppPath<String>) -> ApiResult<Vec<CatalogItem>> {
    let kind = kind(&segment)?;
    Ok(ApiResponse::success(ctx.catalog().list_items(kind).await?))
}

pub async fn create_item(
    ctx: TenantContext,
    auth: TenantAuth,
    AppPath(segment): AppPath<String>,
    AppJson(input): AppJson<CatalogItemInput>,
) -> ApiResult<CatalogItem> {
    auth.require(MANAGE)?;
    let kind = kind(&segment)?;
    let item = ctx.catalog().create_item(kind, input).await?;
    Ok(ApiResponse::created(item, "Catalog item created"))
}

pub async fn update_item(
    ctx: TenantContext,
    auth: TenantAuth,
    AppPath((segment, id)): AppPath<(String, Uuid)>,
    AppJson(input): AppJson<CatalogItemInput>,
) -> ApiResult<CatalogItem> {
    auth.require(MANAGE)?;
    let kind = kind(&segment)?;
    let item = ctx.catalog().update_item(kind, &id, input).await?;
    Ok(ApiResponse::success_with_message(item, "Catalog item updated"))
}

pub async fn delete_item(
    ctx: TenantContext,
    auth: TenantAuth,
    AppPath((segment, id)): AppPath<(String, Uuid)>,
) -> ApiResult<()> {
    auth.require(MANAGE)?;
    let kind = kind(&segment)?;
    ctx.catalog().delete_item(kind, &id).await?;
    Ok(ApiResponse::message("Catalog item deleted"))
}

pub async fn list_fields(ctx: TenantContext, _auth: TenantAuth) -> ApiResult<Vec<CustomField>> {
    Ok(ApiResponse::success(ctx.catalog().list_fields().await?))
}

pub async fn create_field(
    ctx: TenantContext,
    auth: TenantAuth,
    AppJson(input): AppJson<NewCustomField>,
) -> ApiResult<CustomField> {
    auth.require(MANAGE)?;
    let field = ctx.catalog().create_field(input).await?;
    Ok(ApiResponse::created(field, "Custom field created"))
}

pub async fn update_field(
    ctx: TenantContext,
    auth: TenantAuth,
    AppPath(id): AppPath<Uuid>,
    AppJson(changes): AppJson<CustomFieldChanges>,
) -> ApiResult<CustomField> {
    auth.require(MANAGE)?;
    let field = ctx.catalog().update_field(&id, changes).await?;
    Ok(ApiResponse::success_with_message(field, "Custom field updated"))
}

pub async fn delete_field(ctx: TenantContext, auth: TenantAuth, AppPath(id): AppPath<Uuid>) -> ApiResult<()> {
    auth.require(MANAGE)?;
    ctx.catalog().delete_field(&id).await?;
    Ok(ApiResponse::message("Custom field deleted"))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_segments() {
        assert_eq!(kind("industries").unwrap(), CatalogKind::Industry);
        assert_eq!(kind("services").unwrap(), CatalogKind::Service);
        assert_eq!(kind("regions").unwrap_err().status(), axum::http::StatusCode::NOT_FOUND);
    }
}
