//! Contact handlers - /api/contacts

use crm_core::domain::{Contact, ContactChanges, ContactFilter, NewContact};
use crm_shared::PaginatedResult;
use uuid::Uuid;

use crate::dto::PageQuery;
use crate::handlers::ApiResult;
use crate::middleware::{AppJson, AppPath, AppQuery, TenantAuth, TenantContext};
use crate::response::ApiResponse;

const MODULE: &str = "contacts";

pub async fn list(
    ctx: TenantContext,
    auth: TenantAuth,
    AppQuery(filter): AppQuery<ContactFilter>,
    AppQuery(page): AppQuery<PageQuery>,
) -> ApiResult<PaginatedResult<Contact>> {
    ctx.module(MODULE)?;
    auth.require("contacts.view")?;
    Ok(ApiResponse::success(ctx.contacts().list(&filter, page.pagination()).await?))
}

pub async fn create(ctx: TenantContext, auth: TenantAuth, AppJson(input): AppJson<NewContact>) -> ApiResult<Contact> {
    ctx.module(MODULE)?;
    auth.require("contacts.create")?;
    let contact = ctx.contacts().create(input).await?;
    Ok(ApiResponse::created(contact, "Contact created"))
}

pub async fn get(ctx: TenantContext, auth: TenantAuth, AppPath(id): AppPath<Uuid>) -> ApiResult<Contact> {
    ctx.module(MODULE)?;
    auth.require("contacts.view")?;
    Ok(ApiResponse::success(ctx.contacts().get(&id).await?))
}

pub async fn update(
    ctx: TenantContext,
    auth: TenantAuth,
    AppPath(id): AppPath<Uuid>,
    AppJson(changes): AppJson<ContactChanges>,
) -> ApiResult<Contact> {
    ctx.module(MODULE)?;
    auth.require("contacts.update")?;
    let contact = ctx.contacts().update(&id, changes).await?;
    Ok(ApiResponse::success_with_message(contact, "Contact updated"))
}

pub async fn delete(ctx: TenantContext, auth: TenantAuth, AppPath(id): AppPath<Uuid>) -> ApiResult<()> {
    ctx.module(MODULE)?;
    auth.require("contacts.delete")?;
    ctx.contacts().delete(&id).await?;
    Ok(ApiResponse::message("Contact deleted"))
}
