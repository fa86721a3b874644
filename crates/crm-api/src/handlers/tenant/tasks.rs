//! Task and calendar handlers

use crm_core::domain::{NewTask, Task, TaskChanges, TaskFilter};
use crm_shared::PaginatedResult;
use uuid::Uuid;

use crate::dto::{CalendarQuery, PageQuery};
use crate::handlers::ApiResult;
use crate::middleware::{AppJson, AppPath, AppQuery, TenantAuth, TenantContext};
use crate::response::ApiResponse;

const MODULE: &str = "tasks";

pub async fn list(
    ctx: TenantContext,
    auth: TenantAuth,
    AppQuery(filter): AppQuery<TaskFilter>,
    AppQuery(page): AppQuery<PageQuery>,
) -> ApiResult<PaginatedResult<Task>> {
    ctx.module(MODULE)?;
    auth.require("tasks.view")?;
    Ok(ApiResponse::success(ctx.tasks().list(&filter, page.pagination()).await?))
}

pub async fn create(ctx: TenantContext, auth: TenantAuth, AppJson(input): AppJson<NewTask>) -> ApiResult<Task> {
    ctx.module(MODULE)?;
    auth.require("tasks.create")?;
    let task = ctx.tasks().create(input).await?;
    Ok(ApiResponse::created(task, "Task created"))
}

pub async fn get(ctx: TenantContext, auth: TenantAuth, AppPath(id): AppPath<Uuid>) -> ApiResult<Task> {
    ctx.module(MODULE)?;
    auth.require("tasks.view")?;
    Ok(ApiResponse::success(ctx.tasks().get(&id).await?))
}

pub async fn update(
    ctx: TenantContext,
    auth: TenantAuth,
    AppPath(id): AppPath<Uuid>,
    AppJson(changes): AppJson<TaskChanges>,
) -> ApiResult<Task> {
    ctx.module(MODULE)?;
    auth.require("tasks.update")?;
    let task = ctx.tasks().update(&id, changes).await?;
    Ok(ApiResponse::success_with_message(task, "Task updated"))
}

/// POST /api/tasks/{id}/complete
pub async fn complete(ctx: TenantContext, auth: TenantAuth, AppPath(id): AppPath<Uuid>) -> ApiResult<Task> {
    ctx.module(MODULE)?;
    auth.require("tasks.update")?;
    let task = ctx.tasks().complete(&id).await?;
    Ok(ApiResponse::success_with_message(task, "Task completed"))
}

pub async fn delete(ctx: TenantContext, auth: TenantAuth, AppPath(id): AppPath<Uuid>) -> ApiResult<()> {
    ctx.module(MODULE)?;
    auth.require("tasks.delete")?;
    ctx.tasks().delete(&id).await?;
    Ok(ApiResponse::message("Task deleted"))
}

/// Tasks scheduled or due in `[from, to)` - GET /api/calendar
pub async fn calendar(
    ctx: TenantContext,
    auth: TenantAuth,
    AppQuery(query): AppQuery<CalendarQuery>,
) -> ApiResult<Vec<Task>> {
    ctx.module("calendar")?;
    auth.require("tasks.view")?;
    let tasks = ctx.tasks().calendar(query.from, query.to, query.assignee_id).await?;
    Ok(ApiResponse::success(tasks))
}
