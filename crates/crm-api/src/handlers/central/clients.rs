//! Client handlers - /api/central/clients

use axum::extract::State;
use crm_core::domain::{Client, ClientChanges, ClientFilter, NewClient};
use crm_shared::PaginatedResult;
use uuid::Uuid;

use crate::dto::PageQuery;
use crate::handlers::ApiResult;
use crate::middleware::{AppJson, AppPath, AppQuery};
use crate::response::ApiResponse;
use crate::state::AppState;

/// GET /api/central/clients
pub async fn list(
    State(state): State<AppState>,
    AppQuery(filter): AppQuery<ClientFilter>,
    AppQuery(page): AppQuery<PageQuery>,
) -> ApiResult<PaginatedResult<Client>> {
    Ok(ApiResponse::success(state.clients().list(&filter, page.pagination()).await?))
}

/// POST /api/central/clients
pub async fn create(State(state): State<AppState>, AppJson(input): AppJson<NewClient>) -> ApiResult<Client> {
    let client = state.clients().create(input).await?;
    Ok(ApiResponse::created(client, "Client created"))
}

/// GET /api/central/clients/{id}
pub async fn get(State(state): State<AppState>, AppPath(id): AppPath<Uuid>) -> ApiResult<Client> {
    Ok(ApiResponse::success(state.clients().get(&id).await?))
}

/// PUT /api/central/clients/{id}
pub async fn update(
    State(state): State<AppState>,
    AppPath(id): AppPath<Uuid>,
    AppJson(changes): AppJson<ClientChanges>,
) -> ApiResult<Client> {
    let client = state.clients().update(&id, changes).await?;
    Ok(ApiResponse::success_with_message(client, "Client updated"))
}

/// DELETE /api/central/clients/{id}
pub async fn delete(State(state): State<AppState>, AppPath(id): AppPath<Uuid>) -> ApiResult<()> {
    state.clients().delete(&id).await?;
    Ok(ApiResponse::message("Client deleted"))
}
