//! Tenant user repository trait (port)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_shared::{PaginatedResult, Pagination};
use uuid::Uuid;

use crate::domain::TenantUser;
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait UserRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<TenantUser>, DomainError>;
    async fn find_by_email(&self, email: &str) -> Result<Option<TenantUser>, DomainError>;
    async fn list(&self, search: Option<String>, pagination: Pagination) -> Result<PaginatedResult<TenantUser>, DomainError>;
    async fn count(&self) -> Result<i64, DomainError>;
    /// Subset of `ids` that belong to existing users.
    async fn existing_ids(&self, ids: Vec<Uuid>) -> Result<Vec<Uuid>, DomainError>;
    async fn create(&self, user: &TenantUser) -> Result<TenantUser, DomainError>;
    async fn update(&self, user: &TenantUser) -> Result<TenantUser, DomainError>;
    async fn set_roles(&self, user_id: &Uuid, role_ids: Vec<Uuid>) -> Result<(), DomainError>;
    async fn delete(&self, id: &Uuid) -> Result<(), DomainError>;
    async fn record_login(&self, id: &Uuid, at: DateTime<Utc>) -> Result<(), DomainError>;
}
