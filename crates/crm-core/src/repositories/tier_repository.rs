//! Tier repository trait (port)

use async_trait::async_trait;
use crm_shared::{PaginatedResult, Pagination};
use uuid::Uuid;

use crate::domain::Tier;
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TierRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Tier>, DomainError>;
    async fn find_by_name(&self, name: &str) -> Result<Option<Tier>, DomainError>;
    async fn list(&self, active_only: bool, pagination: Pagination) -> Result<PaginatedResult<Tier>, DomainError>;
    async fn create(&self, tier: &Tier) -> Result<Tier, DomainError>;
    async fn update(&self, tier: &Tier) -> Result<Tier, DomainError>;
}
