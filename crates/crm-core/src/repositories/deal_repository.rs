//! Deal repository trait (port)

use async_trait::async_trait;
use crm_shared::{PaginatedResult, Pagination};
use uuid::Uuid;

use crate::domain::{Deal, DealFilter};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DealRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Deal>, DomainError>;
    async fn list(&self, filter: &DealFilter, pagination: Pagination) -> Result<PaginatedResult<Deal>, DomainError>;
    async fn create(&self, deal: &Deal) -> Result<Deal, DomainError>;
    async fn update(&self, deal: &Deal) -> Result<Deal, DomainError>;
    async fn delete(&self, id: &Uuid) -> Result<(), DomainError>;
    async fn count_in_stage(&self, stage_id: &Uuid) -> Result<i64, DomainError>;
    async fn count_in_pipeline(&self, pipeline_id: &Uuid) -> Result<i64, DomainError>;
    /// Number and summed amount of open deals.
    async fn open_totals(&self) -> Result<(i64, i64), DomainError>;
}
