//! Activation and discount code repository traits (ports)

use async_trait::async_trait;
use crm_shared::{PaginatedResult, Pagination};
use uuid::Uuid;

use crate::domain::{ActivationCode, ActivationCodeFilter, DiscountCode};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ActivationCodeRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<ActivationCode>, DomainError>;
    async fn find_by_code(&self, code: &str) -> Result<Option<ActivationCode>, DomainError>;
    async fn create_batch(&self, codes: Vec<ActivationCode>) -> Result<Vec<ActivationCode>, DomainError>;
    async fn list(
        &self,
        filter: &ActivationCodeFilter,
        pagination: Pagination,
    ) -> Result<PaginatedResult<ActivationCode>, DomainError>;
    /// Revokes only while the code is still unused; false when nothing changed.
    async fn revoke(&self, id: &Uuid) -> Result<bool, DomainError>;
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DiscountCodeRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<DiscountCode>, DomainError>;
    async fn find_by_code(&self, code: &str) -> Result<Option<DiscountCode>, DomainError>;
    async fn list(&self, pagination: Pagination) -> Result<PaginatedResult<DiscountCode>, DomainError>;
    async fn create(&self, code: &DiscountCode) -> Result<DiscountCode, DomainError>;
    async fn update(&self, code: &DiscountCode) -> Result<DiscountCode, DomainError>;
}
