//! Lead repository trait (port)

use async_trait::async_trait;
use crm_shared::{PaginatedResult, Pagination};
use uuid::Uuid;

use crate::domain::{Contact, Deal, Lead, LeadFilter, LeadStatus};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait LeadRepository: Send + Sync {
    /// Loads the lead with its industry, service and custom field pivots.
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Lead>, DomainError>;
    async fn list(&self, filter: &LeadFilter, pagination: Pagination) -> Result<PaginatedResult<Lead>, DomainError>;
    async fn count(&self) -> Result<i64, DomainError>;
    async fn count_by_status(&self) -> Result<Vec<(LeadStatus, i64)>, DomainError>;
    /// Inserts the lead and its pivots in one transaction.
    async fn create(&self, lead: &Lead) -> Result<Lead, DomainError>;
    /// Updates the lead and replaces its pivots in one transaction.
    async fn update(&self, lead: &Lead) -> Result<Lead, DomainError>;
    /// Detaches pivots and deletes the lead in one transaction.
    async fn delete(&self, id: &Uuid) -> Result<(), DomainError>;
    /// Stores the converted lead, the new contact and the optional deal atomically.
    async fn convert(&self, lead: &Lead, contact: &Contact, deal: Option<Deal>) -> Result<(), DomainError>;
}
