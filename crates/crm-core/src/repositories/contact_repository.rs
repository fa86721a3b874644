//! Contact repository trait (port)

use async_trait::async_trait;
use crm_shared::{PaginatedResult, Pagination};
use uuid::Uuid;

use crate::domain::{Contact, ContactFilter};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ContactRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Contact>, DomainError>;
    async fn list(&self, filter: &ContactFilter, pagination: Pagination) -> Result<PaginatedResult<Contact>, DomainError>;
    async fn create(&self, contact: &Contact) -> Result<Contact, DomainError>;
    async fn update(&self, contact: &Contact) -> Result<Contact, DomainError>;
    async fn delete(&self, id: &Uuid) -> Result<(), DomainError>;
}
