//! Client repository trait (port)

use async_trait::async_trait;
use crm_shared::{PaginatedResult, Pagination};
use uuid::Uuid;

use crate::domain::{Client, ClientFilter};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ClientRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Client>, DomainError>;
    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Client>, DomainError>;
    async fn list(&self, filter: &ClientFilter, pagination: Pagination) -> Result<PaginatedResult<Client>, DomainError>;
    async fn create(&self, client: &Client) -> Result<Client, DomainError>;
    async fn update(&self, client: &Client) -> Result<Client, DomainError>;
    async fn delete(&self, id: &Uuid) -> Result<(), DomainError>;
}
