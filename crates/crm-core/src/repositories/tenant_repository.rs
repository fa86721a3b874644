//! Tenant repository trait (port)

use async_trait::async_trait;
use crm_shared::{PaginatedResult, Pagination};
use uuid::Uuid;

use crate::domain::{Tenant, TenantDomain, TenantFilter};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TenantRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Tenant>, DomainError>;
    async fn find_by_client(&self, client_id: &Uuid) -> Result<Option<Tenant>, DomainError>;
    /// Tenant owning the (already normalized) host name.
    async fn find_by_host(&self, host: &str) -> Result<Option<Tenant>, DomainError>;
    async fn database_name_taken(&self, database_name: &str) -> Result<bool, DomainError>;
    async fn list(&self, filter: &TenantFilter, pagination: Pagination) -> Result<PaginatedResult<Tenant>, DomainError>;
    async fn update(&self, tenant: &Tenant) -> Result<Tenant, DomainError>;

    async fn domains(&self, tenant_id: &Uuid) -> Result<Vec<TenantDomain>, DomainError>;
    async fn find_domain(&self, domain: &str) -> Result<Option<TenantDomain>, DomainError>;
    async fn add_domain(&self, domain: &TenantDomain) -> Result<TenantDomain, DomainError>;
    async fn remove_domain(&self, id: &Uuid) -> Result<(), DomainError>;
}
