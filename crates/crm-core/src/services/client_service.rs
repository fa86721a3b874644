// ============================================================================
// CRM Core - Client Service
// File: crates/crm-core/src/services/client_service.rs
// ============================================================================
//! Client management on the central database

use std::sync::Arc;

use crm_shared::utils::ensure_database_name_fits;
use crm_shared::{PaginatedResult, Pagination};
use tracing::{info, warn};
use uuid::Uuid;

use crate::domain::{Client, ClientChanges, ClientFilter, NewClient};
use crate::error::DomainError;
use crate::repositories::{ClientRepository, TenantRepository};

pub struct ClientService<C: ClientRepository, T: TenantRepository> {
    client_repo: Arc<C>,
    tenant_repo: Arc<T>,
    database_prefix: String,
}

impl<C: ClientRepository, T: TenantRepository> ClientService<C, T> {
    pub fn new(client_repo: Arc<C>, tenant_repo: Arc<T>, database_prefix: String) -> Self {
        Self { client_repo, tenant_repo, database_prefix }
    }

    pub async fn create(&self, input: NewClient) -> Result<Client, DomainError> {
        let client = Client::new(input)?;
        ensure_database_name_fits(&self.database_prefix, &client.subdomain)?;

        if self.client_repo.find_by_subdomain(&client.subdomain).await?.is_some() {
            warn!("Client creation refused, subdomain taken: {}", client.subdomain);
            return Err(DomainError::SubdomainAlreadyExists(client.subdomain));
        }

        let created = self.client_repo.create(&client).await?;
        info!("Client created: {} ({})", created.id, created.subdomain);
        Ok(created)
    }

    pub async fn list(&self, filter: &ClientFilter, pagination: Pagination) -> Result<PaginatedResult<Client>, DomainError> {
        self.client_repo.list(filter, pagination.normalized()).await
    }

    pub async fn get(&self, id: &Uuid) -> Result<Client, DomainError> {
        self.client_repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("client", id))
    }

    pub async fn update(&self, id: &Uuid, changes: ClientChanges) -> Result<Client, DomainError> {
        let mut client = self.get(id).await?;
        let previous_subdomain = client.subdomain.clone();
        client.apply(changes)?;

        if client.subdomain != previous_subdomain {
            ensure_database_name_fits(&self.database_prefix, &client.subdomain)?;
            // The tenant database name is derived from the subdomain.
            if self.tenant_repo.find_by_client(id).await?.is_some() {
                return Err(DomainError::ValidationError(
                    "subdomain cannot change once a tenant is provisioned".to_string(),
                ));
            }
            if self.client_repo.find_by_subdomain(&client.subdomain).await?.is_some() {
                return Err(DomainError::SubdomainAlreadyExists(client.subdomain));
            }
        }

        self.client_repo.update(&client).await
    }

    pub async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        let client = self.get(id).await?;
        if self.tenant_repo.find_by_client(&client.id).await?.is_some() {
            return Err(DomainError::ClientHasTenant(client.id));
        }
        self.client_repo.delete(&client.id).await?;
        info!("Client deleted: {}", client.id);
        Ok(())
    }
}
