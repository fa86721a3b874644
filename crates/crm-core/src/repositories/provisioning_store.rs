// ============================================================================
// CRM Core - Provisioning Ports
// File: crates/crm-core/src/repositories/provisioning_store.rs
// Description: Tenant database lifecycle and transactional central writes
// ============================================================================

use async_trait::async_trait;
use crate::domain::{PaymentSettlement, ProvisioningRecord, RenewalRecord, Subscription, Tenant, TenantBlueprint};
use crate::error::DomainError;

/// Creates, seeds and drops tenant databases. Databases are always addressed
/// by name; nothing here switches a shared connection.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TenantDatabaseManager: Send + Sync {
    async fn database_exists(&self, database_name: &str) -> Result<bool, DomainError>;
    async fn create_database(&self, database_name: &str) -> Result<(), DomainError>;
    /// Applies the tenant schema and seeds roles, the default pipeline and the admin user.
    async fn initialize(&self, blueprint: &TenantBlueprint) -> Result<(), DomainError>;
    async fn drop_database(&self, database_name: &str) -> Result<(), DomainError>;
}

/// Multi-row central writes, each executed in a single transaction.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ProvisioningStore: Send + Sync {
    /// Inserts subscription, invoice, tenant and primary domain, redeems the
    /// discount/activation codes and marks the client active.
    async fn commit_provisioning(&self, record: &ProvisioningRecord) -> Result<(), DomainError>;

    /// Inserts the renewal subscription and invoice, optionally repointing the
    /// tenant, and redeems the activation code when one paid for it.
    async fn commit_renewal(&self, record: &RenewalRecord) -> Result<(), DomainError>;

    async fn commit_settlement(&self, settlement: &PaymentSettlement) -> Result<(), DomainError>;

    /// Persists a subscription status change together with its tenant.
    async fn commit_subscription_change(
        &self,
        subscription: &Subscription,
        tenant: Option<Tenant>,
    ) -> Result<(), DomainError>;
}
