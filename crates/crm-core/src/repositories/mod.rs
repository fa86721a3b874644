//! Repository traits (ports)
//!
//! Central ports are backed by the landlord database. Tenant ports are bound
//! to one tenant database; adapters are built per request for the resolved
//! tenant.

// Central
pub mod client_repository;
pub mod tier_repository;
pub mod billing_repository;
pub mod tenant_repository;
pub mod code_repository;
pub mod central_user_repository;
pub mod provisioning_store;

// Tenant
pub mod lead_repository;
pub mod contact_repository;
pub mod deal_repository;
pub mod task_repository;
pub mod pipeline_repository;
pub mod catalog_repository;
pub mod location_repository;
pub mod user_repository;
pub mod role_repository;
pub mod team_repository;

pub use client_repository::ClientRepository;
pub use tier_repository::TierRepository;
pub use billing_repository::{InvoiceRepository, SubscriptionRepository};
pub use tenant_repository::TenantRepository;
pub use code_repository::{ActivationCodeRepository, DiscountCodeRepository};
pub use central_user_repository::CentralUserRepository;
pub use provisioning_store::{ProvisioningStore, TenantDatabaseManager};

pub use lead_repository::LeadRepository;
pub use contact_repository::ContactRepository;
pub use deal_repository::DealRepository;
pub use task_repository::TaskRepository;
pub use pipeline_repository::PipelineRepository;
pub use catalog_repository::CatalogRepository;
pub use location_repository::LocationRepository;
pub use user_repository::UserRepository;
pub use role_repository::RoleRepository;
pub use team_repository::TeamRepository;

#[cfg(test)]
pub use client_repository::MockClientRepository;
#[cfg(test)]
pub use tier_repository::MockTierRepository;
#[cfg(test)]
pub use billing_repository::{MockInvoiceRepository, MockSubscriptionRepository};
#[cfg(test)]
pub use tenant_repository::MockTenantRepository;
#[cfg(test)]
pub use code_repository::{MockActivationCodeRepository, MockDiscountCodeRepository};
#[cfg(test)]
pub use central_user_repository::MockCentralUserRepository;
#[cfg(test)]
pub use provisioning_store::{MockProvisioningStore, MockTenantDatabaseManager};
#[cfg(test)]
pub use lead_repository::MockLeadRepository;
#[cfg(test)]
pub use contact_repository::MockContactRepository;
#[cfg(test)]
pub use deal_repository::MockDealRepository;
#[cfg(test)]
pub use task_repository::MockTaskRepository;
#[cfg(test)]
pub use pipeline_repository::MockPipelineRepository;
#[cfg(test)]
pub use catalog_repository::MockCatalogRepository;
#[cfg(test)]
pub use location_repository::MockLocationRepository;
#[cfg(test)]
pub use user_repository::MockUserRepository;
#[cfg(test)]
pub use role_repository::MockRoleRepository;
#[cfg(test)]
pub use team_repository::MockTeamRepository;
