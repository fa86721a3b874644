//! # CRM Infrastructure
//!
//! PostgreSQL adapters for the central (landlord) database and for the
//! per-tenant databases, plus tenant database lifecycle management.

pub mod database;
pub mod tenancy;

pub use database::connection::{create_central_pool, lazy_tenant_pool};
pub use database::{
    create_pool, run_central_migrations, PgActivationCodeRepository, PgCatalogRepository,
    PgCentralUserRepository, PgClientRepository, PgContactRepository, PgDealRepository,
    PgDiscountCodeRepository, PgInvoiceRepository, PgLeadRepository, PgLocationRepository,
    PgPipelineRepository, PgProvisioningStore, PgRoleRepository, PgSubscriptionRepository,
    PgTaskRepository, PgTeamRepository, PgTenantRepository, PgTierRepository, PgUserRepository,
};
pub use tenancy::{PgTenantDatabaseManager, TenantPools};
