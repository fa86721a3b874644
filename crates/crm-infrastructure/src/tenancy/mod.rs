//! Tenant database lifecycle and per-tenant connection pools

pub mod database_manager;
pub mod pools;

pub use database_manager::PgTenantDatabaseManager;
pub use pools::TenantPools;
