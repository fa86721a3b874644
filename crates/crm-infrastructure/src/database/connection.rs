//! Database connection pool

use std::time::Duration;

use crm_shared::config::DatabaseSettings;
use sqlx::{postgres::PgPoolOptions, PgPool};

pub async fn create_pool(url: &str, max_connections: u32) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(max_connections)
        .acquire_timeout(Duration::from_secs(3))
        .connect(url)
        .await
}

/// Central pool sized from the `[database]` settings.
pub async fn create_central_pool(settings: &DatabaseSettings) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(settings.max_connections)
        .min_connections(settings.min_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_seconds))
        .connect(&settings.central_url)
        .await
}

/// Tenant pools connect on first use so resolving a tenant never blocks on I/O.
pub fn lazy_tenant_pool(settings: &DatabaseSettings, database_name: &str) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(settings.tenant_max_connections)
        .acquire_timeout(Duration::from_secs(settings.acquire_timeout_seconds))
        .connect_lazy(&settings.tenant_url(database_name))
}
