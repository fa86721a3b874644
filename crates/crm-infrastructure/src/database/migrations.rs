//! Schema bootstrap for the central and tenant databases

use sqlx::PgPool;
use tracing::info;

const CENTRAL_SCHEMA: &str = include_str!("../../migrations/central.sql");
const TENANT_SCHEMA: &str = include_str!("../../migrations/tenant.sql");

pub async fn run_central_migrations(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(CENTRAL_SCHEMA).execute(pool).await?;
    info!("Central schema is up to date");
    Ok(())
}

pub async fn apply_tenant_schema(pool: &PgPool) -> Result<(), sqlx::Error> {
    sqlx::raw_sql(TENANT_SCHEMA).execute(pool).await?;
    Ok(())
}
