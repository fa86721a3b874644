// ============================================================================
// CRM Infrastructure - Tenant Database Manager
// File: crates/crm-infrastructure/src/tenancy/database_manager.rs
// Description: CREATE/DROP of tenant databases, schema and seed data
// ============================================================================

use std::sync::Arc;

use async_trait::async_trait;
use sqlx::PgPool;
use tracing::{info, warn};

use crm_core::domain::{Pipeline, Role, TenantBlueprint, TenantUser};
use crm_core::error::DomainError;
use crm_core::repositories::TenantDatabaseManager;
use crm_shared::constants::MAX_DATABASE_NAME_LENGTH;

use crate::database::apply_tenant_schema;
use crate::database::postgres::pipeline_repo_impl::insert_pipeline;
use crate::database::postgres::role_repo_impl::insert_role;
use crate::database::postgres::user_repo_impl::insert_user;
use crate::database::create_pool;
use crate::database::postgres::db_error;
use crate::tenancy::TenantPools;

/// Runs DDL through the central pool; tenant databases live on the same server.
pub struct PgTenantDatabaseManager {
    admin_pool: PgPool,
    pools: Arc<TenantPools>,
}

impl PgTenantDatabaseManager {
    pub fn new(admin_pool: PgPool, pools: Arc<TenantPools>) -> Self {
        Self { admin_pool, pools }
    }
}

/// Quoted identifier for a generated database name. Names come from
/// `tenant_database_name`, so anything outside `[a-z0-9_]` is rejected.
fn quoted_identifier(name: &str) -> Result<String, DomainError> {
    let valid = !name.is_empty()
        && name.len() <= MAX_DATABASE_NAME_LENGTH
        && name.starts_with(|c: char| c.is_ascii_lowercase() || c == '_')
        && name.chars().all(|c| c.is_ascii_lowercase() || c.is_ascii_digit() || c == '_');
    if !valid {
        return Err(DomainError::ProvisioningFailed(format!("invalid database name: {}", name)));
    }
    Ok(format!("\"{}\"", name))
}

#[async_trait]
impl TenantDatabaseManager for PgTenantDatabaseManager {
    async fn database_exists(&self, database_name: &str) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM pg_database WHERE datname = $1)")
            .bind(database_name)
            .fetch_one(&self.admin_pool)
            .await
            .map_err(|e| db_error("checking tenant database", e))
    }

    async fn create_database(&self, database_name: &str) -> Result<(), DomainError> {
        let ident = quoted_identifier(database_name)?;
        // CREATE DATABASE cannot run inside a transaction or as a prepared statement.
        sqlx::raw_sql(&format!("CREATE DATABASE {}", ident))
            .execute(&self.admin_pool)
            .await
            .map_err(|e| {
                warn!("CREATE DATABASE {} failed: {}", database_name, e);
                DomainError::ProvisioningFailed(format!("could not create tenant database: {}", e))
            })?;
        Ok(())
    }

    async fn initialize(&self, blueprint: &TenantBlueprint) -> Result<(), DomainError> {
        let settings = self.pools.settings();
        let url = settings.tenant_url(&blueprint.database_name);
        let pool = create_pool(&url, 2)
            .await
            .map_err(|e| DomainError::ProvisioningFailed(format!("could not connect to tenant database: {}", e)))?;

        let seeded = seed(&pool, blueprint).await;
        pool.close().await;
        seeded?;

        info!("Tenant database {} initialized", blueprint.database_name);
        Ok(())
    }

    async fn drop_database(&self, database_name: &str) -> Result<(), DomainError> {
        let ident = quoted_identifier(database_name)?;
        self.pools.evict(database_name).await;
        sqlx::raw_sql(&format!("DROP DATABASE IF EXISTS {} WITH (FORCE)", ident))
            .execute(&self.admin_pool)
            .await
            .map_err(|e| db_error("dropping tenant database", e))?;
        warn!("Tenant database {} dropped", database_name);
        Ok(())
    }
}

/// Schema, default roles, the default pipeline and the admin account.
async fn seed(pool: &PgPool, blueprint: &TenantBlueprint) -> Result<(), DomainError> {
    apply_tenant_schema(pool)
        .await
        .map_err(|e| DomainError::ProvisioningFailed(format!("tenant schema failed: {}", e)))?;

    let roles = Role::defaults();
    let admin_role_ids = roles.iter().filter(|r| r.is_admin()).map(|r| r.id).collect();
    let admin = TenantUser::new(
        &blueprint.admin.name,
        &blueprint.admin.email,
        blueprint.admin.password_hash.clone(),
        admin_role_ids,
    );

    let mut tx = pool.begin().await.map_err(|e| db_error("starting seed transaction", e))?;
    for role in &roles {
        insert_role(&mut tx, role)
            .await
            .map_err(|e| db_error("seeding roles", e))?;
    }
    insert_pipeline(&mut tx, &Pipeline::default_sales())
        .await
        .map_err(|e| db_error("seeding default pipeline", e))?;
    insert_user(&mut tx, &admin)
        .await
        .map_err(|e| db_error("seeding admin user", e))?;
    tx.commit().await.map_err(|e| db_error("committing seed data", e))?;

    info!(
        "Seeded {} roles and admin {} for tenant {}",
        roles.len(),
        crm_shared::utils::mask_email(&admin.email),
        blueprint.tenant_id
    );
    Ok(())
}
