// ============================================================================
// CRM Infrastructure - PostgreSQL Tenant Repository
// File: crates/crm-infrastructure/src/database/postgres/tenant_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_shared::{PaginatedResult, Pagination};
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crm_core::domain::{Tenant, TenantDomain, TenantFilter, TenantStatus};
use crm_core::error::DomainError;
use crm_core::repositories::TenantRepository;

use super::{conflict_or, db_error};

pub struct PgTenantRepository {
    pool: PgPool,
}

impl PgTenantRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal row types for SQLx mapping
#[derive(Debug, FromRow)]
struct TenantRow {
    id: Uuid,
    client_id: Uuid,
    subscription_id: Uuid,
    tier_id: Uuid,
    database_name: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TenantRow> for Tenant {
    fn from(row: TenantRow) -> Self {
        Tenant {
            id: row.id,
            client_id: row.client_id,
            subscription_id: row.subscription_id,
            tier_id: row.tier_id,
            database_name: row.database_name,
            status: TenantStatus::from_str(&row.status).unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct DomainRow {
    id: Uuid,
    tenant_id: Uuid,
    domain: String,
    is_primary: bool,
    created_at: DateTime<Utc>,
}

impl From<DomainRow> for TenantDomain {
    fn from(row: DomainRow) -> Self {
        TenantDomain {
            id: row.id,
            tenant_id: row.tenant_id,
            domain: row.domain,
            is_primary: row.is_primary,
            created_at: row.created_at,
        }
    }
}

const TENANT_COLUMNS: &str = "t.id, t.client_id, t.subscription_id, t.tier_id, t.database_name, t.status, t.created_at, t.updated_at";
const DOMAIN_COLUMNS: &str = "id, tenant_id, domain, is_primary, created_at";

pub(crate) async fn insert_tenant(conn: &mut PgConnection, tenant: &Tenant) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO tenants (id, client_id, subscription_id, tier_id, database_name, status, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(tenant.id)
    .bind(tenant.client_id)
    .bind(tenant.subscription_id)
    .bind(tenant.tier_id)
    .bind(&tenant.database_name)
    .bind(tenant.status.as_str())
    .bind(tenant.created_at)
    .bind(tenant.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

pub(crate) async fn update_tenant(conn: &mut PgConnection, tenant: &Tenant) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        "UPDATE tenants SET subscription_id = $2, tier_id = $3, status = $4, updated_at = $5 WHERE id = $1",
    )
    .bind(tenant.id)
    .bind(tenant.subscription_id)
    .bind(tenant.tier_id)
    .bind(tenant.status.as_str())
    .bind(tenant.updated_at)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn insert_domain(conn: &mut PgConnection, domain: &TenantDomain) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO domains (id, tenant_id, domain, is_primary, created_at) VALUES ($1, $2, $3, $4, $5)")
        .bind(domain.id)
        .bind(domain.tenant_id)
        .bind(&domain.domain)
        .bind(domain.is_primary)
        .bind(domain.created_at)
        .execute(conn)
        .await?;
    Ok(())
}

#[async_trait]
impl TenantRepository for PgTenantRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Tenant>, DomainError> {
        let row: Option<TenantRow> = sqlx::query_as(&format!("SELECT {TENANT_COLUMNS} FROM tenants t WHERE t.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("finding tenant by id", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_client(&self, client_id: &Uuid) -> Result<Option<Tenant>, DomainError> {
        let row: Option<TenantRow> =
            sqlx::query_as(&format!("SELECT {TENANT_COLUMNS} FROM tenants t WHERE t.client_id = $1"))
                .bind(client_id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("finding tenant by client", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_host(&self, host: &str) -> Result<Option<Tenant>, DomainError> {
        let row: Option<TenantRow> = sqlx::query_as(&format!(
            "SELECT {TENANT_COLUMNS} FROM tenants t JOIN domains d ON d.tenant_id = t.id WHERE d.domain = $1"
        ))
        .bind(host)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("resolving tenant by host", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn database_name_taken(&self, database_name: &str) -> Result<bool, DomainError> {
        sqlx::query_scalar("SELECT EXISTS (SELECT 1 FROM tenants WHERE database_name = $1)")
            .bind(database_name)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("checking tenant database name", e))
    }

    async fn list(&self, filter: &TenantFilter, pagination: Pagination) -> Result<PaginatedResult<Tenant>, DomainError> {
        let status = filter.status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tenants WHERE ($1::text IS NULL OR status = $1)")
            .bind(status)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting tenants", e))?;

        let rows: Vec<TenantRow> = sqlx::query_as(&format!(
            r#"
            SELECT {TENANT_COLUMNS} FROM tenants t
            WHERE ($1::text IS NULL OR t.status = $1)
            ORDER BY t.created_at DESC
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing tenants", e))?;

        Ok(PaginatedResult::new(rows.into_iter().map(Into::into).collect(), total, pagination))
    }

    async fn update(&self, tenant: &Tenant) -> Result<Tenant, DomainError> {
        let mut conn = self.pool.acquire().await.map_err(|e| db_error("acquiring connection", e))?;
        let touched = update_tenant(&mut conn, tenant)
            .await
            .map_err(|e| db_error("updating tenant", e))?;
        if touched == 0 {
            return Err(DomainError::not_found("tenant", tenant.id));
        }
        info!("Tenant {} is now {}", tenant.id, tenant.status);
        Ok(tenant.clone())
    }

    async fn domains(&self, tenant_id: &Uuid) -> Result<Vec<TenantDomain>, DomainError> {
        let rows: Vec<DomainRow> = sqlx::query_as(&format!(
            "SELECT {DOMAIN_COLUMNS} FROM domains WHERE tenant_id = $1 ORDER BY is_primary DESC, domain"
        ))
        .bind(tenant_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing tenant domains", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_domain(&self, domain: &str) -> Result<Option<TenantDomain>, DomainError> {
        let row: Option<DomainRow> = sqlx::query_as(&format!("SELECT {DOMAIN_COLUMNS} FROM domains WHERE domain = $1"))
            .bind(domain)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("finding domain", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn add_domain(&self, domain: &TenantDomain) -> Result<TenantDomain, DomainError> {
        let mut conn = self.pool.acquire().await.map_err(|e| db_error("acquiring connection", e))?;
        insert_domain(&mut conn, domain)
            .await
            .map_err(|e| conflict_or("adding domain", e, |_| DomainError::DomainAlreadyExists(domain.domain.clone())))?;

        info!("Domain {} attached to tenant {}", domain.domain, domain.tenant_id);
        Ok(domain.clone())
    }

    async fn remove_domain(&self, id: &Uuid) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM domains WHERE id = $1 AND NOT is_primary")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("removing domain", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("domain", id));
        }
        Ok(())
    }
}
