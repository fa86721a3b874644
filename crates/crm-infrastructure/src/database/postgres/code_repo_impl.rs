// ============================================================================
// CRM Infrastructure - PostgreSQL Activation & Discount Code Repositories
// File: crates/crm-infrastructure/src/database/postgres/code_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_shared::{PaginatedResult, Pagination};
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crm_core::domain::{ActivationCode, ActivationCodeFilter, ActivationCodeStatus, DiscountCode, DiscountKind};
use crm_core::error::DomainError;
use crm_core::repositories::{ActivationCodeRepository, DiscountCodeRepository};

use super::{conflict_or, db_error};

// ----------------------------------------------------------------------------
// Activation codes
// ----------------------------------------------------------------------------

pub struct PgActivationCodeRepository {
    pool: PgPool,
}

impl PgActivationCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ActivationCodeRow {
    id: Uuid,
    code: String,
    tier_id: Uuid,
    status: String,
    expires_at: Option<DateTime<Utc>>,
    used_by_client_id: Option<Uuid>,
    used_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
}

impl From<ActivationCodeRow> for ActivationCode {
    fn from(row: ActivationCodeRow) -> Self {
        ActivationCode {
            id: row.id,
            code: row.code,
            tier_id: row.tier_id,
            status: ActivationCodeStatus::from_str(&row.status).unwrap_or_default(),
            expires_at: row.expires_at,
            used_by_client_id: row.used_by_client_id,
            used_at: row.used_at,
            created_at: row.created_at,
        }
    }
}

const ACTIVATION_COLUMNS: &str = "id, code, tier_id, status, expires_at, used_by_client_id, used_at, created_at";

#[async_trait]
impl ActivationCodeRepository for PgActivationCodeRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<ActivationCode>, DomainError> {
        let row: Option<ActivationCodeRow> =
            sqlx::query_as(&format!("SELECT {ACTIVATION_COLUMNS} FROM activation_codes WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("finding activation code by id", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<ActivationCode>, DomainError> {
        let row: Option<ActivationCodeRow> =
            sqlx::query_as(&format!("SELECT {ACTIVATION_COLUMNS} FROM activation_codes WHERE code = $1"))
                .bind(code)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("finding activation code", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn create_batch(&self, codes: Vec<ActivationCode>) -> Result<Vec<ActivationCode>, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;

        for code in &codes {
            sqlx::query(
                r#"
                INSERT INTO activation_codes (id, code, tier_id, status, expires_at, used_by_client_id, used_at, created_at)
                VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
                "#,
            )
            .bind(code.id)
            .bind(&code.code)
            .bind(code.tier_id)
            .bind(code.status.as_str())
            .bind(code.expires_at)
            .bind(code.used_by_client_id)
            .bind(code.used_at)
            .bind(code.created_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| conflict_or("inserting activation code", e, |_| DomainError::CodeAlreadyExists(code.code.clone())))?;
        }

        tx.commit().await.map_err(|e| db_error("committing activation codes", e))?;
        info!("Generated {} activation code(s)", codes.len());
        Ok(codes)
    }

    async fn list(
        &self,
        filter: &ActivationCodeFilter,
        pagination: Pagination,
    ) -> Result<PaginatedResult<ActivationCode>, DomainError> {
        let status = filter.status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM activation_codes
            WHERE ($1::uuid IS NULL OR tier_id = $1) AND ($2::text IS NULL OR status = $2)
            "#,
        )
        .bind(filter.tier_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("counting activation codes", e))?;

        let rows: Vec<ActivationCodeRow> = sqlx::query_as(&format!(
            r#"
            SELECT {ACTIVATION_COLUMNS} FROM activation_codes
            WHERE ($1::uuid IS NULL OR tier_id = $1) AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC, code
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(filter.tier_id)
        .bind(status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing activation codes", e))?;

        Ok(PaginatedResult::new(rows.into_iter().map(Into::into).collect(), total, pagination))
    }

    async fn revoke(&self, id: &Uuid) -> Result<bool, DomainError> {
        let result = sqlx::query("UPDATE activation_codes SET status = 'revoked' WHERE id = $1 AND status = 'unused'")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("revoking activation code", e))?;

        Ok(result.rows_affected() == 1)
    }
}

// ----------------------------------------------------------------------------
// Discount codes
// ----------------------------------------------------------------------------

pub struct PgDiscountCodeRepository {
    pool: PgPool,
}

impl PgDiscountCodeRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct DiscountCodeRow {
    id: Uuid,
    code: String,
    kind: String,
    value: i64,
    tier_id: Option<Uuid>,
    max_uses: Option<i32>,
    used_count: i32,
    expires_at: Option<DateTime<Utc>>,
    is_active: bool,
    created_at: DateTime<Utc>,
}

impl From<DiscountCodeRow> for DiscountCode {
    fn from(row: DiscountCodeRow) -> Self {
        DiscountCode {
            id: row.id,
            code: row.code,
            kind: DiscountKind::from_str(&row.kind).unwrap_or_default(),
            value: row.value,
            tier_id: row.tier_id,
            max_uses: row.max_uses,
            used_count: row.used_count,
            expires_at: row.expires_at,
            is_active: row.is_active,
            created_at: row.created_at,
        }
    }
}

const DISCOUNT_COLUMNS: &str = "id, code, kind, value, tier_id, max_uses, used_count, expires_at, is_active, created_at";

#[async_trait]
impl DiscountCodeRepository for PgDiscountCodeRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<DiscountCode>, DomainError> {
        let row: Option<DiscountCodeRow> =
            sqlx::query_as(&format!("SELECT {DISCOUNT_COLUMNS} FROM discount_codes WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("finding discount code by id", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_code(&self, code: &str) -> Result<Option<DiscountCode>, DomainError> {
        let row: Option<DiscountCodeRow> =
            sqlx::query_as(&format!("SELECT {DISCOUNT_COLUMNS} FROM discount_codes WHERE code = $1"))
                .bind(code)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("finding discount code", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn list(&self, pagination: Pagination) -> Result<PaginatedResult<DiscountCode>, DomainError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM discount_codes")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting discount codes", e))?;

        let rows: Vec<DiscountCodeRow> = sqlx::query_as(&format!(
            "SELECT {DISCOUNT_COLUMNS} FROM discount_codes ORDER BY created_at DESC LIMIT $1 OFFSET $2"
        ))
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing discount codes", e))?;

        Ok(PaginatedResult::new(rows.into_iter().map(Into::into).collect(), total, pagination))
    }

    async fn create(&self, code: &DiscountCode) -> Result<DiscountCode, DomainError> {
        let row: DiscountCodeRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO discount_codes (id, code, kind, value, tier_id, max_uses, used_count, expires_at, is_active, created_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10)
            RETURNING {DISCOUNT_COLUMNS}
            "#
        ))
        .bind(code.id)
        .bind(&code.code)
        .bind(code.kind.as_str())
        .bind(code.value)
        .bind(code.tier_id)
        .bind(code.max_uses)
        .bind(code.used_count)
        .bind(code.expires_at)
        .bind(code.is_active)
        .bind(code.created_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or("creating discount code", e, |_| DomainError::CodeAlreadyExists(code.code.clone())))?;

        info!("Discount code created: {}", row.code);
        Ok(row.into())
    }

    /// `used_count` is owned by redemption and never written here.
    async fn update(&self, code: &DiscountCode) -> Result<DiscountCode, DomainError> {
        let row: Option<DiscountCodeRow> = sqlx::query_as(&format!(
            r#"
            UPDATE discount_codes
            SET kind = $2, value = $3, tier_id = $4, max_uses = $5, expires_at = $6, is_active = $7
            WHERE id = $1
            RETURNING {DISCOUNT_COLUMNS}
            "#
        ))
        .bind(code.id)
        .bind(code.kind.as_str())
        .bind(code.value)
        .bind(code.tier_id)
        .bind(code.max_uses)
        .bind(code.expires_at)
        .bind(code.is_active)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("updating discount code", e))?;

        row.map(Into::into).ok_or_else(|| DomainError::not_found("discount code", code.id))
    }
}
