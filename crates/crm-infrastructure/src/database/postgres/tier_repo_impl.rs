// ============================================================================
// CRM Infrastructure - PostgreSQL Tier Repository
// File: crates/crm-infrastructure/src/database/postgres/tier_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_shared::{PaginatedResult, Pagination};
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crm_core::domain::Tier;
use crm_core::error::DomainError;
use crm_core::repositories::TierRepository;

use super::{conflict_or, db_error};

pub struct PgTierRepository {
    pool: PgPool,
}

impl PgTierRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct TierRow {
    id: Uuid,
    name: String,
    description: Option<String>,
    price_cents: i64,
    currency: String,
    duration_days: i32,
    modules: Vec<String>,
    max_users: i32,
    max_leads: Option<i32>,
    is_active: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TierRow> for Tier {
    fn from(row: TierRow) -> Self {
        Tier {
            id: row.id,
            name: row.name,
            description: row.description,
            price_cents: row.price_cents,
            currency: row.currency,
            duration_days: row.duration_days,
            modules: row.modules,
            max_users: row.max_users,
            max_leads: row.max_leads,
            is_active: row.is_active,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str = "id, name, description, price_cents, currency, duration_days, modules, \
                       max_users, max_leads, is_active, created_at, updated_at";

#[async_trait]
impl TierRepository for PgTierRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Tier>, DomainError> {
        let row: Option<TierRow> = sqlx::query_as(&format!("SELECT {COLUMNS} FROM tiers WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("finding tier by id", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Tier>, DomainError> {
        let row: Option<TierRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM tiers WHERE LOWER(name) = LOWER($1)"))
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("finding tier by name", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn list(&self, active_only: bool, pagination: Pagination) -> Result<PaginatedResult<Tier>, DomainError> {
        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM tiers WHERE (NOT $1 OR is_active)")
            .bind(active_only)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting tiers", e))?;

        let rows: Vec<TierRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM tiers WHERE (NOT $1 OR is_active) ORDER BY price_cents, name LIMIT $2 OFFSET $3"
        ))
        .bind(active_only)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing tiers", e))?;

        Ok(PaginatedResult::new(rows.into_iter().map(Into::into).collect(), total, pagination))
    }

    async fn create(&self, tier: &Tier) -> Result<Tier, DomainError> {
        let row: TierRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO tiers (id, name, description, price_cents, currency, duration_days, modules,
                               max_users, max_leads, is_active, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(tier.id)
        .bind(&tier.name)
        .bind(&tier.description)
        .bind(tier.price_cents)
        .bind(&tier.currency)
        .bind(tier.duration_days)
        .bind(&tier.modules)
        .bind(tier.max_users)
        .bind(tier.max_leads)
        .bind(tier.is_active)
        .bind(tier.created_at)
        .bind(tier.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            conflict_or("creating tier", e, |_| DomainError::NameAlreadyExists {
                entity: "tier",
                name: tier.name.clone(),
            })
        })?;

        info!("Tier created: {} ({})", row.name, row.id);
        Ok(row.into())
    }

    async fn update(&self, tier: &Tier) -> Result<Tier, DomainError> {
        let row: Option<TierRow> = sqlx::query_as(&format!(
            r#"
            UPDATE tiers
            SET name = $2, description = $3, price_cents = $4, duration_days = $5, modules = $6,
                max_users = $7, max_leads = $8, is_active = $9, updated_at = $10
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(tier.id)
        .bind(&tier.name)
        .bind(&tier.description)
        .bind(tier.price_cents)
        .bind(tier.duration_days)
        .bind(&tier.modules)
        .bind(tier.max_users)
        .bind(tier.max_leads)
        .bind(tier.is_active)
        .bind(tier.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| {
            conflict_or("updating tier", e, |_| DomainError::NameAlreadyExists {
                entity: "tier",
                name: tier.name.clone(),
            })
        })?;

        row.map(Into::into).ok_or_else(|| DomainError::not_found("tier", tier.id))
    }
}
