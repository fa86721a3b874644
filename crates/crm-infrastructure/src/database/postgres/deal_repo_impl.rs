// ============================================================================
// CRM Infrastructure - PostgreSQL Deal Repository
// File: crates/crm-infrastructure/src/database/postgres/deal_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use crm_shared::{PaginatedResult, Pagination};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crm_core::domain::{Deal, DealFilter, DealStatus};
use crm_core::error::DomainError;
use crm_core::repositories::DealRepository;

use super::{db_error, search_pattern};

pub struct PgDealRepository {
    pool: PgPool,
}

impl PgDealRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct DealRow {
    id: Uuid,
    title: String,
    contact_id: Option<Uuid>,
    lead_id: Option<Uuid>,
    stage_id: Uuid,
    amount_cents: i64,
    currency: String,
    expected_close_date: Option<NaiveDate>,
    owner_id: Option<Uuid>,
    status: String,
    closed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<DealRow> for Deal {
    fn from(row: DealRow) -> Self {
        Deal {
            id: row.id,
            title: row.title,
            contact_id: row.contact_id,
            lead_id: row.lead_id,
            stage_id: row.stage_id,
            amount_cents: row.amount_cents,
            currency: row.currency,
            expected_close_date: row.expected_close_date,
            owner_id: row.owner_id,
            status: DealStatus::from_str(&row.status).unwrap_or_default(),
            closed_at: row.closed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str = "id, title, contact_id, lead_id, stage_id, amount_cents, currency, expected_close_date, \
                       owner_id, status, closed_at, created_at, updated_at";

const FILTER: &str = r#"
    WHERE ($1::uuid IS NULL OR stage_id = $1)
      AND ($2::text IS NULL OR status = $2)
      AND ($3::uuid IS NULL OR owner_id = $3)
      AND ($4::uuid IS NULL OR contact_id = $4)
      AND ($5::text IS NULL OR title ILIKE $5)
"#;

pub(crate) async fn insert_deal(conn: &mut PgConnection, deal: &Deal) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO deals (id, title, contact_id, lead_id, stage_id, amount_cents, currency, expected_close_date,
                           owner_id, status, closed_at, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13)
        "#,
    )
    .bind(deal.id)
    .bind(&deal.title)
    .bind(deal.contact_id)
    .bind(deal.lead_id)
    .bind(deal.stage_id)
    .bind(deal.amount_cents)
    .bind(&deal.currency)
    .bind(deal.expected_close_date)
    .bind(deal.owner_id)
    .bind(deal.status.as_str())
    .bind(deal.closed_at)
    .bind(deal.created_at)
    .bind(deal.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl DealRepository for PgDealRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Deal>, DomainError> {
        let row: Option<DealRow> = sqlx::query_as(&format!("SELECT {COLUMNS} FROM deals WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("finding deal", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn list(&self, filter: &DealFilter, pagination: Pagination) -> Result<PaginatedResult<Deal>, DomainError> {
        let pattern = search_pattern(&filter.search);
        let status = filter.status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM deals {FILTER}"))
            .bind(filter.stage_id)
            .bind(status)
            .bind(filter.owner_id)
            .bind(filter.contact_id)
            .bind(&pattern)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting deals", e))?;

        let rows: Vec<DealRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM deals {FILTER} ORDER BY created_at DESC LIMIT $6 OFFSET $7"
        ))
        .bind(filter.stage_id)
        .bind(status)
        .bind(filter.owner_id)
        .bind(filter.contact_id)
        .bind(&pattern)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing deals", e))?;

        Ok(PaginatedResult::new(rows.into_iter().map(Into::into).collect(), total, pagination))
    }

    async fn create(&self, deal: &Deal) -> Result<Deal, DomainError> {
        let mut conn = self.pool.acquire().await.map_err(|e| db_error("acquiring connection", e))?;
        insert_deal(&mut conn, deal)
            .await
            .map_err(|e| db_error("creating deal", e))?;
        Ok(deal.clone())
    }

    async fn update(&self, deal: &Deal) -> Result<Deal, DomainError> {
        let row: Option<DealRow> = sqlx::query_as(&format!(
            r#"
            UPDATE deals
            SET title = $2, contact_id = $3, stage_id = $4, amount_cents = $5, currency = $6,
                expected_close_date = $7, owner_id = $8, status = $9, closed_at = $10, updated_at = $11
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(deal.id)
        .bind(&deal.title)
        .bind(deal.contact_id)
        .bind(deal.stage_id)
        .bind(deal.amount_cents)
        .bind(&deal.currency)
        .bind(deal.expected_close_date)
        .bind(deal.owner_id)
        .bind(deal.status.as_str())
        .bind(deal.closed_at)
        .bind(deal.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("updating deal", e))?;

        row.map(Into::into).ok_or_else(|| DomainError::not_found("deal", deal.id))
    }

    async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM deals WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("deleting deal", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("deal", id));
        }
        Ok(())
    }

    async fn count_in_stage(&self, stage_id: &Uuid) -> Result<i64, DomainError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM deals WHERE stage_id = $1")
            .bind(stage_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting deals in stage", e))
    }

    async fn count_in_pipeline(&self, pipeline_id: &Uuid) -> Result<i64, DomainError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM deals d JOIN stages s ON s.id = d.stage_id WHERE s.pipeline_id = $1")
            .bind(pipeline_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting deals in pipeline", e))
    }

    async fn open_totals(&self) -> Result<(i64, i64), DomainError> {
        sqlx::query_as("SELECT COUNT(*), COALESCE(SUM(amount_cents), 0)::int8 FROM deals WHERE status = 'open'")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("summing open deals", e))
    }
}
