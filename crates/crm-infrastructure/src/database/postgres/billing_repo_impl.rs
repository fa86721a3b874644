// ============================================================================
// CRM Infrastructure - PostgreSQL Subscription & Invoice Repositories
// File: crates/crm-infrastructure/src/database/postgres/billing_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, NaiveDate, Utc};
use crm_shared::{PaginatedResult, Pagination};
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crm_core::domain::{
    Invoice, InvoiceFilter, InvoiceStatus, PaymentStatus, Subscription, SubscriptionFilter, SubscriptionStatus,
};
use crm_core::error::DomainError;
use crm_core::repositories::{InvoiceRepository, SubscriptionRepository};

use super::db_error;

// ----------------------------------------------------------------------------
// Subscriptions
// ----------------------------------------------------------------------------

pub struct PgSubscriptionRepository {
    pool: PgPool,
}

impl PgSubscriptionRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct SubscriptionRow {
    id: Uuid,
    client_id: Uuid,
    tier_id: Uuid,
    subscription_status: String,
    payment_status: String,
    auto_renew: bool,
    amount_cents: i64,
    discount_cents: i64,
    currency: String,
    discount_code_id: Option<Uuid>,
    activation_code_id: Option<Uuid>,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<SubscriptionRow> for Subscription {
    fn from(row: SubscriptionRow) -> Self {
        Subscription {
            id: row.id,
            client_id: row.client_id,
            tier_id: row.tier_id,
            subscription_status: SubscriptionStatus::from_str(&row.subscription_status).unwrap_or_default(),
            payment_status: PaymentStatus::from_str(&row.payment_status).unwrap_or_default(),
            auto_renew: row.auto_renew,
            amount_cents: row.amount_cents,
            discount_cents: row.discount_cents,
            currency: row.currency,
            discount_code_id: row.discount_code_id,
            activation_code_id: row.activation_code_id,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SUBSCRIPTION_COLUMNS: &str = "id, client_id, tier_id, subscription_status, payment_status, auto_renew, \
                                    amount_cents, discount_cents, currency, discount_code_id, activation_code_id, \
                                    starts_at, ends_at, created_at, updated_at";

pub(crate) async fn insert_subscription(conn: &mut PgConnection, s: &Subscription) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO subscriptions (id, client_id, tier_id, subscription_status, payment_status, auto_renew,
                                   amount_cents, discount_cents, currency, discount_code_id, activation_code_id,
                                   starts_at, ends_at, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15)
        "#,
    )
    .bind(s.id)
    .bind(s.client_id)
    .bind(s.tier_id)
    .bind(s.subscription_status.as_str())
    .bind(s.payment_status.as_str())
    .bind(s.auto_renew)
    .bind(s.amount_cents)
    .bind(s.discount_cents)
    .bind(&s.currency)
    .bind(s.discount_code_id)
    .bind(s.activation_code_id)
    .bind(s.starts_at)
    .bind(s.ends_at)
    .bind(s.created_at)
    .bind(s.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

/// Writes the mutable lifecycle columns; returns the number of rows touched.
pub(crate) async fn update_subscription(conn: &mut PgConnection, s: &Subscription) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE subscriptions
        SET subscription_status = $2, payment_status = $3, auto_renew = $4,
            starts_at = $5, ends_at = $6, updated_at = $7
        WHERE id = $1
        "#,
    )
    .bind(s.id)
    .bind(s.subscription_status.as_str())
    .bind(s.payment_status.as_str())
    .bind(s.auto_renew)
    .bind(s.starts_at)
    .bind(s.ends_at)
    .bind(s.updated_at)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

#[async_trait]
impl SubscriptionRepository for PgSubscriptionRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Subscription>, DomainError> {
        let row: Option<SubscriptionRow> =
            sqlx::query_as(&format!("SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("finding subscription by id", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn list(
        &self,
        filter: &SubscriptionFilter,
        pagination: Pagination,
    ) -> Result<PaginatedResult<Subscription>, DomainError> {
        let status = filter.status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM subscriptions
            WHERE ($1::uuid IS NULL OR client_id = $1) AND ($2::text IS NULL OR subscription_status = $2)
            "#,
        )
        .bind(filter.client_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("counting subscriptions", e))?;

        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
            WHERE ($1::uuid IS NULL OR client_id = $1) AND ($2::text IS NULL OR subscription_status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(filter.client_id)
        .bind(status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing subscriptions", e))?;

        Ok(PaginatedResult::new(rows.into_iter().map(Into::into).collect(), total, pagination))
    }

    async fn find_open_for_client(&self, client_id: &Uuid) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
            WHERE client_id = $1 AND subscription_status IN ('active', 'pending')
            ORDER BY created_at DESC
            "#
        ))
        .bind(client_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("finding open subscriptions", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_due_for_expiry(&self, now: DateTime<Utc>) -> Result<Vec<Subscription>, DomainError> {
        let rows: Vec<SubscriptionRow> = sqlx::query_as(&format!(
            r#"
            SELECT {SUBSCRIPTION_COLUMNS} FROM subscriptions
            WHERE subscription_status = 'active' AND ends_at IS NOT NULL AND ends_at <= $1
            ORDER BY ends_at
            "#
        ))
        .bind(now)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("finding subscriptions due for expiry", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn update(&self, subscription: &Subscription) -> Result<Subscription, DomainError> {
        let mut conn = self.pool.acquire().await.map_err(|e| db_error("acquiring connection", e))?;
        let touched = update_subscription(&mut conn, subscription)
            .await
            .map_err(|e| db_error("updating subscription", e))?;
        if touched == 0 {
            return Err(DomainError::not_found("subscription", subscription.id));
        }
        Ok(subscription.clone())
    }
}

// ----------------------------------------------------------------------------
// Invoices
// ----------------------------------------------------------------------------

pub struct PgInvoiceRepository {
    pool: PgPool,
}

impl PgInvoiceRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct InvoiceRow {
    id: Uuid,
    number: String,
    client_id: Uuid,
    subscription_id: Uuid,
    amount_cents: i64,
    discount_cents: i64,
    total_cents: i64,
    currency: String,
    status: String,
    due_date: NaiveDate,
    paid_at: Option<DateTime<Utc>>,
    payment_reference: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<InvoiceRow> for Invoice {
    fn from(row: InvoiceRow) -> Self {
        Invoice {
            id: row.id,
            number: row.number,
            client_id: row.client_id,
            subscription_id: row.subscription_id,
            amount_cents: row.amount_cents,
            discount_cents: row.discount_cents,
            total_cents: row.total_cents,
            currency: row.currency,
            status: InvoiceStatus::from_str(&row.status).unwrap_or_default(),
            due_date: row.due_date,
            paid_at: row.paid_at,
            payment_reference: row.payment_reference,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const INVOICE_COLUMNS: &str = "id, number, client_id, subscription_id, amount_cents, discount_cents, total_cents, \
                               currency, status, due_date, paid_at, payment_reference, created_at, updated_at";

pub(crate) async fn insert_invoice(conn: &mut PgConnection, invoice: &Invoice) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO invoices (id, number, client_id, subscription_id, amount_cents, discount_cents, total_cents,
                              currency, status, due_date, paid_at, payment_reference, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14)
        "#,
    )
    .bind(invoice.id)
    .bind(&invoice.number)
    .bind(invoice.client_id)
    .bind(invoice.subscription_id)
    .bind(invoice.amount_cents)
    .bind(invoice.discount_cents)
    .bind(invoice.total_cents)
    .bind(&invoice.currency)
    .bind(invoice.status.as_str())
    .bind(invoice.due_date)
    .bind(invoice.paid_at)
    .bind(&invoice.payment_reference)
    .bind(invoice.created_at)
    .bind(invoice.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

async fn update_invoice(conn: &mut PgConnection, invoice: &Invoice) -> Result<u64, sqlx::Error> {
    let result = sqlx::query(
        r#"
        UPDATE invoices
        SET status = $2, paid_at = $3, payment_reference = $4, updated_at = $5
        WHERE id = $1
        "#,
    )
    .bind(invoice.id)
    .bind(invoice.status.as_str())
    .bind(invoice.paid_at)
    .bind(&invoice.payment_reference)
    .bind(invoice.updated_at)
    .execute(conn)
    .await?;
    Ok(result.rows_affected())
}

#[async_trait]
impl InvoiceRepository for PgInvoiceRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Invoice>, DomainError> {
        let row: Option<InvoiceRow> = sqlx::query_as(&format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("finding invoice by id", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_number(&self, number: &str) -> Result<Option<Invoice>, DomainError> {
        let row: Option<InvoiceRow> =
            sqlx::query_as(&format!("SELECT {INVOICE_COLUMNS} FROM invoices WHERE number = $1"))
                .bind(number)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("finding invoice by number", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn list(&self, filter: &InvoiceFilter, pagination: Pagination) -> Result<PaginatedResult<Invoice>, DomainError> {
        let status = filter.status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM invoices
            WHERE ($1::uuid IS NULL OR client_id = $1) AND ($2::text IS NULL OR status = $2)
            "#,
        )
        .bind(filter.client_id)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("counting invoices", e))?;

        let rows: Vec<InvoiceRow> = sqlx::query_as(&format!(
            r#"
            SELECT {INVOICE_COLUMNS} FROM invoices
            WHERE ($1::uuid IS NULL OR client_id = $1) AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(filter.client_id)
        .bind(status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing invoices", e))?;

        Ok(PaginatedResult::new(rows.into_iter().map(Into::into).collect(), total, pagination))
    }

    async fn update(&self, invoice: &Invoice) -> Result<Invoice, DomainError> {
        let mut conn = self.pool.acquire().await.map_err(|e| db_error("acquiring connection", e))?;
        let touched = update_invoice(&mut conn, invoice)
            .await
            .map_err(|e| db_error("updating invoice", e))?;
        if touched == 0 {
            return Err(DomainError::not_found("invoice", invoice.id));
        }
        Ok(invoice.clone())
    }

    async fn mark_overdue(&self, today: NaiveDate) -> Result<u64, DomainError> {
        let result = sqlx::query(
            "UPDATE invoices SET status = 'overdue', updated_at = NOW() WHERE status = 'unpaid' AND due_date < $1",
        )
        .bind(today)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("marking invoices overdue", e))?;

        if result.rows_affected() > 0 {
            info!("Marked {} invoice(s) overdue", result.rows_affected());
        }
        Ok(result.rows_affected())
    }
}
