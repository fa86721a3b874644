//! PostgreSQL contact repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_shared::{PaginatedResult, Pagination};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crm_core::domain::{Contact, ContactFilter};
use crm_core::error::DomainError;
use crm_core::repositories::ContactRepository;

use super::{db_error, search_pattern};

pub struct PgContactRepository {
    pool: PgPool,
}

impl PgContactRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct ContactRow {
    id: Uuid,
    first_name: String,
    last_name: Option<String>,
    email: Option<String>,
    phone: Option<String>,
    company: Option<String>,
    position: Option<String>,
    lead_id: Option<Uuid>,
    location_id: Option<Uuid>,
    notes: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ContactRow> for Contact {
    fn from(row: ContactRow) -> Self {
        Contact {
            id: row.id,
            first_name: row.first_name,
            last_name: row.last_name,
            email: row.email,
            phone: row.phone,
            company: row.company,
            position: row.position,
            lead_id: row.lead_id,
            location_id: row.location_id,
            notes: row.notes,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str = "id, first_name, last_name, email, phone, company, position, lead_id, location_id, notes, \
                       created_at, updated_at";

const FILTER: &str = r#"
    WHERE ($1::text IS NULL OR first_name ILIKE $1 OR last_name ILIKE $1 OR email ILIKE $1
                            OR phone ILIKE $1 OR company ILIKE $1)
      AND ($2::uuid IS NULL OR lead_id = $2)
      AND ($3::uuid IS NULL OR location_id = $3)
"#;

pub(crate) async fn insert_contact(conn: &mut PgConnection, contact: &Contact) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO contacts (id, first_name, last_name, email, phone, company, position, lead_id, location_id,
                              notes, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12)
        "#,
    )
    .bind(contact.id)
    .bind(&contact.first_name)
    .bind(&contact.last_name)
    .bind(&contact.email)
    .bind(&contact.phone)
    .bind(&contact.company)
    .bind(&contact.position)
    .bind(contact.lead_id)
    .bind(contact.location_id)
    .bind(&contact.notes)
    .bind(contact.created_at)
    .bind(contact.updated_at)
    .execute(conn)
    .await?;
    Ok(())
}

#[async_trait]
impl ContactRepository for PgContactRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Contact>, DomainError> {
        let row: Option<ContactRow> = sqlx::query_as(&format!("SELECT {COLUMNS} FROM contacts WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("finding contact", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn list(&self, filter: &ContactFilter, pagination: Pagination) -> Result<PaginatedResult<Contact>, DomainError> {
        let pattern = search_pattern(&filter.search);

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM contacts {FILTER}"))
            .bind(&pattern)
            .bind(filter.lead_id)
            .bind(filter.location_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting contacts", e))?;

        let rows: Vec<ContactRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM contacts {FILTER} ORDER BY created_at DESC LIMIT $4 OFFSET $5"
        ))
        .bind(&pattern)
        .bind(filter.lead_id)
        .bind(filter.location_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing contacts", e))?;

        Ok(PaginatedResult::new(rows.into_iter().map(Into::into).collect(), total, pagination))
    }

    async fn create(&self, contact: &Contact) -> Result<Contact, DomainError> {
        let mut conn = self.pool.acquire().await.map_err(|e| db_error("acquiring connection", e))?;
        insert_contact(&mut conn, contact)
            .await
            .map_err(|e| db_error("creating contact", e))?;
        Ok(contact.clone())
    }

    async fn update(&self, contact: &Contact) -> Result<Contact, DomainError> {
        let row: Option<ContactRow> = sqlx::query_as(&format!(
            r#"
            UPDATE contacts
            SET first_name = $2, last_name = $3, email = $4, phone = $5, company = $6, position = $7,
                location_id = $8, notes = $9, updated_at = $10
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(contact.id)
        .bind(&contact.first_name)
        .bind(&contact.last_name)
        .bind(&contact.email)
        .bind(&contact.phone)
        .bind(&contact.company)
        .bind(&contact.position)
        .bind(contact.location_id)
        .bind(&contact.notes)
        .bind(contact.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("updating contact", e))?;

        row.map(Into::into).ok_or_else(|| DomainError::not_found("contact", contact.id))
    }

    async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM contacts WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("deleting contact", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("contact", id));
        }
        Ok(())
    }
}
