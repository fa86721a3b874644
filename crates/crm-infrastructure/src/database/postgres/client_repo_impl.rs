// ============================================================================
// CRM Infrastructure - PostgreSQL Client Repository
// File: crates/crm-infrastructure/src/database/postgres/client_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_shared::{PaginatedResult, Pagination};
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crm_core::domain::{Client, ClientFilter, ClientStatus};
use crm_core::error::DomainError;
use crm_core::repositories::ClientRepository;

use super::{conflict_or, db_error, search_pattern};

pub struct PgClientRepository {
    pool: PgPool,
}

impl PgClientRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct ClientRow {
    id: Uuid,
    name: String,
    email: String,
    phone: Option<String>,
    company: Option<String>,
    subdomain: String,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<ClientRow> for Client {
    fn from(row: ClientRow) -> Self {
        Client {
            id: row.id,
            name: row.name,
            email: row.email,
            phone: row.phone,
            company: row.company,
            subdomain: row.subdomain,
            status: ClientStatus::from_str(&row.status).unwrap_or_default(),
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str = "id, name, email, phone, company, subdomain, status, created_at, updated_at";

#[async_trait]
impl ClientRepository for PgClientRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Client>, DomainError> {
        let row: Option<ClientRow> = sqlx::query_as(&format!("SELECT {COLUMNS} FROM clients WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("finding client by id", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_subdomain(&self, subdomain: &str) -> Result<Option<Client>, DomainError> {
        let row: Option<ClientRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM clients WHERE subdomain = LOWER($1)"))
                .bind(subdomain)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("finding client by subdomain", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn list(&self, filter: &ClientFilter, pagination: Pagination) -> Result<PaginatedResult<Client>, DomainError> {
        let pattern = search_pattern(&filter.search);
        let status = filter.status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(
            r#"
            SELECT COUNT(*) FROM clients
            WHERE ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1 OR company ILIKE $1 OR subdomain ILIKE $1)
              AND ($2::text IS NULL OR status = $2)
            "#,
        )
        .bind(&pattern)
        .bind(status)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("counting clients", e))?;

        let rows: Vec<ClientRow> = sqlx::query_as(&format!(
            r#"
            SELECT {COLUMNS} FROM clients
            WHERE ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1 OR company ILIKE $1 OR subdomain ILIKE $1)
              AND ($2::text IS NULL OR status = $2)
            ORDER BY created_at DESC
            LIMIT $3 OFFSET $4
            "#
        ))
        .bind(&pattern)
        .bind(status)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing clients", e))?;

        Ok(PaginatedResult::new(rows.into_iter().map(Into::into).collect(), total, pagination))
    }

    async fn create(&self, client: &Client) -> Result<Client, DomainError> {
        let row: ClientRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO clients (id, name, email, phone, company, subdomain, status, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(client.id)
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.company)
        .bind(&client.subdomain)
        .bind(client.status.as_str())
        .bind(client.created_at)
        .bind(client.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or("creating client", e, |_| DomainError::SubdomainAlreadyExists(client.subdomain.clone())))?;

        info!("Client created: {} ({})", row.id, row.subdomain);
        Ok(row.into())
    }

    async fn update(&self, client: &Client) -> Result<Client, DomainError> {
        let row: Option<ClientRow> = sqlx::query_as(&format!(
            r#"
            UPDATE clients
            SET name = $2, email = $3, phone = $4, company = $5, subdomain = $6, status = $7, updated_at = $8
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(client.id)
        .bind(&client.name)
        .bind(&client.email)
        .bind(&client.phone)
        .bind(&client.company)
        .bind(&client.subdomain)
        .bind(client.status.as_str())
        .bind(client.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_or("updating client", e, |_| DomainError::SubdomainAlreadyExists(client.subdomain.clone())))?;

        row.map(Into::into).ok_or_else(|| DomainError::not_found("client", client.id))
    }

    async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM clients WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| {
                if e.as_database_error().is_some_and(|db| db.is_foreign_key_violation()) {
                    DomainError::InUse { entity: "client" }
                } else {
                    db_error("deleting client", e)
                }
            })?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("client", id));
        }
        info!("Client deleted: {}", id);
        Ok(())
    }
}
