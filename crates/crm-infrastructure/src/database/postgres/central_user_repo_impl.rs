//! PostgreSQL central (super admin) user repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use tracing::info;
use uuid::Uuid;

use crm_core::domain::CentralUser;
use crm_core::error::DomainError;
use crm_core::repositories::CentralUserRepository;

use super::{conflict_or, db_error};

pub struct PgCentralUserRepository {
    pool: PgPool,
}

impl PgCentralUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct CentralUserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    is_active: bool,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<CentralUserRow> for CentralUser {
    fn from(row: CentralUserRow) -> Self {
        CentralUser {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            is_active: row.is_active,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str = "id, name, email, password_hash, is_active, last_login_at, created_at, updated_at";

#[async_trait]
impl CentralUserRepository for PgCentralUserRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<CentralUser>, DomainError> {
        let row: Option<CentralUserRow> = sqlx::query_as(&format!("SELECT {COLUMNS} FROM central_users WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("finding central user by id", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<CentralUser>, DomainError> {
        let row: Option<CentralUserRow> =
            sqlx::query_as(&format!("SELECT {COLUMNS} FROM central_users WHERE LOWER(email) = LOWER($1)"))
                .bind(email)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("finding central user by email", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn count(&self) -> Result<i64, DomainError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM central_users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting central users", e))
    }

    async fn create(&self, user: &CentralUser) -> Result<CentralUser, DomainError> {
        let row: CentralUserRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO central_users (id, name, email, password_hash, is_active, last_login_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.last_login_at)
        .bind(user.created_at)
        .bind(user.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| conflict_or("creating central user", e, |_| DomainError::EmailAlreadyExists(user.email.clone())))?;

        info!("Central user created: {}", crm_shared::utils::mask_email(&row.email));
        Ok(row.into())
    }

    async fn record_login(&self, id: &Uuid, at: DateTime<Utc>) -> Result<(), DomainError> {
        sqlx::query("UPDATE central_users SET last_login_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("recording central login", e))?;
        Ok(())
    }
}
