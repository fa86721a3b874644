// ============================================================================
// CRM Infrastructure - PostgreSQL Tenant User Repository
// File: crates/crm-infrastructure/src/database/postgres/user_repo_impl.rs
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_shared::{PaginatedResult, Pagination};
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crm_core::domain::TenantUser;
use crm_core::error::DomainError;
use crm_core::repositories::UserRepository;

use super::{conflict_or, db_error, search_pattern};

pub struct PgUserRepository {
    pool: PgPool,
}

impl PgUserRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

// Internal row type for SQLx mapping; role ids are aggregated from user_roles
#[derive(Debug, FromRow)]
struct TenantUserRow {
    id: Uuid,
    name: String,
    email: String,
    password_hash: String,
    is_active: bool,
    role_ids: Vec<Uuid>,
    last_login_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TenantUserRow> for TenantUser {
    fn from(row: TenantUserRow) -> Self {
        TenantUser {
            id: row.id,
            name: row.name,
            email: row.email,
            password_hash: row.password_hash,
            is_active: row.is_active,
            role_ids: row.role_ids,
            last_login_at: row.last_login_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const SELECT_USERS: &str = r#"
    SELECT u.id, u.name, u.email, u.password_hash, u.is_active,
           COALESCE(ARRAY(SELECT ur.role_id FROM user_roles ur WHERE ur.user_id = u.id), '{}') AS role_ids,
           u.last_login_at, u.created_at, u.updated_at
    FROM users u
"#;

pub(crate) async fn insert_user(conn: &mut PgConnection, user: &TenantUser) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO users (id, name, email, password_hash, is_active, last_login_at, created_at, updated_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(user.id)
    .bind(&user.name)
    .bind(&user.email)
    .bind(&user.password_hash)
    .bind(user.is_active)
    .bind(user.last_login_at)
    .bind(user.created_at)
    .bind(user.updated_at)
    .execute(&mut *conn)
    .await?;

    replace_roles(conn, &user.id, &user.role_ids).await
}

async fn replace_roles(conn: &mut PgConnection, user_id: &Uuid, role_ids: &[Uuid]) -> Result<(), sqlx::Error> {
    sqlx::query("DELETE FROM user_roles WHERE user_id = $1")
        .bind(user_id)
        .execute(&mut *conn)
        .await?;
    sqlx::query("INSERT INTO user_roles (user_id, role_id) SELECT $1, UNNEST($2::uuid[]) ON CONFLICT DO NOTHING")
        .bind(user_id)
        .bind(role_ids)
        .execute(&mut *conn)
        .await?;
    Ok(())
}

#[async_trait]
impl UserRepository for PgUserRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<TenantUser>, DomainError> {
        let row: Option<TenantUserRow> = sqlx::query_as(&format!("{SELECT_USERS} WHERE u.id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("finding user by id", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_email(&self, email: &str) -> Result<Option<TenantUser>, DomainError> {
        let row: Option<TenantUserRow> = sqlx::query_as(&format!("{SELECT_USERS} WHERE LOWER(u.email) = LOWER($1)"))
            .bind(email)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("finding user by email", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn list(&self, search: Option<String>, pagination: Pagination) -> Result<PaginatedResult<TenantUser>, DomainError> {
        let pattern = search_pattern(&search);

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE ($1::text IS NULL OR name ILIKE $1 OR email ILIKE $1)")
                .bind(&pattern)
                .fetch_one(&self.pool)
                .await
                .map_err(|e| db_error("counting users", e))?;

        let rows: Vec<TenantUserRow> = sqlx::query_as(&format!(
            r#"
            {SELECT_USERS}
            WHERE ($1::text IS NULL OR u.name ILIKE $1 OR u.email ILIKE $1)
            ORDER BY u.name
            LIMIT $2 OFFSET $3
            "#
        ))
        .bind(&pattern)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing users", e))?;

        Ok(PaginatedResult::new(rows.into_iter().map(Into::into).collect(), total, pagination))
    }

    async fn count(&self) -> Result<i64, DomainError> {
        sqlx::query_scalar("SELECT COUNT(*) FROM users")
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting users", e))
    }

    async fn existing_ids(&self, ids: Vec<Uuid>) -> Result<Vec<Uuid>, DomainError> {
        sqlx::query_scalar("SELECT id FROM users WHERE id = ANY($1)")
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("checking user ids", e))
    }

    async fn create(&self, user: &TenantUser) -> Result<TenantUser, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;
        insert_user(&mut tx, user)
            .await
            .map_err(|e| conflict_or("creating user", e, |_| DomainError::EmailAlreadyExists(user.email.clone())))?;
        tx.commit().await.map_err(|e| db_error("committing user", e))?;

        info!("User created successfully: {}", user.id);
        Ok(user.clone())
    }

    async fn update(&self, user: &TenantUser) -> Result<TenantUser, DomainError> {
        let result = sqlx::query(
            r#"
            UPDATE users
            SET name = $2, email = $3, password_hash = $4, is_active = $5, updated_at = $6
            WHERE id = $1
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.email)
        .bind(&user.password_hash)
        .bind(user.is_active)
        .bind(user.updated_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or("updating user", e, |_| DomainError::EmailAlreadyExists(user.email.clone())))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("user", user.id));
        }
        Ok(user.clone())
    }

    async fn set_roles(&self, user_id: &Uuid, role_ids: Vec<Uuid>) -> Result<(), DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;
        replace_roles(&mut tx, user_id, &role_ids)
            .await
            .map_err(|e| db_error("assigning roles", e))?;
        tx.commit().await.map_err(|e| db_error("committing roles", e))?;
        Ok(())
    }

    async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM users WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("deleting user", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("user", id));
        }
        Ok(())
    }

    async fn record_login(&self, id: &Uuid, at: DateTime<Utc>) -> Result<(), DomainError> {
        sqlx::query("UPDATE users SET last_login_at = $2 WHERE id = $1")
            .bind(id)
            .bind(at)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("recording login", e))?;
        Ok(())
    }
}
