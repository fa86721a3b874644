//! PostgreSQL role repository (tenant database)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use uuid::Uuid;

use crm_core::domain::Role;
use crm_core::error::DomainError;
use crm_core::repositories::RoleRepository;

use super::{conflict_or, db_error};

pub struct PgRoleRepository {
    pool: PgPool,
}

impl PgRoleRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct RoleRow {
    id: Uuid,
    name: String,
    permissions: Vec<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<RoleRow> for Role {
    fn from(row: RoleRow) -> Self {
        Role {
            id: row.id,
            name: row.name,
            permissions: row.permissions,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str = "id, name, permissions, created_at, updated_at";

pub(crate) async fn insert_role(conn: &mut PgConnection, role: &Role) -> Result<(), sqlx::Error> {
    sqlx::query("INSERT INTO roles (id, name, permissions, created_at, updated_at) VALUES ($1, $2, $3, $4, $5)")
        .bind(role.id)
        .bind(&role.name)
        .bind(&role.permissions)
        .bind(role.created_at)
        .bind(role.updated_at)
        .execute(conn)
        .await?;
    Ok(())
}

fn name_taken(role: &Role) -> DomainError {
    DomainError::NameAlreadyExists {
        entity: "role",
        name: role.name.clone(),
    }
}

#[async_trait]
impl RoleRepository for PgRoleRepository {
    async fn list(&self) -> Result<Vec<Role>, DomainError> {
        let rows: Vec<RoleRow> = sqlx::query_as(&format!("SELECT {COLUMNS} FROM roles ORDER BY name"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("listing roles", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Role>, DomainError> {
        let row: Option<RoleRow> = sqlx::query_as(&format!("SELECT {COLUMNS} FROM roles WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("finding role by id", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Role>, DomainError> {
        let row: Option<RoleRow> = sqlx::query_as(&format!("SELECT {COLUMNS} FROM roles WHERE name = LOWER($1)"))
            .bind(name)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("finding role by name", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_many(&self, ids: Vec<Uuid>) -> Result<Vec<Role>, DomainError> {
        let rows: Vec<RoleRow> = sqlx::query_as(&format!("SELECT {COLUMNS} FROM roles WHERE id = ANY($1)"))
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("finding roles", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn roles_for_user(&self, user_id: &Uuid) -> Result<Vec<Role>, DomainError> {
        let rows: Vec<RoleRow> = sqlx::query_as(
            r#"
            SELECT r.id, r.name, r.permissions, r.created_at, r.updated_at
            FROM roles r
            JOIN user_roles ur ON ur.role_id = r.id
            WHERE ur.user_id = $1
            ORDER BY r.name
            "#,
        )
        .bind(user_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("loading user roles", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create(&self, role: &Role) -> Result<Role, DomainError> {
        let mut conn = self.pool.acquire().await.map_err(|e| db_error("acquiring connection", e))?;
        insert_role(&mut conn, role)
            .await
            .map_err(|e| conflict_or("creating role", e, |_| name_taken(role)))?;
        Ok(role.clone())
    }

    async fn update(&self, role: &Role) -> Result<Role, DomainError> {
        let row: Option<RoleRow> = sqlx::query_as(&format!(
            "UPDATE roles SET name = $2, permissions = $3, updated_at = $4 WHERE id = $1 RETURNING {COLUMNS}"
        ))
        .bind(role.id)
        .bind(&role.name)
        .bind(&role.permissions)
        .bind(role.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| conflict_or("updating role", e, |_| name_taken(role)))?;

        row.map(Into::into).ok_or_else(|| DomainError::not_found("role", role.id))
    }

    async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM roles WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("deleting role", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("role", id));
        }
        Ok(())
    }
}
