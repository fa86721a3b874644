//! PostgreSQL catalog repository: industries, services and custom field definitions

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crm_core::domain::{CatalogItem, CatalogKind, CustomField, CustomFieldType};
use crm_core::error::DomainError;
use crm_core::repositories::CatalogRepository;

use super::{conflict_or, db_error};

pub struct PgCatalogRepository {
    pool: PgPool,
}

impl PgCatalogRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct CatalogItemRow {
    id: Uuid,
    kind: String,
    name: String,
    description: Option<String>,
    created_at: DateTime<Utc>,
}

impl From<CatalogItemRow> for CatalogItem {
    fn from(row: CatalogItemRow) -> Self {
        CatalogItem {
            id: row.id,
            kind: CatalogKind::from_str(&row.kind).unwrap_or_default(),
            name: row.name,
            description: row.description,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct CustomFieldRow {
    id: Uuid,
    name: String,
    field_type: String,
    options: Vec<String>,
    is_required: bool,
    created_at: DateTime<Utc>,
}

impl From<CustomFieldRow> for CustomField {
    fn from(row: CustomFieldRow) -> Self {
        CustomField {
            id: row.id,
            name: row.name,
            field_type: CustomFieldType::from_str(&row.field_type).unwrap_or_default(),
            options: row.options,
            is_required: row.is_required,
            created_at: row.created_at,
        }
    }
}

const ITEM_COLUMNS: &str = "id, kind, name, description, created_at";
const FIELD_COLUMNS: &str = "id, name, field_type, options, is_required, created_at";

fn item_name_taken(item: &CatalogItem) -> DomainError {
    DomainError::NameAlreadyExists {
        entity: item.kind.label(),
        name: item.name.clone(),
    }
}

fn field_name_taken(field: &CustomField) -> DomainError {
    DomainError::NameAlreadyExists {
        entity: "custom field",
        name: field.name.clone(),
    }
}

#[async_trait]
impl CatalogRepository for PgCatalogRepository {
    async fn list_items(&self, kind: CatalogKind) -> Result<Vec<CatalogItem>, DomainError> {
        let rows: Vec<CatalogItemRow> =
            sqlx::query_as(&format!("SELECT {ITEM_COLUMNS} FROM catalog_items WHERE kind = $1 ORDER BY name"))
                .bind(kind.as_str())
                .fetch_all(&self.pool)
                .await
                .map_err(|e| db_error("listing catalog items", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_item(&self, kind: CatalogKind, id: &Uuid) -> Result<Option<CatalogItem>, DomainError> {
        let row: Option<CatalogItemRow> =
            sqlx::query_as(&format!("SELECT {ITEM_COLUMNS} FROM catalog_items WHERE kind = $1 AND id = $2"))
                .bind(kind.as_str())
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("finding catalog item", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_item_by_name(&self, kind: CatalogKind, name: &str) -> Result<Option<CatalogItem>, DomainError> {
        let row: Option<CatalogItemRow> = sqlx::query_as(&format!(
            "SELECT {ITEM_COLUMNS} FROM catalog_items WHERE kind = $1 AND LOWER(name) = LOWER($2)"
        ))
        .bind(kind.as_str())
        .bind(name)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("finding catalog item by name", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn existing_item_ids(&self, kind: CatalogKind, ids: Vec<Uuid>) -> Result<Vec<Uuid>, DomainError> {
        sqlx::query_scalar("SELECT id FROM catalog_items WHERE kind = $1 AND id = ANY($2)")
            .bind(kind.as_str())
            .bind(&ids)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("checking catalog item ids", e))
    }

    async fn create_item(&self, item: &CatalogItem) -> Result<CatalogItem, DomainError> {
        sqlx::query("INSERT INTO catalog_items (id, kind, name, description, created_at) VALUES ($1, $2, $3, $4, $5)")
            .bind(item.id)
            .bind(item.kind.as_str())
            .bind(&item.name)
            .bind(&item.description)
            .bind(item.created_at)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_or("creating catalog item", e, |_| item_name_taken(item)))?;

        Ok(item.clone())
    }

    async fn update_item(&self, item: &CatalogItem) -> Result<CatalogItem, DomainError> {
        let result = sqlx::query("UPDATE catalog_items SET name = $3, description = $4 WHERE kind = $1 AND id = $2")
            .bind(item.kind.as_str())
            .bind(item.id)
            .bind(&item.name)
            .bind(&item.description)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_or("updating catalog item", e, |_| item_name_taken(item)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(item.kind.label(), item.id));
        }
        Ok(item.clone())
    }

    async fn delete_item(&self, kind: CatalogKind, id: &Uuid) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM catalog_items WHERE kind = $1 AND id = $2")
            .bind(kind.as_str())
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("deleting catalog item", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found(kind.label(), id));
        }
        Ok(())
    }

    async fn list_fields(&self) -> Result<Vec<CustomField>, DomainError> {
        let rows: Vec<CustomFieldRow> =
            sqlx::query_as(&format!("SELECT {FIELD_COLUMNS} FROM custom_fields ORDER BY created_at, name"))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| db_error("listing custom fields", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn find_field(&self, id: &Uuid) -> Result<Option<CustomField>, DomainError> {
        let row: Option<CustomFieldRow> =
            sqlx::query_as(&format!("SELECT {FIELD_COLUMNS} FROM custom_fields WHERE id = $1"))
                .bind(id)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("finding custom field", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn find_field_by_name(&self, name: &str) -> Result<Option<CustomField>, DomainError> {
        let row: Option<CustomFieldRow> =
            sqlx::query_as(&format!("SELECT {FIELD_COLUMNS} FROM custom_fields WHERE LOWER(name) = LOWER($1)"))
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("finding custom field by name", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn create_field(&self, field: &CustomField) -> Result<CustomField, DomainError> {
        sqlx::query(
            r#"
            INSERT INTO custom_fields (id, name, field_type, options, is_required, created_at)
            VALUES ($1, $2, $3, $4, $5, $6)
            "#,
        )
        .bind(field.id)
        .bind(&field.name)
        .bind(field.field_type.as_str())
        .bind(&field.options)
        .bind(field.is_required)
        .bind(field.created_at)
        .execute(&self.pool)
        .await
        .map_err(|e| conflict_or("creating custom field", e, |_| field_name_taken(field)))?;

        Ok(field.clone())
    }

    /// The field type is fixed at creation and never rewritten.
    async fn update_field(&self, field: &CustomField) -> Result<CustomField, DomainError> {
        let result = sqlx::query("UPDATE custom_fields SET name = $2, options = $3, is_required = $4 WHERE id = $1")
            .bind(field.id)
            .bind(&field.name)
            .bind(&field.options)
            .bind(field.is_required)
            .execute(&self.pool)
            .await
            .map_err(|e| conflict_or("updating custom field", e, |_| field_name_taken(field)))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("custom field", field.id));
        }
        Ok(field.clone())
    }

    async fn delete_field(&self, id: &Uuid) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM custom_fields WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("deleting custom field", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("custom field", id));
        }
        Ok(())
    }
}
