// ============================================================================
// CRM Infrastructure - PostgreSQL Location Repository
// File: crates/crm-infrastructure/src/database/postgres/location_repo_impl.rs
// Description: Nested-set hierarchy; writers serialize on a table lock
// ============================================================================

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crm_core::domain::{Location, LocationKind, NewLocation};
use crm_core::error::DomainError;
use crm_core::repositories::LocationRepository;

use super::db_error;

pub struct PgLocationRepository {
    pool: PgPool,
}

impl PgLocationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct LocationRow {
    id: Uuid,
    name: String,
    kind: String,
    parent_id: Option<Uuid>,
    lft: i32,
    rgt: i32,
    depth: i32,
    created_at: DateTime<Utc>,
}

impl From<LocationRow> for Location {
    fn from(row: LocationRow) -> Self {
        Location {
            id: row.id,
            name: row.name,
            kind: LocationKind::from_str(&row.kind).unwrap_or_default(),
            parent_id: row.parent_id,
            lft: row.lft,
            rgt: row.rgt,
            depth: row.depth,
            created_at: row.created_at,
        }
    }
}

const COLUMNS: &str = "id, name, kind, parent_id, lft, rgt, depth, created_at";

/// Readers are not blocked; concurrent writers queue behind each other.
async fn lock_tree(conn: &mut PgConnection) -> Result<(), DomainError> {
    sqlx::query("LOCK TABLE locations IN EXCLUSIVE MODE")
        .execute(conn)
        .await
        .map_err(|e| db_error("locking location tree", e))?;
    Ok(())
}

async fn bounds(conn: &mut PgConnection, id: &Uuid) -> Result<(i32, i32), DomainError> {
    let row: Option<(i32, i32)> = sqlx::query_as("SELECT lft, rgt FROM locations WHERE id = $1")
        .bind(id)
        .fetch_optional(conn)
        .await
        .map_err(|e| db_error("reading location bounds", e))?;

    row.ok_or_else(|| DomainError::not_found("location", id))
}

async fn insert_row(conn: &mut PgConnection, location: &Location) -> Result<(), DomainError> {
    sqlx::query(
        r#"
        INSERT INTO locations (id, name, kind, parent_id, lft, rgt, depth, created_at)
        VALUES ($1, $2, $3, $4, $5, $6, $7, $8)
        "#,
    )
    .bind(location.id)
    .bind(&location.name)
    .bind(location.kind.as_str())
    .bind(location.parent_id)
    .bind(location.lft)
    .bind(location.rgt)
    .bind(location.depth)
    .bind(location.created_at)
    .execute(conn)
    .await
    .map_err(|e| db_error("inserting location", e))?;
    Ok(())
}

#[async_trait]
impl LocationRepository for PgLocationRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Location>, DomainError> {
        let row: Option<LocationRow> = sqlx::query_as(&format!("SELECT {COLUMNS} FROM locations WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("finding location", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn all(&self) -> Result<Vec<Location>, DomainError> {
        let rows: Vec<LocationRow> = sqlx::query_as(&format!("SELECT {COLUMNS} FROM locations ORDER BY lft"))
            .fetch_all(&self.pool)
            .await
            .map_err(|e| db_error("loading locations", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn subtree(&self, id: &Uuid) -> Result<Vec<Location>, DomainError> {
        let rows: Vec<LocationRow> = sqlx::query_as(
            r#"
            SELECT d.id, d.name, d.kind, d.parent_id, d.lft, d.rgt, d.depth, d.created_at
            FROM locations n
            JOIN locations d ON d.lft BETWEEN n.lft AND n.rgt
            WHERE n.id = $1
            ORDER BY d.lft
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("loading location subtree", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn ancestors(&self, id: &Uuid) -> Result<Vec<Location>, DomainError> {
        let rows: Vec<LocationRow> = sqlx::query_as(
            r#"
            SELECT a.id, a.name, a.kind, a.parent_id, a.lft, a.rgt, a.depth, a.created_at
            FROM locations n
            JOIN locations a ON a.lft < n.lft AND a.rgt > n.rgt
            WHERE n.id = $1
            ORDER BY a.lft
            "#,
        )
        .bind(id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("loading location ancestors", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn insert_root(&self, input: NewLocation) -> Result<Location, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;
        lock_tree(&mut tx).await?;

        let max_rgt: i32 = sqlx::query_scalar("SELECT COALESCE(MAX(rgt), 0) FROM locations")
            .fetch_one(&mut *tx)
            .await
            .map_err(|e| db_error("reading location bounds", e))?;

        let mut location = Location::leaf(input, max_rgt + 1);
        location.parent_id = None;
        insert_row(&mut tx, &location).await?;

        tx.commit().await.map_err(|e| db_error("committing location", e))?;
        Ok(location)
    }

    async fn insert_child(&self, parent_id: &Uuid, input: NewLocation) -> Result<Location, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;
        lock_tree(&mut tx).await?;

        // Bounds are read after the lock so they reflect every committed insert.
        let (_, parent_rgt) = bounds(&mut tx, parent_id).await?;

        sqlx::query("UPDATE locations SET rgt = rgt + 2 WHERE rgt >= $1")
            .bind(parent_rgt)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("opening gap in location tree", e))?;
        sqlx::query("UPDATE locations SET lft = lft + 2 WHERE lft > $1")
            .bind(parent_rgt)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("opening gap in location tree", e))?;

        let mut location = Location::leaf(input, parent_rgt);
        location.parent_id = Some(*parent_id);
        insert_row(&mut tx, &location).await?;

        tx.commit().await.map_err(|e| db_error("committing location", e))?;
        Ok(location)
    }

    async fn rename(&self, id: &Uuid, name: &str) -> Result<Location, DomainError> {
        let row: Option<LocationRow> =
            sqlx::query_as(&format!("UPDATE locations SET name = $2 WHERE id = $1 RETURNING {COLUMNS}"))
                .bind(id)
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("renaming location", e))?;

        row.map(Into::into).ok_or_else(|| DomainError::not_found("location", id))
    }

    async fn delete_subtree(&self, id: &Uuid) -> Result<u64, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;
        lock_tree(&mut tx).await?;

        let (lft, rgt) = bounds(&mut tx, id).await?;
        let width = rgt - lft + 1;

        let removed = sqlx::query("DELETE FROM locations WHERE lft BETWEEN $1 AND $2")
            .bind(lft)
            .bind(rgt)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("deleting location subtree", e))?
            .rows_affected();

        sqlx::query("UPDATE locations SET rgt = rgt - $2 WHERE rgt > $1")
            .bind(rgt)
            .bind(width)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("closing gap in location tree", e))?;
        sqlx::query("UPDATE locations SET lft = lft - $2 WHERE lft > $1")
            .bind(rgt)
            .bind(width)
            .execute(&mut *tx)
            .await
            .map_err(|e| db_error("closing gap in location tree", e))?;

        tx.commit().await.map_err(|e| db_error("committing location delete", e))?;
        info!("Location {} deleted with {} row(s)", id, removed);
        Ok(removed)
    }
}

// Database-backed; run with `DATABASE_URL=... cargo test -- --ignored`.
#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::apply_tenant_schema;

    fn new_location(name: &str, kind: LocationKind, parent_id: Option<Uuid>) -> NewLocation {
        NewLocation { name: name.into(), kind, parent_id }
    }

    /// Every node's width matches its subtree size and sits inside its parent.
    async fn assert_nested_set(repo: &PgLocationRepository) {
        let all = repo.all().await.unwrap();
        for node in &all {
            let descendants = all.iter().filter(|d| node.lft <= d.lft && d.rgt <= node.rgt).count() as i32;
            assert!(node.lft < node.rgt, "{} has inverted bounds", node.name);
            assert_eq!(node.width(), 2 * descendants, "{} has a stale width", node.name);
            if let Some(parent_id) = node.parent_id {
                let parent = all.iter().find(|p| p.id == parent_id).unwrap();
                assert!(parent.is_ancestor_of(node));
            }
        }
        let mut bounds: Vec<i32> = all.iter().flat_map(|n| [n.lft, n.rgt]).collect();
        bounds.sort_unstable();
        assert_eq!(bounds, (1..=2 * all.len() as i32).collect::<Vec<_>>());
    }

    #[sqlx::test(migrations = false)]
    #[ignore = "requires DATABASE_URL"]
    async fn test_insert_and_delete_keep_nested_set(pool: PgPool) {
        apply_tenant_schema(&pool).await.unwrap();
        let repo = PgLocationRepository::new(pool);

        let egypt = repo.insert_root(new_location("Egypt", LocationKind::Country, None)).await.unwrap();
        let cairo = repo
            .insert_child(&egypt.id, new_location("Cairo", LocationKind::Governorate, Some(egypt.id)))
            .await
            .unwrap();
        let giza = repo
            .insert_child(&egypt.id, new_location("Giza", LocationKind::Governorate, Some(egypt.id)))
            .await
            .unwrap();
        repo.insert_child(&cairo.id, new_location("Nasr City", LocationKind::City, Some(cairo.id)))
            .await
            .unwrap();
        repo.insert_child(&giza.id, new_location("Dokki", LocationKind::City, Some(giza.id)))
            .await
            .unwrap();
        repo.insert_root(new_location("Jordan", LocationKind::Country, None)).await.unwrap();
        assert_nested_set(&repo).await;

        let egypt = repo.find_by_id(&egypt.id).await.unwrap().unwrap();
        assert_eq!(egypt.subtree_size(), 5);
        assert_eq!(repo.subtree(&egypt.id).await.unwrap().len(), 5);

        assert_eq!(repo.delete_subtree(&cairo.id).await.unwrap(), 2);
        assert_nested_set(&repo).await;
        let egypt = repo.find_by_id(&egypt.id).await.unwrap().unwrap();
        assert_eq!(egypt.subtree_size(), 3);
        assert_eq!(repo.all().await.unwrap().len(), 4);
    }
}
