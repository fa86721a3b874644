// ============================================================================
// CRM Infrastructure - PostgreSQL Pipeline Repository
// File: crates/crm-infrastructure/src/database/postgres/pipeline_repo_impl.rs
// ============================================================================

use std::collections::HashMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgConnection, PgPool};
use tracing::info;
use uuid::Uuid;

use crm_core::domain::{Pipeline, Stage};
use crm_core::error::DomainError;
use crm_core::repositories::PipelineRepository;

use super::{conflict_or, db_error};

pub struct PgPipelineRepository {
    pool: PgPool,
}

impl PgPipelineRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    async fn load_stages(&self, pipeline_ids: &[Uuid]) -> Result<HashMap<Uuid, Vec<Stage>>, DomainError> {
        let rows: Vec<StageRow> = sqlx::query_as(&format!(
            "SELECT {STAGE_COLUMNS} FROM stages WHERE pipeline_id = ANY($1) ORDER BY pipeline_id, position"
        ))
        .bind(pipeline_ids)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("loading stages", e))?;

        let mut grouped: HashMap<Uuid, Vec<Stage>> = HashMap::new();
        for row in rows {
            grouped.entry(row.pipeline_id).or_default().push(row.into());
        }
        Ok(grouped)
    }

    async fn with_stages(&self, rows: Vec<PipelineRow>) -> Result<Vec<Pipeline>, DomainError> {
        let ids: Vec<Uuid> = rows.iter().map(|r| r.id).collect();
        let mut stages = self.load_stages(&ids).await?;
        Ok(rows
            .into_iter()
            .map(|row| {
                let own = stages.remove(&row.id).unwrap_or_default();
                row.into_pipeline(own)
            })
            .collect())
    }

    async fn hydrate(&self, row: Option<PipelineRow>) -> Result<Option<Pipeline>, DomainError> {
        match row {
            Some(row) => Ok(self.with_stages(vec![row]).await?.pop()),
            None => Ok(None),
        }
    }
}

#[derive(Debug, FromRow)]
struct PipelineRow {
    id: Uuid,
    name: String,
    is_default: bool,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl PipelineRow {
    fn into_pipeline(self, stages: Vec<Stage>) -> Pipeline {
        Pipeline {
            id: self.id,
            name: self.name,
            is_default: self.is_default,
            stages,
            created_at: self.created_at,
            updated_at: self.updated_at,
        }
    }
}

#[derive(Debug, FromRow)]
struct StageRow {
    id: Uuid,
    pipeline_id: Uuid,
    name: String,
    position: i32,
    probability: i32,
    is_won: bool,
    is_lost: bool,
}

impl From<StageRow> for Stage {
    fn from(row: StageRow) -> Self {
        Stage {
            id: row.id,
            pipeline_id: row.pipeline_id,
            name: row.name,
            position: row.position,
            probability: row.probability,
            is_won: row.is_won,
            is_lost: row.is_lost,
        }
    }
}

const PIPELINE_COLUMNS: &str = "id, name, is_default, created_at, updated_at";
const STAGE_COLUMNS: &str = "id, pipeline_id, name, position, probability, is_won, is_lost";

async fn insert_stage(conn: &mut PgConnection, stage: &Stage) -> Result<(), sqlx::Error> {
    sqlx::query(
        r#"
        INSERT INTO stages (id, pipeline_id, name, position, probability, is_won, is_lost)
        VALUES ($1, $2, $3, $4, $5, $6, $7)
        "#,
    )
    .bind(stage.id)
    .bind(stage.pipeline_id)
    .bind(&stage.name)
    .bind(stage.position)
    .bind(stage.probability)
    .bind(stage.is_won)
    .bind(stage.is_lost)
    .execute(conn)
    .await?;
    Ok(())
}

/// Inserts the pipeline and its stages on an open transaction.
pub(crate) async fn insert_pipeline(conn: &mut PgConnection, pipeline: &Pipeline) -> Result<(), sqlx::Error> {
    if pipeline.is_default {
        clear_default(conn, &pipeline.id).await?;
    }
    sqlx::query("INSERT INTO pipelines (id, name, is_default, created_at, updated_at) VALUES ($1, $2, $3, $4, $5)")
        .bind(pipeline.id)
        .bind(&pipeline.name)
        .bind(pipeline.is_default)
        .bind(pipeline.created_at)
        .bind(pipeline.updated_at)
        .execute(&mut *conn)
        .await?;
    for stage in &pipeline.stages {
        insert_stage(conn, stage).await?;
    }
    Ok(())
}

async fn clear_default(conn: &mut PgConnection, keep: &Uuid) -> Result<(), sqlx::Error> {
    sqlx::query("UPDATE pipelines SET is_default = FALSE WHERE is_default AND id <> $1")
        .bind(keep)
        .execute(conn)
        .await?;
    Ok(())
}

fn in_use_or(context: &str, entity: &'static str, e: sqlx::Error) -> DomainError {
    if e.as_database_error().is_some_and(|db| db.is_foreign_key_violation()) {
        DomainError::InUse { entity }
    } else {
        db_error(context, e)
    }
}

#[async_trait]
impl PipelineRepository for PgPipelineRepository {
    async fn list(&self) -> Result<Vec<Pipeline>, DomainError> {
        let rows: Vec<PipelineRow> =
            sqlx::query_as(&format!("SELECT {PIPELINE_COLUMNS} FROM pipelines ORDER BY is_default DESC, name"))
                .fetch_all(&self.pool)
                .await
                .map_err(|e| db_error("listing pipelines", e))?;

        self.with_stages(rows).await
    }

    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Pipeline>, DomainError> {
        let row: Option<PipelineRow> = sqlx::query_as(&format!("SELECT {PIPELINE_COLUMNS} FROM pipelines WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("finding pipeline by id", e))?;

        self.hydrate(row).await
    }

    async fn find_by_name(&self, name: &str) -> Result<Option<Pipeline>, DomainError> {
        let row: Option<PipelineRow> =
            sqlx::query_as(&format!("SELECT {PIPELINE_COLUMNS} FROM pipelines WHERE LOWER(name) = LOWER($1)"))
                .bind(name)
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("finding pipeline by name", e))?;

        self.hydrate(row).await
    }

    async fn find_default(&self) -> Result<Option<Pipeline>, DomainError> {
        let row: Option<PipelineRow> =
            sqlx::query_as(&format!("SELECT {PIPELINE_COLUMNS} FROM pipelines WHERE is_default LIMIT 1"))
                .fetch_optional(&self.pool)
                .await
                .map_err(|e| db_error("finding default pipeline", e))?;

        self.hydrate(row).await
    }

    async fn create(&self, pipeline: &Pipeline) -> Result<Pipeline, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;
        insert_pipeline(&mut tx, pipeline).await.map_err(|e| {
            conflict_or("creating pipeline", e, |_| DomainError::NameAlreadyExists {
                entity: "pipeline",
                name: pipeline.name.clone(),
            })
        })?;
        tx.commit().await.map_err(|e| db_error("committing pipeline", e))?;

        info!("Pipeline created: {} ({} stages)", pipeline.name, pipeline.stages.len());
        Ok(pipeline.clone())
    }

    async fn update(&self, pipeline: &Pipeline) -> Result<Pipeline, DomainError> {
        let mut tx = self.pool.begin().await.map_err(|e| db_error("starting transaction", e))?;
        if pipeline.is_default {
            clear_default(&mut tx, &pipeline.id)
                .await
                .map_err(|e| db_error("moving default pipeline", e))?;
        }
        let result = sqlx::query("UPDATE pipelines SET name = $2, is_default = $3, updated_at = $4 WHERE id = $1")
            .bind(pipeline.id)
            .bind(&pipeline.name)
            .bind(pipeline.is_default)
            .bind(pipeline.updated_at)
            .execute(&mut *tx)
            .await
            .map_err(|e| {
                conflict_or("updating pipeline", e, |_| DomainError::NameAlreadyExists {
                    entity: "pipeline",
                    name: pipeline.name.clone(),
                })
            })?;
        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("pipeline", pipeline.id));
        }
        tx.commit().await.map_err(|e| db_error("committing pipeline", e))?;

        Ok(pipeline.clone())
    }

    async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM pipelines WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| in_use_or("deleting pipeline", "pipeline", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("pipeline", id));
        }
        info!("Pipeline deleted: {}", id);
        Ok(())
    }

    async fn find_stage(&self, id: &Uuid) -> Result<Option<Stage>, DomainError> {
        let row: Option<StageRow> = sqlx::query_as(&format!("SELECT {STAGE_COLUMNS} FROM stages WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("finding stage", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn add_stage(&self, stage: &Stage) -> Result<Stage, DomainError> {
        let mut conn = self.pool.acquire().await.map_err(|e| db_error("acquiring connection", e))?;
        insert_stage(&mut conn, stage)
            .await
            .map_err(|e| db_error("adding stage", e))?;
        Ok(stage.clone())
    }

    async fn update_stage(&self, stage: &Stage) -> Result<Stage, DomainError> {
        let row: Option<StageRow> = sqlx::query_as(&format!(
            r#"
            UPDATE stages SET name = $2, probability = $3, is_won = $4, is_lost = $5
            WHERE id = $1
            RETURNING {STAGE_COLUMNS}
            "#
        ))
        .bind(stage.id)
        .bind(&stage.name)
        .bind(stage.probability)
        .bind(stage.is_won)
        .bind(stage.is_lost)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("updating stage", e))?;

        row.map(Into::into).ok_or_else(|| DomainError::not_found("stage", stage.id))
    }

    async fn reorder_stages(&self, pipeline_id: &Uuid, positions: Vec<(Uuid, i32)>) -> Result<(), DomainError> {
        let (ids, slots): (Vec<Uuid>, Vec<i32>) = positions.into_iter().unzip();
        sqlx::query(
            r#"
            UPDATE stages s SET position = p.position
            FROM UNNEST($2::uuid[], $3::int4[]) AS p(id, position)
            WHERE s.id = p.id AND s.pipeline_id = $1
            "#,
        )
        .bind(pipeline_id)
        .bind(&ids)
        .bind(&slots)
        .execute(&self.pool)
        .await
        .map_err(|e| db_error("reordering stages", e))?;
        Ok(())
    }

    async fn delete_stage(&self, id: &Uuid) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM stages WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| in_use_or("deleting stage", "stage", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("stage", id));
        }
        Ok(())
    }
}
