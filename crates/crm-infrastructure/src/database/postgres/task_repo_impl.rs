//! PostgreSQL task repository

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_shared::{PaginatedResult, Pagination};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crm_core::domain::{CalendarWindow, Task, TaskFilter, TaskKind, TaskPriority, TaskStatus};
use crm_core::error::DomainError;
use crm_core::repositories::TaskRepository;

use super::db_error;

pub struct PgTaskRepository {
    pool: PgPool,
}

impl PgTaskRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[derive(Debug, FromRow)]
struct TaskRow {
    id: Uuid,
    title: String,
    description: Option<String>,
    kind: String,
    status: String,
    priority: String,
    due_at: Option<DateTime<Utc>>,
    starts_at: Option<DateTime<Utc>>,
    ends_at: Option<DateTime<Utc>>,
    assignee_id: Option<Uuid>,
    lead_id: Option<Uuid>,
    contact_id: Option<Uuid>,
    deal_id: Option<Uuid>,
    completed_at: Option<DateTime<Utc>>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl From<TaskRow> for Task {
    fn from(row: TaskRow) -> Self {
        Task {
            id: row.id,
            title: row.title,
            description: row.description,
            kind: TaskKind::from_str(&row.kind).unwrap_or_default(),
            status: TaskStatus::from_str(&row.status).unwrap_or_default(),
            priority: TaskPriority::from_str(&row.priority).unwrap_or_default(),
            due_at: row.due_at,
            starts_at: row.starts_at,
            ends_at: row.ends_at,
            assignee_id: row.assignee_id,
            lead_id: row.lead_id,
            contact_id: row.contact_id,
            deal_id: row.deal_id,
            completed_at: row.completed_at,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

const COLUMNS: &str = "id, title, description, kind, status, priority, due_at, starts_at, ends_at, assignee_id, \
                       lead_id, contact_id, deal_id, completed_at, created_at, updated_at";

const FILTER: &str = r#"
    WHERE ($1::text IS NULL OR status = $1)
      AND ($2::uuid IS NULL OR assignee_id = $2)
      AND ($3::uuid IS NULL OR lead_id = $3)
      AND ($4::uuid IS NULL OR contact_id = $4)
      AND ($5::uuid IS NULL OR deal_id = $5)
"#;

const OPEN: &str = "status IN ('pending', 'in_progress')";

#[async_trait]
impl TaskRepository for PgTaskRepository {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Task>, DomainError> {
        let row: Option<TaskRow> = sqlx::query_as(&format!("SELECT {COLUMNS} FROM tasks WHERE id = $1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await
            .map_err(|e| db_error("finding task", e))?;

        Ok(row.map(|r| r.into()))
    }

    async fn list(&self, filter: &TaskFilter, pagination: Pagination) -> Result<PaginatedResult<Task>, DomainError> {
        let status = filter.status.map(|s| s.as_str());

        let total: i64 = sqlx::query_scalar(&format!("SELECT COUNT(*) FROM tasks {FILTER}"))
            .bind(status)
            .bind(filter.assignee_id)
            .bind(filter.lead_id)
            .bind(filter.contact_id)
            .bind(filter.deal_id)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting tasks", e))?;

        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            "SELECT {COLUMNS} FROM tasks {FILTER} ORDER BY due_at NULLS LAST, created_at DESC LIMIT $6 OFFSET $7"
        ))
        .bind(status)
        .bind(filter.assignee_id)
        .bind(filter.lead_id)
        .bind(filter.contact_id)
        .bind(filter.deal_id)
        .bind(pagination.limit())
        .bind(pagination.offset())
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("listing tasks", e))?;

        Ok(PaginatedResult::new(rows.into_iter().map(Into::into).collect(), total, pagination))
    }

    async fn in_window(&self, window: &CalendarWindow, assignee_id: Option<Uuid>) -> Result<Vec<Task>, DomainError> {
        let rows: Vec<TaskRow> = sqlx::query_as(&format!(
            r#"
            SELECT {COLUMNS} FROM tasks
            WHERE ($3::uuid IS NULL OR assignee_id = $3)
              AND (
                    (COALESCE(starts_at, ends_at) < $2 AND COALESCE(ends_at, starts_at) >= $1)
                 OR (due_at >= $1 AND due_at < $2)
              )
            ORDER BY COALESCE(starts_at, due_at, ends_at)
            "#
        ))
        .bind(window.from)
        .bind(window.to)
        .bind(assignee_id)
        .fetch_all(&self.pool)
        .await
        .map_err(|e| db_error("loading calendar", e))?;

        Ok(rows.into_iter().map(Into::into).collect())
    }

    async fn create(&self, task: &Task) -> Result<Task, DomainError> {
        let row: TaskRow = sqlx::query_as(&format!(
            r#"
            INSERT INTO tasks (id, title, description, kind, status, priority, due_at, starts_at, ends_at,
                               assignee_id, lead_id, contact_id, deal_id, completed_at, created_at, updated_at)
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16)
            RETURNING {COLUMNS}
            "#
        ))
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.kind.as_str())
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.due_at)
        .bind(task.starts_at)
        .bind(task.ends_at)
        .bind(task.assignee_id)
        .bind(task.lead_id)
        .bind(task.contact_id)
        .bind(task.deal_id)
        .bind(task.completed_at)
        .bind(task.created_at)
        .bind(task.updated_at)
        .fetch_one(&self.pool)
        .await
        .map_err(|e| db_error("creating task", e))?;

        Ok(row.into())
    }

    async fn update(&self, task: &Task) -> Result<Task, DomainError> {
        let row: Option<TaskRow> = sqlx::query_as(&format!(
            r#"
            UPDATE tasks
            SET title = $2, description = $3, kind = $4, status = $5, priority = $6, due_at = $7,
                starts_at = $8, ends_at = $9, assignee_id = $10, completed_at = $11, updated_at = $12
            WHERE id = $1
            RETURNING {COLUMNS}
            "#
        ))
        .bind(task.id)
        .bind(&task.title)
        .bind(&task.description)
        .bind(task.kind.as_str())
        .bind(task.status.as_str())
        .bind(task.priority.as_str())
        .bind(task.due_at)
        .bind(task.starts_at)
        .bind(task.ends_at)
        .bind(task.assignee_id)
        .bind(task.completed_at)
        .bind(task.updated_at)
        .fetch_optional(&self.pool)
        .await
        .map_err(|e| db_error("updating task", e))?;

        row.map(Into::into).ok_or_else(|| DomainError::not_found("task", task.id))
    }

    async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(&self.pool)
            .await
            .map_err(|e| db_error("deleting task", e))?;

        if result.rows_affected() == 0 {
            return Err(DomainError::not_found("task", id));
        }
        Ok(())
    }

    async fn count_open_due_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<i64, DomainError> {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM tasks WHERE {OPEN} AND due_at >= $1 AND due_at < $2"))
            .bind(from)
            .bind(to)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting tasks due", e))
    }

    async fn count_overdue(&self, now: DateTime<Utc>) -> Result<i64, DomainError> {
        sqlx::query_scalar(&format!("SELECT COUNT(*) FROM tasks WHERE {OPEN} AND due_at < $1"))
            .bind(now)
            .fetch_one(&self.pool)
            .await
            .map_err(|e| db_error("counting overdue tasks", e))
    }
}
