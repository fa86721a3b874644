//! Task service: CRUD, completion and the calendar view

use std::sync::Arc;

use chrono::{DateTime, Utc};
use crm_shared::{PaginatedResult, Pagination};
use tracing::{debug, info};
use uuid::Uuid;

use crate::domain::{CalendarWindow, NewTask, Task, TaskChanges, TaskFilter};
use crate::error::DomainError;
use crate::repositories::TaskRepository;

pub struct TaskService<R: TaskRepository> {
    repo: Arc<R>,
}

impl<R: TaskRepository> TaskService<R> {
    pub fn new(repo: Arc<R>) -> Self {
        Self { repo }
    }

    pub async fn create(&self, input: NewTask) -> Result<Task, DomainError> {
        let task = self.repo.create(&Task::new(input)?).await?;
        info!("Task created: {}", task.id);
        Ok(task)
    }

    pub async fn list(&self, filter: &TaskFilter, pagination: Pagination) -> Result<PaginatedResult<Task>, DomainError> {
        self.repo.list(filter, pagination.normalized()).await
    }

    pub async fn get(&self, id: &Uuid) -> Result<Task, DomainError> {
        self.repo
            .find_by_id(id)
            .await?
            .ok_or_else(|| DomainError::not_found("task", id))
    }

    pub async fn update(&self, id: &Uuid, changes: TaskChanges) -> Result<Task, DomainError> {
        let mut task = self.get(id).await?;
        task.apply(changes)?;
        self.repo.update(&task).await
    }

    pub async fn complete(&self, id: &Uuid) -> Result<Task, DomainError> {
        let mut task = self.get(id).await?;
        task.complete()?;
        self.repo.update(&task).await
    }

    pub async fn delete(&self, id: &Uuid) -> Result<(), DomainError> {
        let task = self.get(id).await?;
        self.repo.delete(&task.id).await
    }

    /// Tasks whose schedule or due time falls in `[from, to)`.
    pub async fn calendar(
        &self,
        from: DateTime<Utc>,
        to: DateTime<Utc>,
        assignee_id: Option<Uuid>,
    ) -> Result<Vec<Task>, DomainError> {
        let window = CalendarWindow::new(from, to)?;
        let candidates = self.repo.in_window(&window, assignee_id).await?;
        let tasks: Vec<Task> = candidates.into_iter().filter(|t| t.intersects(&window)).collect();
        debug!("Calendar {} - {}: {} tasks", from, to, tasks.len());
        Ok(tasks)
    }
}
