//! Task repository trait (port)

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use crm_shared::{PaginatedResult, Pagination};
use uuid::Uuid;

use crate::domain::{CalendarWindow, Task, TaskFilter};
use crate::error::DomainError;

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait TaskRepository: Send + Sync {
    async fn find_by_id(&self, id: &Uuid) -> Result<Option<Task>, DomainError>;
    async fn list(&self, filter: &TaskFilter, pagination: Pagination) -> Result<PaginatedResult<Task>, DomainError>;
    /// Tasks whose schedule or due time may touch the window, ordered by start.
    async fn in_window(&self, window: &CalendarWindow, assignee_id: Option<Uuid>) -> Result<Vec<Task>, DomainError>;
    async fn create(&self, task: &Task) -> Result<Task, DomainError>;
    async fn update(&self, task: &Task) -> Result<Task, DomainError>;
    async fn delete(&self, id: &Uuid) -> Result<(), DomainError>;
    /// Open tasks due in `[from, to)`.
    async fn count_open_due_between(&self, from: DateTime<Utc>, to: DateTime<Utc>) -> Result<i64, DomainError>;
    /// Open tasks due before `now`.
    async fn count_overdue(&self, now: DateTime<Utc>) -> Result<i64, DomainError>;
}
