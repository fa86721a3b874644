// ============================================================================
// CRM Core - Task Entity
// File: crates/crm-core/src/domain/task.rs
// Description: Activities (calls, meetings, emails, to-dos) and calendar windows
// ============================================================================

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;
use validator::Validate;

use crm_shared::constants::MAX_CALENDAR_WINDOW_DAYS;

use crate::error::DomainError;

string_enum! {
    pub enum TaskKind {
        Call => "call",
        Meeting => "meeting",
        Email => "email",
        Todo => "todo",
    }
    default = Todo
}

string_enum! {
    pub enum TaskStatus {
        Pending => "pending",
        InProgress => "in_progress",
        Done => "done",
        Cancelled => "cancelled",
    }
    default = Pending
}

string_enum! {
    pub enum TaskPriority {
        Low => "low",
        Medium => "medium",
        High => "high",
    }
    default = Medium
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Task {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub kind: TaskKind,
    pub status: TaskStatus,
    pub priority: TaskPriority,
    pub due_at: Option<DateTime<Utc>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub assignee_id: Option<Uuid>,
    pub lead_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub deal_id: Option<Uuid>,
    pub completed_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize, Validate)]
pub struct NewTask {
    #[validate(length(min = 2, max = 200, message = "Task title must be between 2 and 200 characters"))]
    pub title: String,
    #[validate(length(max = 5000, message = "Description too long"))]
    pub description: Option<String>,
    #[serde(default)]
    pub kind: TaskKind,
    #[serde(default)]
    pub priority: TaskPriority,
    pub due_at: Option<DateTime<Utc>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub assignee_id: Option<Uuid>,
    pub lead_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub deal_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize, Validate)]
pub struct TaskChanges {
    #[validate(length(min = 2, max = 200, message = "Task title must be between 2 and 200 characters"))]
    pub title: Option<String>,
    #[validate(length(max = 5000, message = "Description too long"))]
    pub description: Option<String>,
    pub kind: Option<TaskKind>,
    pub status: Option<TaskStatus>,
    pub priority: Option<TaskPriority>,
    pub due_at: Option<DateTime<Utc>>,
    pub starts_at: Option<DateTime<Utc>>,
    pub ends_at: Option<DateTime<Utc>>,
    pub assignee_id: Option<Uuid>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct TaskFilter {
    pub status: Option<TaskStatus>,
    pub assignee_id: Option<Uuid>,
    pub lead_id: Option<Uuid>,
    pub contact_id: Option<Uuid>,
    pub deal_id: Option<Uuid>,
}

/// Half-open range `[from, to)` queried by the calendar view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CalendarWindow {
    pub from: DateTime<Utc>,
    pub to: DateTime<Utc>,
}

impl CalendarWindow {
    pub fn new(from: DateTime<Utc>, to: DateTime<Utc>) -> Result<Self, DomainError> {
        if from >= to {
            return Err(DomainError::ValidationError(
                "calendar window start must precede its end".to_string(),
            ));
        }
        if to - from > Duration::days(MAX_CALENDAR_WINDOW_DAYS) {
            return Err(DomainError::ValidationError(format!(
                "calendar window cannot exceed {} days",
                MAX_CALENDAR_WINDOW_DAYS
            )));
        }
        Ok(Self { from, to })
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        at >= self.from && at < self.to
    }
}

fn check_schedule(starts_at: Option<DateTime<Utc>>, ends_at: Option<DateTime<Utc>>) -> Result<(), DomainError> {
    if let (Some(start), Some(end)) = (starts_at, ends_at) {
        if end < start {
            return Err(DomainError::ValidationError(
                "task end must not precede its start".to_string(),
            ));
        }
    }
    Ok(())
}

impl Task {
    pub fn new(input: NewTask) -> Result<Self, DomainError> {
        input.validate()?;
        check_schedule(input.starts_at, input.ends_at)?;
        let now = Utc::now();
        Ok(Self {
            id: Uuid::new_v4(),
            title: input.title.trim().to_string(),
            description: input.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty()),
            kind: input.kind,
            status: TaskStatus::Pending,
            priority: input.priority,
            due_at: input.due_at,
            starts_at: input.starts_at,
            ends_at: input.ends_at,
            assignee_id: input.assignee_id,
            lead_id: input.lead_id,
            contact_id: input.contact_id,
            deal_id: input.deal_id,
            completed_at: None,
            created_at: now,
            updated_at: now,
        })
    }

    pub fn apply(&mut self, changes: TaskChanges) -> Result<(), DomainError> {
        changes.validate()?;
        let starts_at = changes.starts_at.or(self.starts_at);
        let ends_at = changes.ends_at.or(self.ends_at);
        check_schedule(starts_at, ends_at)?;

        if let Some(status) = changes.status {
            self.set_status(status);
        }
        if let Some(title) = changes.title {
            self.title = title.trim().to_string();
        }
        if changes.description.is_some() {
            self.description = changes.description.map(|d| d.trim().to_string()).filter(|d| !d.is_empty());
        }
        if let Some(kind) = changes.kind {
            self.kind = kind;
        }
        if let Some(priority) = changes.priority {
            self.priority = priority;
        }
        if changes.due_at.is_some() {
            self.due_at = changes.due_at;
        }
        self.starts_at = starts_at;
        self.ends_at = ends_at;
        if changes.assignee_id.is_some() {
            self.assignee_id = changes.assignee_id;
        }
        self.updated_at = Utc::now();
        Ok(())
    }

    pub fn complete(&mut self) -> Result<(), DomainError> {
        if self.status == TaskStatus::Cancelled {
            return Err(DomainError::transition("task", self.status, TaskStatus::Done));
        }
        self.set_status(TaskStatus::Done);
        self.updated_at = Utc::now();
        Ok(())
    }

    fn set_status(&mut self, status: TaskStatus) {
        self.completed_at = match status {
            TaskStatus::Done => self.completed_at.or_else(|| Some(Utc::now())),
            _ => None,
        };
        self.status = status;
    }

    pub fn is_open(&self) -> bool {
        matches!(self.status, TaskStatus::Pending | TaskStatus::InProgress)
    }

    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        self.is_open() && self.due_at.is_some_and(|due| due < now)
    }

    /// True when the scheduled span or the due time falls inside the window.
    pub fn intersects(&self, window: &CalendarWindow) -> bool {
        let scheduled = match (self.starts_at, self.ends_at) {
            (Some(start), Some(end)) => start < window.to && end >= window.from,
            (Some(start), None) => window.contains(start),
            (None, Some(end)) => window.contains(end),
            (None, None) => false,
        };
        scheduled || self.due_at.is_some_and(|due| window.contains(due))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2026, 3, day, hour, 0, 0).unwrap()
    }

    fn new_task() -> NewTask {
        NewTask {
            title: "Call back".to_string(),
            description: None,
            kind: TaskKind::Call,
            priority: TaskPriority::High,
            due_at: None,
            starts_at: None,
            ends_at: None,
            assignee_id: None,
            lead_id: None,
            contact_id: None,
            deal_id: None,
        }
    }

    #[test]
    fn test_window_bounds() {
        assert!(CalendarWindow::new(at(2, 0), at(1, 0)).is_err());
        assert!(CalendarWindow::new(at(1, 0), at(1, 0)).is_err());
        assert!(CalendarWindow::new(at(1, 0), at(1, 0) + Duration::days(94)).is_err());
        assert!(CalendarWindow::new(at(1, 0), at(1, 0) + Duration::days(93)).is_ok());
    }

    #[test]
    fn test_end_before_start_rejected() {
        let mut input = new_task();
        input.starts_at = Some(at(5, 10));
        input.ends_at = Some(at(5, 9));
        assert!(Task::new(input).is_err());

        let mut task = Task::new(new_task()).unwrap();
        task.apply(TaskChanges { starts_at: Some(at(5, 10)), ..Default::default() }).unwrap();
        assert!(task
            .apply(TaskChanges { ends_at: Some(at(4, 10)), ..Default::default() })
            .is_err());
    }

    #[test]
    fn test_intersects_window() {
        let window = CalendarWindow::new(at(10, 0), at(11, 0)).unwrap();

        let mut spanning = new_task();
        spanning.starts_at = Some(at(9, 12));
        spanning.ends_at = Some(at(10, 1));
        assert!(Task::new(spanning).unwrap().intersects(&window));

        let mut due = new_task();
        due.due_at = Some(at(10, 15));
        assert!(Task::new(due).unwrap().intersects(&window));

        let mut outside = new_task();
        outside.due_at = Some(at(12, 0));
        assert!(!Task::new(outside).unwrap().intersects(&window));
    }

    #[test]
    fn test_complete() {
        let mut task = Task::new(new_task()).unwrap();
        task.complete().unwrap();
        assert_eq!(task.status, TaskStatus::Done);
        assert!(task.completed_at.is_some());
        assert!(!task.is_overdue(at(20, 0)));

        let mut cancelled = Task::new(new_task()).unwrap();
        cancelled.apply(TaskChanges { status: Some(TaskStatus::Cancelled), ..Default::default() }).unwrap();
        assert!(cancelled.complete().is_err());
    }
}
