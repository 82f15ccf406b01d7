//! Task data model.
//!
//! Tasks live inside a task list and carry the fields users edit directly.
//! Dependency edges are not stored on the task; the store's graph holds them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::project::TaskListId;
use crate::error::Error;

/// Unique identifier for a task.
///
/// Uses UUID v4 for generation and provides a short form display
/// for human-readable output.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskId(pub Uuid);

impl TaskId {
    /// Create a new unique task identifier.
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Return first 8 characters of the UUID for display.
    pub fn short(&self) -> String {
        self.0.to_string()[..8].to_string()
    }
}

impl Default for TaskId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Workflow status of a task.
///
/// Any status may move to any other. Dependencies never gate a transition;
/// the blocked signal derived from them is informational only.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TaskStatus {
    #[default]
    Todo,
    InProgress,
    Review,
    Done,
}

impl TaskStatus {
    pub const ALL: [TaskStatus; 4] = [
        TaskStatus::Todo,
        TaskStatus::InProgress,
        TaskStatus::Review,
        TaskStatus::Done,
    ];

    /// Stable code used in storage and JSON output.
    pub fn code(&self) -> &'static str {
        match self {
            TaskStatus::Todo => "TODO",
            TaskStatus::InProgress => "IN_PROGRESS",
            TaskStatus::Review => "REVIEW",
            TaskStatus::Done => "DONE",
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, TaskStatus::Done)
    }
}

impl std::fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TaskStatus::Todo => write!(f, "To Do"),
            TaskStatus::InProgress => write!(f, "In Progress"),
            TaskStatus::Review => write!(f, "In Review"),
            TaskStatus::Done => write!(f, "Done"),
        }
    }
}

impl std::str::FromStr for TaskStatus {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().replace('-', "_").as_str() {
            "TODO" | "TO_DO" => Ok(TaskStatus::Todo),
            "IN_PROGRESS" => Ok(TaskStatus::InProgress),
            "REVIEW" | "IN_REVIEW" => Ok(TaskStatus::Review),
            "DONE" => Ok(TaskStatus::Done),
            _ => Err(Error::Validation(format!("unknown task status: {}", s))),
        }
    }
}

/// Task priority.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Priority {
    Low,
    #[default]
    Medium,
    High,
}

impl Priority {
    pub const ALL: [Priority; 3] = [Priority::Low, Priority::Medium, Priority::High];

    pub fn code(&self) -> &'static str {
        match self {
            Priority::Low => "LOW",
            Priority::Medium => "MEDIUM",
            Priority::High => "HIGH",
        }
    }
}

impl std::fmt::Display for Priority {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Priority::Low => write!(f, "Low"),
            Priority::Medium => write!(f, "Medium"),
            Priority::High => write!(f, "High"),
        }
    }
}

impl std::str::FromStr for Priority {
    type Err = Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_uppercase().as_str() {
            "LOW" => Ok(Priority::Low),
            "MEDIUM" => Ok(Priority::Medium),
            "HIGH" => Ok(Priority::High),
            _ => Err(Error::Validation(format!("unknown priority: {}", s))),
        }
    }
}

/// A single task.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Task {
    /// Unique identifier for this task.
    pub id: TaskId,
    /// List that owns this task. Deleting the list deletes the task.
    pub task_list: TaskListId,
    pub title: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub status: TaskStatus,
    #[serde(default)]
    pub priority: Priority,
    pub due_date: Option<DateTime<Utc>>,
    /// Username of the assignee, if any.
    pub assignee: Option<String>,
    pub created_by: String,
    /// Manual ordering within the owning list.
    #[serde(default)]
    pub position: i32,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
}

impl Task {
    /// Create a new task in `task_list`.
    ///
    /// The task starts in TODO with MEDIUM priority, no assignee and no due date.
    pub fn new(task_list: TaskListId, title: &str, created_by: &str) -> Self {
        let now = Utc::now();
        Self {
            id: TaskId::new(),
            task_list,
            title: title.to_string(),
            description: String::new(),
            status: TaskStatus::Todo,
            priority: Priority::Medium,
            due_date: None,
            assignee: None,
            created_by: created_by.to_string(),
            position: 0,
            created_at: now,
            updated_at: now,
            estimated_hours: None,
            actual_hours: None,
        }
    }

    pub fn with_priority(mut self, priority: Priority) -> Self {
        self.priority = priority;
        self
    }

    pub fn with_due_date(mut self, due_date: DateTime<Utc>) -> Self {
        self.due_date = Some(due_date);
        self
    }

    pub fn with_assignee(mut self, assignee: &str) -> Self {
        self.assignee = Some(assignee.to_string());
        self
    }

    pub fn with_position(mut self, position: i32) -> Self {
        self.position = position;
        self
    }

    /// Change the status and return the previous one.
    pub fn set_status(&mut self, status: TaskStatus) -> TaskStatus {
        let previous = std::mem::replace(&mut self.status, status);
        self.updated_at = Utc::now();
        previous
    }

    /// Change the assignee and return the previous one.
    pub fn assign(&mut self, assignee: Option<String>) -> Option<String> {
        let previous = std::mem::replace(&mut self.assignee, assignee);
        self.updated_at = Utc::now();
        previous
    }

    pub fn is_done(&self) -> bool {
        self.status.is_done()
    }

    /// Open task whose due date has passed.
    pub fn is_overdue(&self, now: DateTime<Utc>) -> bool {
        !self.is_done() && self.due_date.is_some_and(|due| due < now)
    }

    pub fn validate(&self) -> crate::Result<()> {
        if self.title.trim().is_empty() {
            return Err(Error::Validation("task title must not be empty".to_string()));
        }
        if self.title.chars().count() > 200 {
            return Err(Error::Validation(
                "task title must be at most 200 characters".to_string(),
            ));
        }
        for hours in [self.estimated_hours, self.actual_hours].into_iter().flatten() {
            if hours.is_nan() || hours < 0.0 {
                return Err(Error::Validation(format!("invalid hours: {}", hours)));
            }
        }
        Ok(())
    }
}
