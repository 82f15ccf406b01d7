//! Task filtering for listings.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::core::{Priority, Task, TaskListId, TaskStatus};
use crate::manager::is_blocked_in;
use crate::store::StoreView;
use crate::Result;

/// Criteria a task must meet to be listed. Unset fields match everything.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskFilter {
    /// Case-insensitive substring of the title.
    pub title: Option<String>,
    /// Any of these statuses.
    #[serde(default)]
    pub statuses: Vec<TaskStatus>,
    /// Any of these priorities.
    #[serde(default)]
    pub priorities: Vec<Priority>,
    pub assignee: Option<String>,
    /// `Some(true)` keeps only unassigned tasks, `Some(false)` only assigned ones.
    pub unassigned: Option<bool>,
    /// Inclusive lower bound on the due date.
    pub due_from: Option<DateTime<Utc>>,
    /// Inclusive upper bound on the due date.
    pub due_to: Option<DateTime<Utc>>,
    /// `Some(true)` keeps only tasks without a due date, `Some(false)` only dated ones.
    pub no_due_date: Option<bool>,
    pub task_list: Option<TaskListId>,
    /// Keep only blocked (`true`) or only unblocked (`false`) tasks.
    pub blocked: Option<bool>,
}

impl TaskFilter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Check every field-level criterion. `blocked` is ignored here since it
    /// needs the dependency graph; see [`TaskFilter::apply`].
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(needle) = &self.title {
            if !task.title.to_lowercase().contains(&needle.to_lowercase()) {
                return false;
            }
        }
        if !self.statuses.is_empty() && !self.statuses.contains(&task.status) {
            return false;
        }
        if !self.priorities.is_empty() && !self.priorities.contains(&task.priority) {
            return false;
        }
        if let Some(assignee) = &self.assignee {
            if task.assignee.as_ref() != Some(assignee) {
                return false;
            }
        }
        if let Some(unassigned) = self.unassigned {
            if task.assignee.is_none() != unassigned {
                return false;
            }
        }
        if let Some(no_due) = self.no_due_date {
            if task.due_date.is_none() != no_due {
                return false;
            }
        }
        if self.due_from.is_some() || self.due_to.is_some() {
            let Some(due) = task.due_date else {
                return false;
            };
            if self.due_from.is_some_and(|from| due < from) {
                return false;
            }
            if self.due_to.is_some_and(|to| due > to) {
                return false;
            }
        }
        if let Some(list) = &self.task_list {
            if task.task_list != *list {
                return false;
            }
        }
        true
    }

    /// Filter `tasks`, consulting the graph in `view` when `blocked` is set.
    pub fn apply<'a, V: StoreView + ?Sized>(
        &self,
        view: &V,
        tasks: Vec<&'a Task>,
    ) -> Result<Vec<&'a Task>> {
        let mut kept = Vec::with_capacity(tasks.len());
        for task in tasks {
            if !self.matches(task) {
                continue;
            }
            if let Some(blocked) = self.blocked {
                if is_blocked_in(view, &task.id)? != blocked {
                    continue;
                }
            }
            kept.push(task);
        }
        Ok(kept)
    }
}
