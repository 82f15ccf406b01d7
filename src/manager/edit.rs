//! Task field edits, moves between lists, and comments.
//!
//! These run through the same store transactions as dependency changes and
//! report to the same activity recorder once committed.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::DependencyManager;
use crate::activity::{ActivityKind, ActivityRecord};
use crate::core::{Comment, CommentId, Priority, Task, TaskId, TaskListId};
use crate::store::TaskStore;
use crate::{tlog, tlog_debug, Error, Result};

/// Partial update of a task's descriptive fields. `None` leaves a field alone.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub priority: Option<Priority>,
    /// `Some(None)` clears the due date.
    pub due_date: Option<Option<DateTime<Utc>>>,
    pub estimated_hours: Option<f64>,
    pub actual_hours: Option<f64>,
}

impl TaskUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One changed field: name, old value, new value.
type FieldChange = (&'static str, Option<String>, Option<String>);

fn apply_update(task: &mut Task, update: TaskUpdate) -> Vec<FieldChange> {
    let mut changes = Vec::new();
    if let Some(title) = update.title.filter(|t| *t != task.title) {
        let previous = std::mem::replace(&mut task.title, title);
        changes.push(("title", Some(previous), Some(task.title.clone())));
    }
    if let Some(description) = update.description.filter(|d| *d != task.description) {
        let previous = std::mem::replace(&mut task.description, description);
        changes.push(("description", Some(previous), Some(task.description.clone())));
    }
    if let Some(priority) = update.priority.filter(|p| *p != task.priority) {
        let previous = std::mem::replace(&mut task.priority, priority);
        changes.push((
            "priority",
            Some(previous.code().to_string()),
            Some(priority.code().to_string()),
        ));
    }
    if let Some(due) = update.due_date.filter(|d| *d != task.due_date) {
        let previous = std::mem::replace(&mut task.due_date, due);
        changes.push((
            "due_date",
            previous.map(|d| d.to_rfc3339()),
            due.map(|d| d.to_rfc3339()),
        ));
    }
    if let Some(hours) = update.estimated_hours.filter(|h| Some(*h) != task.estimated_hours) {
        let previous = task.estimated_hours.replace(hours);
        changes.push((
            "estimated_hours",
            previous.map(|h| h.to_string()),
            Some(hours.to_string()),
        ));
    }
    if let Some(hours) = update.actual_hours.filter(|h| Some(*h) != task.actual_hours) {
        let previous = task.actual_hours.replace(hours);
        changes.push((
            "actual_hours",
            previous.map(|h| h.to_string()),
            Some(hours.to_string()),
        ));
    }
    if !changes.is_empty() {
        task.updated_at = Utc::now();
    }
    changes
}

impl<S: TaskStore> DependencyManager<S> {
    /// Edit the descriptive fields of a task. Returns the updated task.
    ///
    /// Each changed field produces one `TaskUpdated` record.
    ///
    /// # Errors
    /// `NotFound` for an unknown task, `Validation` if the result is invalid;
    /// the task is unchanged.
    pub fn update_task(&self, actor: &str, task: &TaskId, update: TaskUpdate) -> Result<Task> {
        let (updated, changes) = self.store.transaction(|txn| {
            let target = txn.get_task_mut(task)?;
            let changes = apply_update(target, update);
            target.validate()?;
            Ok((target.clone(), changes))
        })?;

        if changes.is_empty() {
            tlog_debug!("Update of {} changed nothing", task);
        }
        for (field, before, after) in changes {
            tlog!("{} updated {} of {}", actor, field, task);
            self.recorder.record(
                ActivityRecord::new(actor, *task, ActivityKind::TaskUpdated)
                    .with_field(field)
                    .with_change(before, after),
            );
        }
        Ok(updated)
    }

    /// Set a task's position, optionally moving it to another list of the
    /// same project.
    ///
    /// # Errors
    /// `NotFound` for an unknown task or list, `Validation` if the target
    /// list belongs to another project.
    pub fn move_task(
        &self,
        actor: &str,
        task: &TaskId,
        list: Option<TaskListId>,
        position: i32,
    ) -> Result<Task> {
        let (moved, before, after) = self.store.transaction(|txn| {
            let current = txn.get_task(task)?;
            let from_list = txn.get_task_list(&current.task_list)?.clone();
            let before = format!("{}:{}", from_list.name, current.position);

            let to_list = match list {
                Some(id) if id != from_list.id => {
                    let target = txn.get_task_list(&id)?.clone();
                    if target.project != from_list.project {
                        return Err(Error::Validation(format!(
                            "task list {} belongs to a different project",
                            id
                        )));
                    }
                    target
                }
                _ => from_list,
            };
            let after = format!("{}:{}", to_list.name, position);

            let target = txn.get_task_mut(task)?;
            target.task_list = to_list.id;
            target.position = position;
            target.updated_at = Utc::now();
            Ok((target.clone(), before, after))
        })?;

        if before != after {
            tlog!("{} moved {}: {} -> {}", actor, task, before, after);
            self.recorder.record(
                ActivityRecord::new(actor, *task, ActivityKind::TaskMoved)
                    .with_change(Some(before), Some(after)),
            );
        }
        Ok(moved)
    }

    /// Add a comment authored by `actor`.
    pub fn add_comment(&self, actor: &str, task: &TaskId, content: &str) -> Result<Comment> {
        let comment = Comment::new(*task, actor, content);
        let stored = comment.clone();
        self.store.transaction(|txn| txn.insert_comment(stored))?;

        tlog!("{} commented on {}", actor, task);
        self.recorder.record(
            ActivityRecord::new(actor, *task, ActivityKind::CommentAdded)
                .with_change(None, Some(comment.content.clone())),
        );
        Ok(comment)
    }

    /// Comments on a task, newest first.
    pub fn list_comments(&self, task: &TaskId) -> Result<Vec<Comment>> {
        self.store
            .read(|view| Ok(view.comments(task)?.into_iter().cloned().collect()))
    }

    /// Replace a comment's content. Only its author may do this.
    ///
    /// # Errors
    /// `NotFound`, `PermissionDenied` or `Validation`.
    pub fn edit_comment(&self, actor: &str, comment: &CommentId, content: &str) -> Result<Comment> {
        let (edited, previous) = self.store.transaction(|txn| {
            let target = txn.get_comment_mut(comment)?;
            ensure_author(target, actor)?;
            let previous = target.edit(content);
            target.validate()?;
            Ok((target.clone(), previous))
        })?;

        tlog!("{} edited comment {}", actor, comment);
        self.recorder.record(
            ActivityRecord::new(actor, edited.task, ActivityKind::CommentEdited)
                .with_change(Some(previous), Some(edited.content.clone())),
        );
        Ok(edited)
    }

    /// Remove a comment. Only its author may do this.
    pub fn delete_comment(&self, actor: &str, comment: &CommentId) -> Result<Comment> {
        let removed = self.store.transaction(|txn| {
            ensure_author(txn.get_comment(comment)?, actor)?;
            txn.delete_comment(comment)
        })?;

        tlog!("{} deleted comment {}", actor, comment);
        self.recorder.record(
            ActivityRecord::new(actor, removed.task, ActivityKind::CommentDeleted)
                .with_change(Some(removed.content.clone()), None),
        );
        Ok(removed)
    }
}

fn ensure_author(comment: &Comment, actor: &str) -> Result<()> {
    if comment.is_author(actor) {
        Ok(())
    } else {
        Err(Error::PermissionDenied(format!(
            "only {} may change comment {}",
            comment.author, comment.id
        )))
    }
}
