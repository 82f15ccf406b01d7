//! Dependency graph manager.
//!
//! Owns the task-to-task "depends on" edges: validates every insertion
//! against the acyclicity invariant, removes edges, and answers blocking
//! queries. Each mutation runs in one store transaction, so the checks and
//! the write cannot interleave with another writer. Successful mutations are
//! reported to the activity recorder after the transaction commits.

mod edit;
mod response;

pub use edit::TaskUpdate;
pub use response::DependencyResponse;

use std::collections::HashSet;
use std::sync::Arc;

use serde::{Deserialize, Serialize};

use crate::activity::{ActivityKind, ActivityRecord, ActivityRecorder, NullRecorder};
use crate::core::{ProjectId, Task, TaskId, TaskStatus};
use crate::store::{StoreView, TaskStore};
use crate::{tlog, tlog_debug, Error, Result};

/// Result of a successful `add_dependency` call.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum AddOutcome {
    /// The edge was inserted.
    Added { is_blocked: bool },
    /// The edge was already present; nothing changed.
    AlreadyExists { is_blocked: bool },
}

impl AddOutcome {
    pub fn is_blocked(&self) -> bool {
        match self {
            AddOutcome::Added { is_blocked } | AddOutcome::AlreadyExists { is_blocked } => {
                *is_blocked
            }
        }
    }
}

/// Direct dependencies of a task with its current blocked flag.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DependencyListing {
    pub task: TaskId,
    pub is_blocked: bool,
    pub dependencies: Vec<Task>,
}

/// Coordinates dependency edges between tasks held in a [`TaskStore`].
pub struct DependencyManager<S> {
    store: Arc<S>,
    recorder: Arc<dyn ActivityRecorder>,
}

impl<S: TaskStore> DependencyManager<S> {
    /// Manager that records nothing.
    pub fn new(store: Arc<S>) -> Self {
        Self::with_recorder(store, Arc::new(NullRecorder))
    }

    pub fn with_recorder(store: Arc<S>, recorder: Arc<dyn ActivityRecorder>) -> Self {
        Self { store, recorder }
    }

    pub fn store(&self) -> &S {
        &self.store
    }

    /// Make `dependent` depend on `dependency`.
    ///
    /// Checks, in order: both tasks exist, the ids differ, the edge is new,
    /// and `dependency` does not already depend on `dependent` through any
    /// chain of edges. A duplicate edge is reported as
    /// [`AddOutcome::AlreadyExists`], not an error.
    ///
    /// # Errors
    /// `NotFound`, `SelfDependency` or `Cycle`; the graph is unchanged.
    pub fn add_dependency(
        &self,
        actor: &str,
        dependent: &TaskId,
        dependency: &TaskId,
    ) -> Result<AddOutcome> {
        let (outcome, dependency_title) = self.store.transaction(|txn| {
            txn.get_task(dependent)?;
            let dependency_title = txn.get_task(dependency)?.title.clone();

            if dependent == dependency {
                return Err(Error::SelfDependency(*dependent));
            }
            // Refuses edges that would close a cycle of any length.
            let inserted = txn.insert_edge(dependent, dependency)?;
            let is_blocked = is_blocked_in(&*txn, dependent)?;
            let outcome = if inserted {
                AddOutcome::Added { is_blocked }
            } else {
                AddOutcome::AlreadyExists { is_blocked }
            };
            Ok((outcome, dependency_title))
        })?;

        if let AddOutcome::Added { .. } = outcome {
            tlog!("{} added dependency {} -> {}", actor, dependent, dependency);
            self.recorder.record(
                ActivityRecord::new(actor, *dependent, ActivityKind::DependencyAdded)
                    .with_change(None, Some(describe(dependency, &dependency_title))),
            );
        } else {
            tlog_debug!("Dependency {} -> {} already exists", dependent, dependency);
        }
        Ok(outcome)
    }

    /// Remove the edge "`dependent` depends on `dependency`".
    ///
    /// Returns the updated blocked flag of `dependent`.
    ///
    /// # Errors
    /// `NotFound` for an unknown task, `EdgeNotFound` if the edge is absent.
    pub fn remove_dependency(
        &self,
        actor: &str,
        dependent: &TaskId,
        dependency: &TaskId,
    ) -> Result<bool> {
        let (is_blocked, dependency_title) = self.store.transaction(|txn| {
            txn.get_task(dependent)?;
            let dependency_title = txn.get_task(dependency)?.title.clone();

            if !txn.delete_edge(dependent, dependency)? {
                return Err(Error::EdgeNotFound {
                    dependent: *dependent,
                    dependency: *dependency,
                });
            }
            Ok((is_blocked_in(&*txn, dependent)?, dependency_title))
        })?;

        tlog!("{} removed dependency {} -> {}", actor, dependent, dependency);
        self.recorder.record(
            ActivityRecord::new(actor, *dependent, ActivityKind::DependencyRemoved)
                .with_change(Some(describe(dependency, &dependency_title)), None),
        );
        Ok(is_blocked)
    }

    /// Direct dependencies of `task`, ordered by position, with its blocked flag.
    pub fn list_dependencies(&self, task: &TaskId) -> Result<DependencyListing> {
        self.store.read(|view| {
            let dependencies = collect_tasks(view, view.edges_from(task)?)?;
            let is_blocked = dependencies.iter().any(|t| !t.is_done());
            Ok(DependencyListing {
                task: *task,
                is_blocked,
                dependencies,
            })
        })
    }

    /// Tasks that directly depend on `task`, ordered by position.
    pub fn list_dependents(&self, task: &TaskId) -> Result<Vec<Task>> {
        self.store.read(|view| collect_tasks(view, view.edges_to(task)?))
    }

    /// True iff at least one direct dependency is not DONE.
    pub fn is_blocked(&self, task: &TaskId) -> Result<bool> {
        self.store.read(|view| is_blocked_in(view, task))
    }

    /// Direct dependencies whose status is not DONE.
    pub fn blocking_tasks(&self, task: &TaskId) -> Result<Vec<Task>> {
        self.store.read(|view| {
            let mut blocking = collect_tasks(view, view.edges_from(task)?)?;
            blocking.retain(|t| !t.is_done());
            Ok(blocking)
        })
    }

    pub fn can_start(&self, task: &TaskId) -> Result<bool> {
        Ok(!self.is_blocked(task)?)
    }

    /// Change a task's status. Returns the previous status.
    ///
    /// Any status may follow any other, and a blocked task may still move;
    /// blocking is reported, not enforced.
    pub fn set_status(
        &self,
        actor: &str,
        task: &TaskId,
        status: TaskStatus,
    ) -> Result<TaskStatus> {
        let previous = self
            .store
            .transaction(|txn| Ok(txn.get_task_mut(task)?.set_status(status)))?;

        if previous != status {
            tlog!(
                "{} changed status of {}: {} -> {}",
                actor,
                task,
                previous.code(),
                status.code()
            );
            self.recorder.record(
                ActivityRecord::new(actor, *task, ActivityKind::StatusChanged).with_change(
                    Some(previous.code().to_string()),
                    Some(status.code().to_string()),
                ),
            );
        }
        Ok(previous)
    }

    /// Change a task's assignee. Returns the previous assignee.
    pub fn assign(
        &self,
        actor: &str,
        task: &TaskId,
        assignee: Option<&str>,
    ) -> Result<Option<String>> {
        let next = assignee.map(str::to_string);
        let previous = self
            .store
            .transaction(|txn| Ok(txn.get_task_mut(task)?.assign(next.clone())))?;

        if previous != next {
            tlog!("{} reassigned {}: {:?} -> {:?}", actor, task, previous, next);
            self.recorder.record(
                ActivityRecord::new(actor, *task, ActivityKind::AssigneeChanged)
                    .with_change(previous.clone(), next),
            );
        }
        Ok(previous)
    }

    /// Open tasks of a project whose dependencies are all DONE.
    pub fn ready_tasks(&self, project: &ProjectId) -> Result<Vec<Task>> {
        self.store.read(|view| {
            let mut ready = Vec::new();
            for task in view.tasks_in_project(project)? {
                if !task.is_done() && !is_blocked_in(view, &task.id)? {
                    ready.push(task.clone());
                }
            }
            Ok(ready)
        })
    }

    /// Tasks of a project ordered so that each follows all of its dependencies.
    pub fn execution_order(&self, project: &ProjectId) -> Result<Vec<Task>> {
        self.store.read(|view| {
            let in_project: HashSet<TaskId> = view
                .tasks_in_project(project)?
                .iter()
                .map(|t| t.id)
                .collect();
            view.topological_order()?
                .into_iter()
                .filter(|id| in_project.contains(id))
                .map(|id| view.get_task(&id).cloned())
                .collect()
        })
    }
}

pub(crate) fn is_blocked_in<V: StoreView + ?Sized>(view: &V, task: &TaskId) -> Result<bool> {
    for dependency in view.edges_from(task)? {
        if !view.get_status(&dependency)?.is_done() {
            return Ok(true);
        }
    }
    Ok(false)
}

fn collect_tasks<V: StoreView + ?Sized>(view: &V, ids: Vec<TaskId>) -> Result<Vec<Task>> {
    let mut tasks = ids
        .iter()
        .map(|id| view.get_task(id).cloned())
        .collect::<Result<Vec<Task>>>()?;
    tasks.sort_by(|a, b| (a.position, a.created_at).cmp(&(b.position, b.created_at)));
    Ok(tasks)
}

fn describe(id: &TaskId, title: &str) -> String {
    format!("{} ({})", title, id.short())
}
