//! Persistence for projects, task lists, tasks and dependency edges.
//!
//! All access goes through [`TaskStore::read`] or [`TaskStore::transaction`].
//! A transaction holds exclusive access for its whole closure, so a
//! check-then-insert inside one transaction cannot interleave with another
//! writer. If the closure returns an error, every change it made is undone.

mod file;
mod memory;
mod state;

pub use file::FileStore;
pub use memory::MemoryStore;
pub use state::{EdgeRecord, StoreSnapshot, StoreState, SNAPSHOT_VERSION};

use crate::core::{
    Comment, CommentId, Project, ProjectId, Task, TaskId, TaskList, TaskListId, TaskStatus,
};
use crate::Result;

/// Read access to stored entities.
pub trait StoreView {
    /// # Errors
    /// `NotFound` when no task has this id.
    fn get_task(&self, id: &TaskId) -> Result<&Task>;

    fn get_status(&self, id: &TaskId) -> Result<TaskStatus> {
        Ok(self.get_task(id)?.status)
    }

    /// Tasks that `id` directly depends on.
    fn edges_from(&self, id: &TaskId) -> Result<Vec<TaskId>>;

    /// Tasks that directly depend on `id`.
    fn edges_to(&self, id: &TaskId) -> Result<Vec<TaskId>>;

    fn has_edge(&self, dependent: &TaskId, dependency: &TaskId) -> bool;

    fn get_project(&self, id: &ProjectId) -> Result<&Project>;

    fn get_task_list(&self, id: &TaskListId) -> Result<&TaskList>;

    /// All projects, oldest first.
    fn projects(&self) -> Vec<&Project>;

    /// Lists of one project ordered by position.
    fn task_lists(&self, project: &ProjectId) -> Vec<&TaskList>;

    /// Every task, grouped by list and ordered by position inside each list.
    fn tasks(&self) -> Vec<&Task>;

    /// Tasks in all lists of one project.
    fn tasks_in_project(&self, project: &ProjectId) -> Result<Vec<&Task>>;

    /// Task ids ordered so each task follows all of its dependencies.
    fn topological_order(&self) -> Result<Vec<TaskId>>;

    fn get_comment(&self, id: &CommentId) -> Result<&Comment>;

    /// Comments on a task, newest first.
    fn comments(&self, task: &TaskId) -> Result<Vec<&Comment>>;
}

/// Write access inside a transaction.
pub trait StoreTxn: StoreView {
    /// Insert the edge "`dependent` depends on `dependency`".
    ///
    /// Returns `false` if the edge was already present. An edge that would
    /// close a cycle of any length is refused with `Cycle`.
    fn insert_edge(&mut self, dependent: &TaskId, dependency: &TaskId) -> Result<bool>;

    /// Returns whether an edge was removed.
    fn delete_edge(&mut self, dependent: &TaskId, dependency: &TaskId) -> Result<bool>;

    fn insert_project(&mut self, project: Project) -> Result<()>;

    fn get_project_mut(&mut self, id: &ProjectId) -> Result<&mut Project>;

    fn insert_task_list(&mut self, list: TaskList) -> Result<()>;

    fn insert_task(&mut self, task: Task) -> Result<()>;

    fn get_task_mut(&mut self, id: &TaskId) -> Result<&mut Task>;

    /// Delete a task with its comments and every edge referencing it.
    fn delete_task(&mut self, id: &TaskId) -> Result<Task>;

    /// Delete a list with its tasks. Returns the number of tasks removed.
    fn delete_task_list(&mut self, id: &TaskListId) -> Result<usize>;

    /// Delete a project with its lists and tasks. Returns the number of tasks removed.
    fn delete_project(&mut self, id: &ProjectId) -> Result<usize>;

    /// # Errors
    /// `NotFound` when the comment's task does not exist.
    fn insert_comment(&mut self, comment: Comment) -> Result<()>;

    fn get_comment_mut(&mut self, id: &CommentId) -> Result<&mut Comment>;

    fn delete_comment(&mut self, id: &CommentId) -> Result<Comment>;
}

/// A store that scopes reads and writes.
pub trait TaskStore: Send + Sync {
    fn read<R>(&self, f: impl FnOnce(&dyn StoreView) -> Result<R>) -> Result<R>;

    fn transaction<R>(&self, f: impl FnOnce(&mut dyn StoreTxn) -> Result<R>) -> Result<R>;
}
