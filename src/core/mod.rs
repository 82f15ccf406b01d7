//! Core domain models.
//!
//! Projects, task lists, tasks, comments, and the dependency graph that
//! links tasks.

pub mod comment;
pub mod dag;
pub mod project;
pub mod task;

pub use comment::{Comment, CommentId};
pub use dag::DependencyGraph;
pub use project::{Project, ProjectId, TaskList, TaskListId};
pub use task::{Priority, Task, TaskId, TaskStatus};
