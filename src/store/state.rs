use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use super::{StoreTxn, StoreView};
use crate::core::{
    Comment, CommentId, DependencyGraph, Project, ProjectId, Task, TaskId, TaskList, TaskListId,
};
use crate::{tlog_debug, tlog_trace, Error, Result};

pub const SNAPSHOT_VERSION: u32 = 1;

/// In-memory contents of a store.
#[derive(Debug, Clone, Default)]
pub struct StoreState {
    projects: BTreeMap<ProjectId, Project>,
    task_lists: BTreeMap<TaskListId, TaskList>,
    tasks: BTreeMap<TaskId, Task>,
    comments: BTreeMap<CommentId, Comment>,
    graph: DependencyGraph,
}

/// A stored dependency edge: `task` depends on `depends_on`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct EdgeRecord {
    pub task: TaskId,
    pub depends_on: TaskId,
}

/// Serialized form of [`StoreState`].
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreSnapshot {
    pub version: u32,
    #[serde(default)]
    pub projects: Vec<Project>,
    #[serde(default)]
    pub task_lists: Vec<TaskList>,
    #[serde(default)]
    pub tasks: Vec<Task>,
    #[serde(default)]
    pub dependencies: Vec<EdgeRecord>,
    #[serde(default)]
    pub comments: Vec<Comment>,
}

impl StoreState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn snapshot(&self) -> StoreSnapshot {
        StoreSnapshot {
            version: SNAPSHOT_VERSION,
            projects: self.projects.values().cloned().collect(),
            task_lists: self.task_lists.values().cloned().collect(),
            tasks: self.tasks.values().cloned().collect(),
            dependencies: self
                .graph
                .edges()
                .into_iter()
                .map(|(task, depends_on)| EdgeRecord { task, depends_on })
                .collect(),
            comments: self.comments.values().cloned().collect(),
        }
    }

    /// Rebuild state from a snapshot, checking references and acyclicity.
    pub fn from_snapshot(snapshot: StoreSnapshot) -> Result<Self> {
        if snapshot.version > SNAPSHOT_VERSION {
            return Err(Error::Validation(format!(
                "snapshot version {} is newer than supported version {}",
                snapshot.version, SNAPSHOT_VERSION
            )));
        }

        let mut state = Self::new();
        for project in snapshot.projects {
            state.insert_project(project)?;
        }
        for list in snapshot.task_lists {
            state.insert_task_list(list)?;
        }
        for task in snapshot.tasks {
            state.insert_task(task)?;
        }
        for comment in snapshot.comments {
            state.insert_comment(comment)?;
        }
        state.graph = DependencyGraph::from_edges(
            state.tasks.keys().copied(),
            snapshot
                .dependencies
                .iter()
                .map(|edge| (edge.task, edge.depends_on)),
        )?;
        tlog_debug!(
            "Graph rebuilt: {} tasks, {} dependencies",
            state.graph.task_count(),
            state.graph.dependency_count()
        );
        Ok(state)
    }

    fn project_not_found(id: &ProjectId) -> Error {
        Error::NotFound {
            kind: "Project",
            id: id.to_string(),
        }
    }

    fn list_not_found(id: &TaskListId) -> Error {
        Error::NotFound {
            kind: "Task list",
            id: id.to_string(),
        }
    }

    fn comment_not_found(id: &CommentId) -> Error {
        Error::NotFound {
            kind: "Comment",
            id: id.to_string(),
        }
    }

    fn ensure_task(&self, id: &TaskId) -> Result<()> {
        if self.tasks.contains_key(id) {
            Ok(())
        } else {
            Err(Error::task_not_found(id))
        }
    }

    fn sorted_tasks<'a>(&self, mut tasks: Vec<&'a Task>) -> Vec<&'a Task> {
        tasks.sort_by(|a, b| {
            let list_pos = |t: &Task| self.task_lists.get(&t.task_list).map(|l| l.position);
            (list_pos(a), a.task_list, a.position, a.created_at).cmp(&(
                list_pos(b),
                b.task_list,
                b.position,
                b.created_at,
            ))
        });
        tasks
    }
}

impl StoreView for StoreState {
    fn get_task(&self, id: &TaskId) -> Result<&Task> {
        self.tasks.get(id).ok_or_else(|| Error::task_not_found(id))
    }

    fn edges_from(&self, id: &TaskId) -> Result<Vec<TaskId>> {
        self.ensure_task(id)?;
        Ok(self.graph.dependencies(id))
    }

    fn edges_to(&self, id: &TaskId) -> Result<Vec<TaskId>> {
        self.ensure_task(id)?;
        Ok(self.graph.dependents(id))
    }

    fn has_edge(&self, dependent: &TaskId, dependency: &TaskId) -> bool {
        self.graph.has_dependency(dependent, dependency)
    }

    fn get_project(&self, id: &ProjectId) -> Result<&Project> {
        self.projects
            .get(id)
            .ok_or_else(|| Self::project_not_found(id))
    }

    fn get_task_list(&self, id: &TaskListId) -> Result<&TaskList> {
        self.task_lists
            .get(id)
            .ok_or_else(|| Self::list_not_found(id))
    }

    fn projects(&self) -> Vec<&Project> {
        let mut projects: Vec<&Project> = self.projects.values().collect();
        projects.sort_by_key(|p| p.created_at);
        projects
    }

    fn task_lists(&self, project: &ProjectId) -> Vec<&TaskList> {
        let mut lists: Vec<&TaskList> = self
            .task_lists
            .values()
            .filter(|l| l.project == *project)
            .collect();
        lists.sort_by_key(|l| (l.position, l.created_at));
        lists
    }

    fn tasks(&self) -> Vec<&Task> {
        self.sorted_tasks(self.tasks.values().collect())
    }

    fn tasks_in_project(&self, project: &ProjectId) -> Result<Vec<&Task>> {
        self.get_project(project)?;
        let tasks = self
            .tasks
            .values()
            .filter(|t| {
                self.task_lists
                    .get(&t.task_list)
                    .is_some_and(|l| l.project == *project)
            })
            .collect();
        Ok(self.sorted_tasks(tasks))
    }

    fn topological_order(&self) -> Result<Vec<TaskId>> {
        self.graph.topological_order()
    }

    fn get_comment(&self, id: &CommentId) -> Result<&Comment> {
        self.comments
            .get(id)
            .ok_or_else(|| Self::comment_not_found(id))
    }

    fn comments(&self, task: &TaskId) -> Result<Vec<&Comment>> {
        self.ensure_task(task)?;
        let mut comments: Vec<&Comment> =
            self.comments.values().filter(|c| c.task == *task).collect();
        comments.sort_by(|a, b| b.created_at.cmp(&a.created_at));
        Ok(comments)
    }
}

impl StoreTxn for StoreState {
    fn insert_edge(&mut self, dependent: &TaskId, dependency: &TaskId) -> Result<bool> {
        let inserted = self.graph.add_dependency(dependent, dependency)?;
        tlog_trace!("insert_edge {} -> {}: inserted={}", dependent, dependency, inserted);
        Ok(inserted)
    }

    fn delete_edge(&mut self, dependent: &TaskId, dependency: &TaskId) -> Result<bool> {
        self.ensure_task(dependent)?;
        self.ensure_task(dependency)?;
        Ok(self.graph.remove_dependency(dependent, dependency))
    }

    fn insert_project(&mut self, project: Project) -> Result<()> {
        project.validate()?;
        if self.projects.contains_key(&project.id) {
            return Err(Error::Validation(format!(
                "project {} already exists",
                project.id
            )));
        }
        self.projects.insert(project.id, project);
        Ok(())
    }

    fn get_project_mut(&mut self, id: &ProjectId) -> Result<&mut Project> {
        self.projects
            .get_mut(id)
            .ok_or_else(|| Self::project_not_found(id))
    }

    fn insert_task_list(&mut self, list: TaskList) -> Result<()> {
        self.get_project(&list.project)?;
        list.validate()?;
        if self.task_lists.contains_key(&list.id) {
            return Err(Error::Validation(format!("task list {} already exists", list.id)));
        }
        self.task_lists.insert(list.id, list);
        Ok(())
    }

    fn insert_task(&mut self, task: Task) -> Result<()> {
        self.get_task_list(&task.task_list)?;
        task.validate()?;
        if self.tasks.contains_key(&task.id) {
            return Err(Error::Validation(format!("task {} already exists", task.id)));
        }
        self.graph.add_task(task.id);
        self.tasks.insert(task.id, task);
        Ok(())
    }

    fn get_task_mut(&mut self, id: &TaskId) -> Result<&mut Task> {
        self.tasks.get_mut(id).ok_or_else(|| Error::task_not_found(id))
    }

    fn delete_task(&mut self, id: &TaskId) -> Result<Task> {
        let task = self.tasks.remove(id).ok_or_else(|| Error::task_not_found(id))?;
        if let Some(edges) = self.graph.remove_task(id) {
            tlog_debug!("Deleted task {} with {} dependency edges", id, edges);
        }
        self.comments.retain(|_, c| c.task != *id);
        Ok(task)
    }

    fn delete_task_list(&mut self, id: &TaskListId) -> Result<usize> {
        self.task_lists
            .remove(id)
            .ok_or_else(|| Self::list_not_found(id))?;
        let doomed: Vec<TaskId> = self
            .tasks
            .values()
            .filter(|t| t.task_list == *id)
            .map(|t| t.id)
            .collect();
        for task in &doomed {
            self.delete_task(task)?;
        }
        Ok(doomed.len())
    }

    fn delete_project(&mut self, id: &ProjectId) -> Result<usize> {
        self.projects
            .remove(id)
            .ok_or_else(|| Self::project_not_found(id))?;
        let lists: Vec<TaskListId> = self
            .task_lists
            .values()
            .filter(|l| l.project == *id)
            .map(|l| l.id)
            .collect();
        let mut removed = 0;
        for list in &lists {
            removed += self.delete_task_list(list)?;
        }
        Ok(removed)
    }

    fn insert_comment(&mut self, comment: Comment) -> Result<()> {
        self.ensure_task(&comment.task)?;
        comment.validate()?;
        if self.comments.contains_key(&comment.id) {
            return Err(Error::Validation(format!("comment {} already exists", comment.id)));
        }
        self.comments.insert(comment.id, comment);
        Ok(())
    }

    fn get_comment_mut(&mut self, id: &CommentId) -> Result<&mut Comment> {
        self.comments
            .get_mut(id)
            .ok_or_else(|| Self::comment_not_found(id))
    }

    fn delete_comment(&mut self, id: &CommentId) -> Result<Comment> {
        self.comments
            .remove(id)
            .ok_or_else(|| Self::comment_not_found(id))
    }
}
