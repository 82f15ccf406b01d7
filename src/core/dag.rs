//! Dependency graph over task ids.
//!
//! Edges point from a dependency to the task that depends on it, so an
//! edge `B -> A` reads "B must be DONE before A can start". The graph is
//! kept acyclic: every insertion is checked with a reachability search
//! before it is committed.

use crate::core::task::TaskId;
use crate::error::{Error, Result};
use petgraph::algo::{has_path_connecting, is_cyclic_directed, toposort};
use petgraph::stable_graph::{NodeIndex, StableDiGraph};
use petgraph::Direction;
use std::collections::HashMap;

/// Directed acyclic graph of task dependencies.
///
/// Uses petgraph's `StableDiGraph` so that removing a task leaves the
/// indices of every other task valid.
#[derive(Clone)]
pub struct DependencyGraph {
    graph: StableDiGraph<TaskId, ()>,
    /// Index mapping from TaskId to NodeIndex for fast lookups.
    task_index: HashMap<TaskId, NodeIndex>,
}

impl DependencyGraph {
    pub fn new() -> Self {
        Self {
            graph: StableDiGraph::new(),
            task_index: HashMap::new(),
        }
    }

    /// Rebuild a graph from stored edges, given as `(dependent, dependency)` pairs.
    ///
    /// # Errors
    /// Returns an error if an edge names a task not in `tasks`, is a
    /// self-loop, or if the edges contain a cycle.
    pub fn from_edges(
        tasks: impl IntoIterator<Item = TaskId>,
        edges: impl IntoIterator<Item = (TaskId, TaskId)>,
    ) -> Result<Self> {
        let mut dag = Self::new();
        for id in tasks {
            dag.add_task(id);
        }
        for (dependent, dependency) in edges {
            let dependent_idx = dag.index(&dependent)?;
            let dependency_idx = dag.index(&dependency)?;
            if dependent == dependency {
                return Err(Error::SelfDependency(dependent));
            }
            if dag.graph.find_edge(dependency_idx, dependent_idx).is_none() {
                dag.graph.add_edge(dependency_idx, dependent_idx, ());
            }
        }
        if is_cyclic_directed(&dag.graph) {
            return Err(Error::Validation(
                "stored dependency edges contain a cycle".to_string(),
            ));
        }
        Ok(dag)
    }

    /// Add a task node. Adding an existing task returns its current index.
    pub fn add_task(&mut self, id: TaskId) -> NodeIndex {
        if let Some(&index) = self.task_index.get(&id) {
            return index;
        }
        let index = self.graph.add_node(id);
        self.task_index.insert(id, index);
        index
    }

    /// Remove a task and every edge that references it.
    ///
    /// Returns the number of edges removed with it, or `None` if the task
    /// was not in the graph.
    pub fn remove_task(&mut self, id: &TaskId) -> Option<usize> {
        let index = self.task_index.remove(id)?;
        let edges = self.graph.edges_directed(index, Direction::Incoming).count()
            + self.graph.edges_directed(index, Direction::Outgoing).count();
        self.graph.remove_node(index);
        Some(edges)
    }

    /// Insert the edge "`dependent` depends on `dependency`".
    ///
    /// Returns `false` without touching the graph if the edge already exists.
    ///
    /// # Errors
    /// - `NotFound` if either task is not in the graph
    /// - `SelfDependency` if both ids are equal
    /// - `Cycle` if `dependency` already depends on `dependent`, directly
    ///   or through any chain of edges
    pub fn add_dependency(&mut self, dependent: &TaskId, dependency: &TaskId) -> Result<bool> {
        let dependent_idx = self.index(dependent)?;
        let dependency_idx = self.index(dependency)?;

        if dependent == dependency {
            return Err(Error::SelfDependency(*dependent));
        }
        if self.graph.find_edge(dependency_idx, dependent_idx).is_some() {
            return Ok(false);
        }
        if has_path_connecting(&self.graph, dependent_idx, dependency_idx, None) {
            return Err(Error::Cycle {
                dependent: *dependent,
                dependency: *dependency,
            });
        }

        self.graph.add_edge(dependency_idx, dependent_idx, ());
        Ok(true)
    }

    /// Remove the edge "`dependent` depends on `dependency`".
    ///
    /// Returns whether an edge was removed.
    pub fn remove_dependency(&mut self, dependent: &TaskId, dependency: &TaskId) -> bool {
        let (Some(&dependent_idx), Some(&dependency_idx)) =
            (self.task_index.get(dependent), self.task_index.get(dependency))
        else {
            return false;
        };
        match self.graph.find_edge(dependency_idx, dependent_idx) {
            Some(edge) => self.graph.remove_edge(edge).is_some(),
            None => false,
        }
    }

    /// Check if `dependent` directly depends on `dependency`.
    pub fn has_dependency(&self, dependent: &TaskId, dependency: &TaskId) -> bool {
        if let (Some(&dependent_idx), Some(&dependency_idx)) =
            (self.task_index.get(dependent), self.task_index.get(dependency))
        {
            self.graph.find_edge(dependency_idx, dependent_idx).is_some()
        } else {
            false
        }
    }

    /// Tasks that the given task directly depends on.
    pub fn dependencies(&self, id: &TaskId) -> Vec<TaskId> {
        self.neighbors(id, Direction::Incoming)
    }

    /// Tasks that directly depend on the given task.
    pub fn dependents(&self, id: &TaskId) -> Vec<TaskId> {
        self.neighbors(id, Direction::Outgoing)
    }

    /// All edges as `(dependent, dependency)` pairs.
    pub fn edges(&self) -> Vec<(TaskId, TaskId)> {
        self.graph
            .edge_indices()
            .filter_map(|edge| {
                let (from, to) = self.graph.edge_endpoints(edge)?;
                Some((self.graph[to], self.graph[from]))
            })
            .collect()
    }

    /// Task ids ordered so that every task comes after all of its dependencies.
    ///
    /// # Errors
    /// Returns an error if the graph contains a cycle (should never happen
    /// since insertion validates against cycles).
    pub fn topological_order(&self) -> Result<Vec<TaskId>> {
        let sorted = toposort(&self.graph, None).map_err(|cycle| {
            let id = self
                .graph
                .node_weight(cycle.node_id())
                .map(|id| id.to_string())
                .unwrap_or_else(|| "unknown".to_string());
            Error::Validation(format!("Cycle detected at task: {}", id))
        })?;

        Ok(sorted
            .into_iter()
            .filter_map(|index| self.graph.node_weight(index).copied())
            .collect())
    }

    pub fn task_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn dependency_count(&self) -> usize {
        self.graph.edge_count()
    }

    fn index(&self, id: &TaskId) -> Result<NodeIndex> {
        self.task_index
            .get(id)
            .copied()
            .ok_or_else(|| Error::task_not_found(id))
    }

    fn neighbors(&self, id: &TaskId, direction: Direction) -> Vec<TaskId> {
        match self.task_index.get(id) {
            Some(&index) => self
                .graph
                .neighbors_directed(index, direction)
                .filter_map(|neighbor| self.graph.node_weight(neighbor).copied())
                .collect(),
            None => Vec::new(),
        }
    }
}

impl Default for DependencyGraph {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for DependencyGraph {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("DependencyGraph")
            .field("tasks", &self.task_count())
            .field("dependencies", &self.dependency_count())
            .finish()
    }
}
