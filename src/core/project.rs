//! Projects and the task lists inside them.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Longest allowed project or list name, in characters.
pub const MAX_NAME_LEN: usize = 200;

fn validate_name(kind: &str, name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(Error::Validation(format!("{} name must not be empty", kind)));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(Error::Validation(format!(
            "{} name must be at most {} characters",
            kind, MAX_NAME_LEN
        )));
    }
    Ok(())
}

/// Unique identifier for a project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProjectId(pub Uuid);

impl ProjectId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for ProjectId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for ProjectId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for ProjectId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// Unique identifier for a task list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct TaskListId(pub Uuid);

impl TaskListId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for TaskListId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for TaskListId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for TaskListId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A project groups task lists and the users allowed to see them.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Project {
    pub id: ProjectId,
    pub name: String,
    #[serde(default)]
    pub description: String,
    pub owner: String,
    #[serde(default)]
    pub members: Vec<String>,
    pub created_at: DateTime<Utc>,
}

impl Project {
    pub fn new(name: &str, owner: &str) -> Self {
        Self {
            id: ProjectId::new(),
            name: name.to_string(),
            description: String::new(),
            owner: owner.to_string(),
            members: Vec::new(),
            created_at: Utc::now(),
        }
    }

    /// Add a member. Adding the owner or an existing member is a no-op.
    pub fn add_member(&mut self, user: &str) {
        if !self.is_member(user) {
            self.members.push(user.to_string());
        }
    }

    /// Owners count as members.
    pub fn is_member(&self, user: &str) -> bool {
        self.owner == user || self.members.iter().any(|m| m == user)
    }

    pub fn validate(&self) -> Result<()> {
        validate_name("project", &self.name)
    }
}

/// An ordered column of tasks inside a project.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TaskList {
    pub id: TaskListId,
    pub project: ProjectId,
    pub name: String,
    #[serde(default)]
    pub position: i32,
    pub created_at: DateTime<Utc>,
}

impl TaskList {
    pub fn new(project: ProjectId, name: &str) -> Self {
        Self {
            id: TaskListId::new(),
            project,
            name: name.to_string(),
            position: 0,
            created_at: Utc::now(),
        }
    }

    pub fn with_position(mut self, position: i32) -> Self {
        self.position = position;
        self
    }

    pub fn validate(&self) -> Result<()> {
        validate_name("list", &self.name)
    }
}
