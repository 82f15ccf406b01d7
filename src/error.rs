use thiserror::Error;

use crate::core::TaskId;

#[derive(Error, Debug)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("TOML serialize error: {0}")]
    TomlSerialize(#[from] toml::ser::Error),

    #[error("No home directory")]
    NoHomeDir,

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("{kind} not found: {id}")]
    NotFound { kind: &'static str, id: String },

    #[error("Task {0} cannot depend on itself")]
    SelfDependency(TaskId),

    #[error("Dependency {dependent} -> {dependency} would create a circular dependency")]
    Cycle {
        dependent: TaskId,
        dependency: TaskId,
    },

    #[error("Dependency not found for this task: {dependent} -> {dependency}")]
    EdgeNotFound {
        dependent: TaskId,
        dependency: TaskId,
    },

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Store lock poisoned")]
    LockPoisoned,
}

impl Error {
    pub fn task_not_found(id: &TaskId) -> Self {
        Self::NotFound {
            kind: "Task",
            id: id.to_string(),
        }
    }

    /// True for errors that report a missing task, project, list or edge.
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound { .. } | Self::EdgeNotFound { .. })
    }
}

pub type Result<T> = std::result::Result<T, Error>;
