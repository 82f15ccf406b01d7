use serde::{Deserialize, Serialize};

use super::AddOutcome;
use crate::{Error, Result};

/// Caller-facing result of a dependency mutation.
///
/// Every manager result maps to exactly one variant, so a front end can
/// report success, duplicates, rejections and missing entities without
/// inspecting error types.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", tag = "outcome")]
pub enum DependencyResponse {
    Added { is_blocked: bool },
    AlreadyExists { is_blocked: bool },
    Removed { is_blocked: bool },
    /// Self-dependency, cycle or invalid input.
    Rejected { error: String },
    /// Unknown task or absent edge.
    NotFound { error: String },
    /// Store could not complete the request.
    Failed { error: String },
}

impl DependencyResponse {
    pub fn from_add(result: Result<AddOutcome>) -> Self {
        match result {
            Ok(AddOutcome::Added { is_blocked }) => Self::Added { is_blocked },
            Ok(AddOutcome::AlreadyExists { is_blocked }) => Self::AlreadyExists { is_blocked },
            Err(err) => Self::from_error(err),
        }
    }

    pub fn from_remove(result: Result<bool>) -> Self {
        match result {
            Ok(is_blocked) => Self::Removed { is_blocked },
            Err(err) => Self::from_error(err),
        }
    }

    fn from_error(err: Error) -> Self {
        let error = err.to_string();
        match err {
            Error::SelfDependency(_) | Error::Cycle { .. } | Error::Validation(_) => {
                Self::Rejected { error }
            }
            Error::NotFound { .. } | Error::EdgeNotFound { .. } => Self::NotFound { error },
            _ => Self::Failed { error },
        }
    }

    /// Short human-readable status line.
    pub fn message(&self) -> &str {
        match self {
            Self::Added { .. } => "dependency added",
            Self::AlreadyExists { .. } => "dependency already exists",
            Self::Removed { .. } => "dependency removed",
            Self::Rejected { error } | Self::NotFound { error } | Self::Failed { error } => {
                error.as_str()
            }
        }
    }

    /// Flat JSON body: `{"status": ..., "is_blocked": ...}` on success,
    /// `{"error": ...}` otherwise.
    pub fn to_json(&self) -> serde_json::Value {
        match self {
            Self::Added { is_blocked }
            | Self::AlreadyExists { is_blocked }
            | Self::Removed { is_blocked } => serde_json::json!({
                "status": self.message(),
                "is_blocked": is_blocked,
            }),
            _ => serde_json::json!({ "error": self.message() }),
        }
    }

    /// Whether the graph now holds the requested state.
    pub fn is_success(&self) -> bool {
        matches!(
            self,
            Self::Added { .. } | Self::AlreadyExists { .. } | Self::Removed { .. }
        )
    }
}
