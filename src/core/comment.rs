//! Comments left on tasks.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::core::task::TaskId;
use crate::error::{Error, Result};

/// Unique identifier for a comment.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CommentId(pub Uuid);

impl CommentId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for CommentId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for CommentId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl std::str::FromStr for CommentId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(Uuid::parse_str(s)?))
    }
}

/// A note on a task. Only its author may change or remove it.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Comment {
    pub id: CommentId,
    pub task: TaskId,
    pub author: String,
    pub content: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Comment {
    pub fn new(task: TaskId, author: &str, content: &str) -> Self {
        let now = Utc::now();
        Self {
            id: CommentId::new(),
            task,
            author: author.to_string(),
            content: content.to_string(),
            created_at: now,
            updated_at: now,
        }
    }

    /// Replace the content and return the previous text.
    pub fn edit(&mut self, content: &str) -> String {
        self.updated_at = Utc::now();
        std::mem::replace(&mut self.content, content.to_string())
    }

    pub fn is_author(&self, user: &str) -> bool {
        self.author == user
    }

    pub fn validate(&self) -> Result<()> {
        if self.content.trim().is_empty() {
            return Err(Error::Validation("comment must not be empty".to_string()));
        }
        Ok(())
    }
}
