use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::{tlog_debug, Error, Result};

/// User configuration, read from `~/.taskgraph/taskgraph.toml`.
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Config {
    /// JSON snapshot holding projects, lists, tasks and edges.
    pub store_path: Option<String>,
    /// JSON-lines file receiving activity records.
    pub activity_log: Option<String>,
    /// Name recorded as the actor of CLI mutations.
    pub actor: Option<String>,
}

impl Config {
    pub fn data_dir() -> Result<PathBuf> {
        Ok(dirs::home_dir().ok_or(Error::NoHomeDir)?.join(".taskgraph"))
    }

    pub fn config_path() -> Result<PathBuf> {
        Ok(Self::data_dir()?.join("taskgraph.toml"))
    }

    pub fn store_path(&self) -> Result<PathBuf> {
        match &self.store_path {
            Some(path) => Ok(expand_tilde(path)),
            None => Ok(Self::data_dir()?.join("tasks.json")),
        }
    }

    pub fn activity_log_path(&self) -> Result<PathBuf> {
        match &self.activity_log {
            Some(path) => Ok(expand_tilde(path)),
            None => Ok(Self::data_dir()?.join("activity.jsonl")),
        }
    }

    /// Configured actor, else `$USER`, else "anonymous".
    pub fn effective_actor(&self) -> String {
        self.actor
            .clone()
            .or_else(|| std::env::var("USER").ok())
            .filter(|name| !name.is_empty())
            .unwrap_or_else(|| "anonymous".to_string())
    }

    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path()?)
    }

    /// Load from `path`, falling back to defaults when the file is absent.
    pub fn load_from(path: &Path) -> Result<Self> {
        tlog_debug!("Config::load path={}", path.display());
        if !path.exists() {
            tlog_debug!("Config file not found, using defaults");
            return Ok(Self::default());
        }
        let config: Self = toml::from_str(&fs::read_to_string(path)?)?;
        tlog_debug!(
            "Config loaded: store_path={:?}, activity_log={:?}, actor={:?}",
            config.store_path,
            config.activity_log,
            config.actor
        );
        Ok(config)
    }
}

fn expand_tilde(path: &str) -> PathBuf {
    if let Some(rest) = path.strip_prefix("~/") {
        if let Some(home) = dirs::home_dir() {
            return home.join(rest);
        }
    }
    PathBuf::from(path)
}
