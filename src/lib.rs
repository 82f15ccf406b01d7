//! Task dependency tracking for project management.
//!
//! Tasks are organized into projects and task lists and linked by
//! "depends on" edges. [`DependencyManager`] keeps those edges acyclic and
//! reports which tasks are blocked by unfinished dependencies.

pub mod activity;
pub mod config;
pub mod core;
pub mod error;
pub mod filter;
pub mod log;
pub mod manager;
pub mod metrics;
pub mod store;

pub use error::{Error, Result};
pub use manager::{
    AddOutcome, DependencyListing, DependencyManager, DependencyResponse, TaskUpdate,
};
