//! Integration test suite for taskgraph.
//!
//! These tests drive the dependency manager through the public API against
//! both store backends, and check that the graph invariants hold across
//! persistence, concurrent writers and activity recording.
//!
//! # Test Categories
//!
//! - `dependency_graph`: Edge insertion, cycle rejection and blocking queries
//! - `persistence`: File store snapshots, reloads and corrupt input
//! - `concurrency`: Conflicting writers on a shared store
//! - `activity_log`: Audit records for committed and failed mutations


mod activity_log;
mod concurrency;
mod dependency_graph;
mod persistence;
