//! File store persistence tests.
//!
//! These tests verify that committed changes survive a reopen, that failed
//! transactions leave the file untouched, and that snapshots which would
//! break the graph invariants are refused on load.

use std::sync::Arc;

use taskgraph::core::TaskStatus;
use taskgraph::store::{StoreSnapshot, StoreView, TaskStore, SNAPSHOT_VERSION};
use taskgraph::{DependencyManager, Error, TaskUpdate};

use crate::fixtures::{add_task, seed, TempStore, ACTOR};

#[test]
fn test_dependencies_survive_reopen() {
    let temp = TempStore::new();
    let (a, b, c) = {
        let store = Arc::new(temp.open());
        let (_, list) = seed(store.as_ref());
        let a = add_task(store.as_ref(), list, "design");
        let b = add_task(store.as_ref(), list, "build");
        let c = add_task(store.as_ref(), list, "ship");

        let manager = DependencyManager::new(Arc::clone(&store));
        manager.add_dependency(ACTOR, &b, &a).unwrap();
        manager.add_dependency(ACTOR, &c, &b).unwrap();
        manager.set_status(ACTOR, &a, TaskStatus::Done).unwrap();
        (a, b, c)
    };

    let manager = DependencyManager::new(Arc::new(temp.open()));
    assert!(!manager.is_blocked(&b).unwrap());
    assert!(manager.is_blocked(&c).unwrap());

    // The reloaded graph still refuses cycles.
    let err = manager.add_dependency(ACTOR, &a, &c).unwrap_err();
    assert!(matches!(err, Error::Cycle { .. }));
}

/// Test: Two writers on one file
/// Given two store handles opened on the same path
/// When each handle commits a different edge
/// Then the file keeps both edges and each handle sees the other's commit
#[test]
fn test_separate_handles_keep_each_others_commits() {
    let temp = TempStore::new();
    let first = Arc::new(temp.open());
    let (_, list) = seed(first.as_ref());
    let a = add_task(first.as_ref(), list, "a");
    let b = add_task(first.as_ref(), list, "b");

    // Opened after seeding, before either edge exists.
    let second = Arc::new(temp.open());
    let c = add_task(second.as_ref(), list, "c");

    DependencyManager::new(Arc::clone(&first))
        .add_dependency(ACTOR, &b, &a)
        .unwrap();
    DependencyManager::new(Arc::clone(&second))
        .add_dependency(ACTOR, &b, &c)
        .unwrap();

    let reopened = temp.open();
    let mut edges = reopened.read(|view| view.edges_from(&b)).unwrap();
    edges.sort();
    let mut expected = vec![a, c];
    expected.sort();
    assert_eq!(edges, expected);
    assert!(first.read(|view| Ok(view.has_edge(&b, &c))).unwrap());

    // A cycle through the other handle's edge is still refused.
    let err = DependencyManager::new(first)
        .add_dependency(ACTOR, &c, &b)
        .unwrap_err();
    assert!(matches!(err, Error::Cycle { .. }));
}

/// Test: Failed transaction
/// Given a saved store
/// When a transaction fails halfway
/// Then neither memory nor the file reflect its partial writes
#[test]
fn test_failed_transaction_leaves_file_untouched() {
    let temp = TempStore::new();
    let store = temp.open();
    let (_, list) = seed(&store);
    let a = add_task(&store, list, "a");
    let b = add_task(&store, list, "b");
    let before = std::fs::read_to_string(&temp.path).unwrap();

    let result: taskgraph::Result<()> = store.transaction(|txn| {
        txn.insert_edge(&b, &a)?;
        txn.delete_task(&taskgraph::core::TaskId::new())?;
        Ok(())
    });
    assert!(result.unwrap_err().is_not_found());

    assert!(!store.read(|view| Ok(view.has_edge(&b, &a))).unwrap());
    assert_eq!(std::fs::read_to_string(&temp.path).unwrap(), before);
}

#[test]
fn test_comments_and_edits_survive_reopen() {
    let temp = TempStore::new();
    let (a, note) = {
        let store = Arc::new(temp.open());
        let (_, list) = seed(store.as_ref());
        let a = add_task(store.as_ref(), list, "design");
        let manager = DependencyManager::new(store);
        let note = manager.add_comment(ACTOR, &a, "Use the new palette").unwrap();
        let update = TaskUpdate {
            description: Some("Landing page mockups".to_string()),
            actual_hours: Some(1.5),
            ..TaskUpdate::default()
        };
        manager.update_task(ACTOR, &a, update).unwrap();
        manager.move_task(ACTOR, &a, None, 4).unwrap();
        (a, note.id)
    };

    let store = Arc::new(temp.open());
    let task = store.read(|view| view.get_task(&a).cloned()).unwrap();
    assert_eq!(task.description, "Landing page mockups");
    assert_eq!(task.actual_hours, Some(1.5));
    assert_eq!(task.position, 4);

    let manager = DependencyManager::new(Arc::clone(&store));
    let comments = manager.list_comments(&a).unwrap();
    assert_eq!(comments.len(), 1);
    assert_eq!(comments[0].id, note);

    // Deleting the task takes its comments with it.
    store.transaction(|txn| txn.delete_task(&a)).unwrap();
    let err = temp.open().read(|view| view.get_comment(&note).cloned()).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_cyclic_snapshot_is_refused() {
    let temp = TempStore::new();
    let (a, b) = {
        let store = temp.open();
        let (_, list) = seed(&store);
        let a = add_task(&store, list, "a");
        let b = add_task(&store, list, "b");
        store.transaction(|txn| txn.insert_edge(&b, &a)).unwrap();
        (a, b)
    };

    // Hand-edit the file to close the loop.
    let contents = std::fs::read_to_string(&temp.path).unwrap();
    let mut snapshot: StoreSnapshot = serde_json::from_str(&contents).unwrap();
    snapshot.dependencies.push(taskgraph::store::EdgeRecord {
        task: a,
        depends_on: b,
    });
    std::fs::write(&temp.path, serde_json::to_string(&snapshot).unwrap()).unwrap();

    let err = taskgraph::store::FileStore::open(&temp.path).unwrap_err();
    assert!(matches!(err, Error::Validation(_)));
}

#[test]
fn test_dangling_edge_is_refused() {
    let temp = TempStore::new();
    let a = {
        let store = temp.open();
        let (_, list) = seed(&store);
        add_task(&store, list, "a")
    };

    let contents = std::fs::read_to_string(&temp.path).unwrap();
    let mut snapshot: StoreSnapshot = serde_json::from_str(&contents).unwrap();
    snapshot.dependencies.push(taskgraph::store::EdgeRecord {
        task: a,
        depends_on: taskgraph::core::TaskId::new(),
    });
    std::fs::write(&temp.path, serde_json::to_string(&snapshot).unwrap()).unwrap();

    let err = taskgraph::store::FileStore::open(&temp.path).unwrap_err();
    assert!(err.is_not_found());
}

#[test]
fn test_newer_snapshot_version_is_refused() {
    let temp = TempStore::new();
    let snapshot = StoreSnapshot {
        version: SNAPSHOT_VERSION + 1,
        projects: Vec::new(),
        task_lists: Vec::new(),
        tasks: Vec::new(),
        dependencies: Vec::new(),
        comments: Vec::new(),
    };
    std::fs::write(&temp.path, serde_json::to_string(&snapshot).unwrap()).unwrap();

    let err = taskgraph::store::FileStore::open(&temp.path).unwrap_err();
    assert!(err.to_string().contains("newer"));
}

#[test]
fn test_corrupt_file_is_an_error() {
    let temp = TempStore::new();
    std::fs::write(&temp.path, "{ not json").unwrap();

    let err = taskgraph::store::FileStore::open(&temp.path).unwrap_err();
    assert!(matches!(err, Error::Json(_)));
}
