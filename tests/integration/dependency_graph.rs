//! Dependency graph behaviour through the manager.
//!
//! These tests verify edge insertion and removal, cycle rejection at any
//! chain length, and the blocking queries derived from task status.

use taskgraph::core::TaskStatus;
use taskgraph::store::{StoreView, TaskStore};
use taskgraph::{AddOutcome, DependencyResponse, Error};

use crate::fixtures::{Board, ACTOR};

/// Test: Three-task cycle
/// Given T2 depends on T1 and T3 depends on T2
/// When T1 is made to depend on T3
/// Then the edge is rejected and the graph is unchanged
#[test]
fn test_three_task_cycle_rejected() {
    let board = Board::new();
    let t1 = board.task("T1");
    let t2 = board.task("T2");
    let t3 = board.task("T3");

    board.manager.add_dependency(ACTOR, &t2, &t1).unwrap();
    board.manager.add_dependency(ACTOR, &t3, &t2).unwrap();

    let err = board.manager.add_dependency(ACTOR, &t1, &t3).unwrap_err();
    assert!(matches!(err, Error::Cycle { .. }));
    assert!(err.to_string().contains("circular dependency"));

    let edges = board.store.read(|view| view.edges_from(&t1)).unwrap();
    assert!(edges.is_empty(), "T1 must not gain an edge");
}

#[test]
fn test_long_chain_cycle_rejected() {
    let board = Board::new();
    let chain = board.chain(8);

    let err = board
        .manager
        .add_dependency(ACTOR, &chain[0], &chain[7])
        .unwrap_err();
    assert!(matches!(err, Error::Cycle { .. }));

    // Topological order still exists, so the graph stayed acyclic.
    let order = board.manager.execution_order(&board.project).unwrap();
    let ids: Vec<_> = order.iter().map(|t| t.id).collect();
    assert_eq!(ids, chain);
}

#[test]
fn test_two_task_cycle_rejected() {
    let board = Board::new();
    let a = board.task("A");
    let b = board.task("B");

    board.manager.add_dependency(ACTOR, &b, &a).unwrap();
    let response = DependencyResponse::from_add(board.manager.add_dependency(ACTOR, &a, &b));
    assert!(matches!(response, DependencyResponse::Rejected { .. }));
    assert!(!response.is_success());
}

#[test]
fn test_self_dependency_rejected() {
    let board = Board::new();
    let a = board.task("A");

    let err = board.manager.add_dependency(ACTOR, &a, &a).unwrap_err();
    assert!(matches!(err, Error::SelfDependency(id) if id == a));
}

#[test]
fn test_diamond_is_not_a_cycle() {
    let board = Board::new();
    let d = board.diamond();

    let listing = board.manager.list_dependencies(&d.top).unwrap();
    assert_eq!(listing.dependencies.len(), 2);
    assert!(listing.is_blocked);

    let dependents = board.manager.list_dependents(&d.base).unwrap();
    let ids: Vec<_> = dependents.iter().map(|t| t.id).collect();
    assert!(ids.contains(&d.left));
    assert!(ids.contains(&d.right));
}

/// Test: Duplicate edge
/// Given an existing edge
/// When the same edge is added again
/// Then the outcome is AlreadyExists and exactly one edge is stored
#[test]
fn test_duplicate_edge_is_idempotent() {
    let board = Board::new();
    let a = board.task("A");
    let b = board.task("B");

    let first = board.manager.add_dependency(ACTOR, &b, &a).unwrap();
    let second = board.manager.add_dependency(ACTOR, &b, &a).unwrap();
    assert_eq!(first, AddOutcome::Added { is_blocked: true });
    assert_eq!(second, AddOutcome::AlreadyExists { is_blocked: true });

    let edges = board.store.read(|view| view.edges_from(&b)).unwrap();
    assert_eq!(edges, vec![a]);
}

#[test]
fn test_blocking_follows_dependency_status() {
    let board = Board::new();
    let d = board.diamond();

    assert!(!board.manager.is_blocked(&d.base).unwrap());
    assert!(board.manager.is_blocked(&d.left).unwrap());

    board.manager.set_status(ACTOR, &d.base, TaskStatus::Done).unwrap();
    assert!(board.manager.can_start(&d.left).unwrap());
    assert!(board.manager.can_start(&d.right).unwrap());
    assert!(board.manager.is_blocked(&d.top).unwrap());

    board.manager.set_status(ACTOR, &d.left, TaskStatus::Done).unwrap();
    let blocking = board.manager.blocking_tasks(&d.top).unwrap();
    assert_eq!(blocking.len(), 1);
    assert_eq!(blocking[0].id, d.right);

    // Review is not done: still blocking.
    board.manager.set_status(ACTOR, &d.right, TaskStatus::Review).unwrap();
    assert!(board.manager.is_blocked(&d.top).unwrap());

    board.manager.set_status(ACTOR, &d.right, TaskStatus::Done).unwrap();
    assert!(!board.manager.is_blocked(&d.top).unwrap());
}

#[test]
fn test_blocking_is_not_transitive() {
    let board = Board::new();
    let chain = board.chain(3);

    board.manager.set_status(ACTOR, &chain[1], TaskStatus::Done).unwrap();
    // chain[0] is still open, but chain[2] only looks at chain[1].
    assert!(!board.manager.is_blocked(&chain[2]).unwrap());
}

#[test]
fn test_remove_dependency_unblocks() {
    let board = Board::new();
    let a = board.task("A");
    let b = board.task("B");
    board.manager.add_dependency(ACTOR, &b, &a).unwrap();

    let is_blocked = board.manager.remove_dependency(ACTOR, &b, &a).unwrap();
    assert!(!is_blocked);

    let err = board.manager.remove_dependency(ACTOR, &b, &a).unwrap_err();
    assert!(matches!(err, Error::EdgeNotFound { .. }));

    // The reverse edge is now allowed.
    let outcome = board.manager.add_dependency(ACTOR, &a, &b).unwrap();
    assert!(matches!(outcome, AddOutcome::Added { .. }));
}

#[test]
fn test_unknown_task_is_not_found() {
    let board = Board::new();
    let a = board.task("A");
    let ghost = taskgraph::core::TaskId::new();

    let err = board.manager.add_dependency(ACTOR, &a, &ghost).unwrap_err();
    assert!(err.is_not_found());
    let err = board.manager.is_blocked(&ghost).unwrap_err();
    assert!(err.is_not_found());

    let response =
        DependencyResponse::from_remove(board.manager.remove_dependency(ACTOR, &ghost, &a));
    assert!(matches!(response, DependencyResponse::NotFound { .. }));
}

#[test]
fn test_deleting_task_drops_its_edges() {
    let board = Board::new();
    let d = board.diamond();

    let removed = board
        .store
        .transaction(|txn| txn.delete_task(&d.left))
        .unwrap();
    assert_eq!(removed.title, "left");

    let listing = board.manager.list_dependencies(&d.top).unwrap();
    let ids: Vec<_> = listing.dependencies.iter().map(|t| t.id).collect();
    assert_eq!(ids, vec![d.right]);
    let dependents = board.store.read(|view| view.edges_to(&d.base)).unwrap();
    assert_eq!(dependents, vec![d.right]);
}

#[test]
fn test_deleting_project_cascades() {
    let board = Board::new();
    board.diamond();

    let removed = board
        .store
        .transaction(|txn| txn.delete_project(&board.project))
        .unwrap();
    assert_eq!(removed, 4);

    let (tasks, lists) = board
        .store
        .read(|view| Ok((view.tasks().len(), view.task_lists(&board.project).len())))
        .unwrap();
    assert_eq!(tasks, 0);
    assert_eq!(lists, 0);
}

#[test]
fn test_ready_tasks_and_execution_order() {
    let board = Board::new();
    let d = board.diamond();

    let ready: Vec<_> = board
        .manager
        .ready_tasks(&board.project)
        .unwrap()
        .iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(ready, vec![d.base]);

    board.manager.set_status(ACTOR, &d.base, TaskStatus::Done).unwrap();
    let ready: Vec<_> = board
        .manager
        .ready_tasks(&board.project)
        .unwrap()
        .iter()
        .map(|t| t.id)
        .collect();
    assert_eq!(ready.len(), 2);
    assert!(ready.contains(&d.left) && ready.contains(&d.right));

    let order: Vec<_> = board
        .manager
        .execution_order(&board.project)
        .unwrap()
        .iter()
        .map(|t| t.id)
        .collect();
    let pos = |id| order.iter().position(|x| *x == id).unwrap();
    assert!(pos(d.base) < pos(d.left));
    assert!(pos(d.base) < pos(d.right));
    assert!(pos(d.left) < pos(d.top));
    assert!(pos(d.right) < pos(d.top));
}

#[test]
fn test_status_change_allowed_while_blocked() {
    let board = Board::new();
    let a = board.task("A");
    let b = board.task("B");
    board.manager.add_dependency(ACTOR, &b, &a).unwrap();

    let previous = board
        .manager
        .set_status(ACTOR, &b, TaskStatus::InProgress)
        .unwrap();
    assert_eq!(previous, TaskStatus::Todo);
    assert!(board.manager.is_blocked(&b).unwrap());
}
