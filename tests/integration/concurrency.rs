//! Concurrent writer tests.
//!
//! These tests verify that the check-then-insert inside `add_dependency`
//! is serialized, so racing writers can never jointly create a cycle. This
//! holds for threads sharing one store and for separate file handles.

use std::sync::{Arc, Barrier};
use std::thread;

use taskgraph::core::TaskId;
use taskgraph::store::{StoreView, TaskStore};
use taskgraph::{AddOutcome, DependencyManager, Error};

use crate::fixtures::{add_task, seed, Board, TempStore, ACTOR};

/// Test: Racing reverse edges
/// Given two tasks and two threads
/// When one adds A -> B while the other adds B -> A
/// Then exactly one succeeds and the other is rejected as a cycle
#[test]
fn test_reverse_edges_race() {
    for _ in 0..20 {
        let board = Board::new();
        let a = board.task("A");
        let b = board.task("B");
        let manager = Arc::new(board.manager);
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = [(a, b), (b, a)]
            .into_iter()
            .map(|(dependent, dependency)| {
                let manager = Arc::clone(&manager);
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    manager.add_dependency(ACTOR, &dependent, &dependency)
                })
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("writer thread panicked"))
            .collect();

        let added = results
            .iter()
            .filter(|r| matches!(r, Ok(AddOutcome::Added { .. })))
            .count();
        let cycles = results
            .iter()
            .filter(|r| matches!(r, Err(Error::Cycle { .. })))
            .count();
        assert_eq!(added, 1);
        assert_eq!(cycles, 1);

        let both = board
            .store
            .read(|view| Ok(view.has_edge(&a, &b) && view.has_edge(&b, &a)))
            .unwrap();
        assert!(!both);
    }
}

#[test]
fn test_ring_of_writers_stays_acyclic() {
    const TASKS: usize = 6;

    let board = Board::new();
    let ids: Vec<TaskId> = (0..TASKS).map(|i| board.task(&format!("T{}", i))).collect();
    let manager = Arc::new(board.manager);
    let barrier = Arc::new(Barrier::new(TASKS));

    // Each writer links T(i+1) -> T(i); together they would form a ring.
    let handles: Vec<_> = (0..TASKS)
        .map(|i| {
            let manager = Arc::clone(&manager);
            let barrier = Arc::clone(&barrier);
            let dependent = ids[(i + 1) % TASKS];
            let dependency = ids[i];
            thread::spawn(move || {
                barrier.wait();
                manager.add_dependency(ACTOR, &dependent, &dependency)
            })
        })
        .collect();

    let rejected = handles
        .into_iter()
        .map(|h| h.join().expect("writer thread panicked"))
        .filter(|r| matches!(r, Err(Error::Cycle { .. })))
        .count();
    assert_eq!(rejected, 1, "exactly the ring-closing edge is refused");

    let order = board.store.read(|view| view.topological_order()).unwrap();
    assert_eq!(order.len(), TASKS);
}

#[test]
fn test_readers_see_committed_state_only() {
    let board = Board::new();
    let store = Arc::clone(&board.store);
    let a = board.task("A");
    let tasks: Vec<TaskId> = (0..10)
        .map(|i| add_task(store.as_ref(), board.list, &format!("B{}", i)))
        .collect();
    let manager = Arc::new(DependencyManager::new(Arc::clone(&store)));

    let writer = {
        let manager = Arc::clone(&manager);
        let tasks = tasks.clone();
        thread::spawn(move || {
            for task in &tasks {
                manager.add_dependency(ACTOR, task, &a).unwrap();
            }
        })
    };

    // Every read sees a whole number of committed edges and no cycle.
    for _ in 0..50 {
        let dependents = store.read(|view| view.edges_to(&a)).unwrap();
        assert!(dependents.len() <= tasks.len());
        assert!(store.read(|view| view.topological_order()).is_ok());
    }

    writer.join().expect("writer thread panicked");
    assert_eq!(store.read(|view| view.edges_to(&a)).unwrap().len(), tasks.len());
}

/// Test: Racing writers on separate file handles
/// Given two store handles opened on the same file
/// When one thread adds A -> B through the first and another adds B -> A
/// through the second
/// Then the file lock serializes them and exactly one edge is stored
#[test]
fn test_file_handles_race_reverse_edges() {
    for _ in 0..10 {
        let temp = TempStore::new();
        let (a, b) = {
            let store = temp.open();
            let (_, list) = seed(&store);
            (add_task(&store, list, "A"), add_task(&store, list, "B"))
        };
        let barrier = Arc::new(Barrier::new(2));

        let handles: Vec<_> = [(a, b), (b, a)]
            .into_iter()
            .map(|(dependent, dependency)| {
                let manager = DependencyManager::new(Arc::new(temp.open()));
                let barrier = Arc::clone(&barrier);
                thread::spawn(move || {
                    barrier.wait();
                    manager.add_dependency(ACTOR, &dependent, &dependency)
                })
            })
            .collect();

        let results: Vec<_> = handles
            .into_iter()
            .map(|h| h.join().expect("writer thread panicked"))
            .collect();
        let added = results
            .iter()
            .filter(|r| matches!(r, Ok(AddOutcome::Added { .. })))
            .count();
        assert_eq!(added, 1);
        assert_eq!(
            results
                .iter()
                .filter(|r| matches!(r, Err(Error::Cycle { .. })))
                .count(),
            1
        );

        let edges = temp
            .open()
            .read(|view| Ok(view.has_edge(&a, &b) as u8 + view.has_edge(&b, &a) as u8))
            .unwrap();
        assert_eq!(edges, 1);
    }
}
