//! Activity recording tests.
//!
//! These tests verify that committed mutations produce one record each,
//! that rejected or failed mutations produce none, and that the queued
//! file recorder delivers records once its writer drains.

use std::sync::Arc;

use taskgraph::activity::{ActivityKind, ChannelRecorder, JsonlRecorder};
use taskgraph::core::TaskStatus;
use taskgraph::{DependencyManager, Error, TaskUpdate};

use crate::fixtures::{Board, TempStore, ACTOR};

#[test]
fn test_rejected_mutations_record_nothing() {
    let board = Board::new();
    let a = board.task("A");
    let b = board.task("B");
    board.manager.add_dependency(ACTOR, &b, &a).unwrap();
    assert_eq!(board.recorder.len(), 1);

    assert!(board.manager.add_dependency(ACTOR, &a, &b).is_err());
    assert!(board.manager.add_dependency(ACTOR, &a, &a).is_err());
    assert!(board.manager.add_dependency(ACTOR, &b, &a).is_ok());
    assert!(board.manager.remove_dependency(ACTOR, &a, &b).is_err());
    board.manager.set_status(ACTOR, &a, TaskStatus::Todo).unwrap();

    assert_eq!(board.recorder.len(), 1, "no-ops and failures are not recorded");
}

#[test]
fn test_record_describes_change() {
    let board = Board::new();
    let a = board.task("Write docs");
    let b = board.task("Publish");

    board.manager.add_dependency("bob", &b, &a).unwrap();
    board.manager.remove_dependency("carol", &b, &a).unwrap();
    board.manager.set_status(ACTOR, &b, TaskStatus::InProgress).unwrap();
    board.manager.assign(ACTOR, &b, Some("dave")).unwrap();

    let records = board.recorder.records();
    let kinds: Vec<_> = records.iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ActivityKind::DependencyAdded,
            ActivityKind::DependencyRemoved,
            ActivityKind::StatusChanged,
            ActivityKind::AssigneeChanged,
        ]
    );

    assert_eq!(records[0].actor, "bob");
    assert_eq!(records[0].task, b);
    assert!(records[0].before.is_none());
    assert!(records[0].after.as_deref().unwrap().contains("Write docs"));

    assert_eq!(records[1].actor, "carol");
    assert!(records[1].before.as_deref().unwrap().contains("Write docs"));
    assert!(records[1].after.is_none());

    assert_eq!(records[2].before.as_deref(), Some(TaskStatus::Todo.code()));
    assert_eq!(records[2].after.as_deref(), Some(TaskStatus::InProgress.code()));

    assert_eq!(records[3].before, None);
    assert_eq!(records[3].after.as_deref(), Some("dave"));
}

/// Test: Edits and comments
/// Given a task
/// When it is edited, moved and commented on, and another user tries to
/// change the comment
/// Then each committed change is recorded once and the refused edit is not
#[test]
fn test_edits_and_comments_are_recorded() {
    let board = Board::new();
    let a = board.task("Write docs");

    let update = TaskUpdate {
        title: Some("Write user docs".to_string()),
        ..TaskUpdate::default()
    };
    board.manager.update_task(ACTOR, &a, update).unwrap();
    board.manager.move_task(ACTOR, &a, None, 2).unwrap();
    let comment = board.manager.add_comment(ACTOR, &a, "Draft is up").unwrap();
    let err = board
        .manager
        .edit_comment("mallory", &comment.id, "spam")
        .unwrap_err();
    assert!(matches!(err, Error::PermissionDenied(_)));
    board.manager.delete_comment(ACTOR, &comment.id).unwrap();

    let records = board.recorder.records();
    let kinds: Vec<_> = records.iter().map(|r| r.kind).collect();
    assert_eq!(
        kinds,
        vec![
            ActivityKind::TaskUpdated,
            ActivityKind::TaskMoved,
            ActivityKind::CommentAdded,
            ActivityKind::CommentDeleted,
        ]
    );
    assert_eq!(records[0].field.as_deref(), Some("title"));
    assert_eq!(records[0].after.as_deref(), Some("Write user docs"));
    assert!(records.iter().all(|r| r.task == a));
}

#[test]
fn test_queued_file_recorder_drains_on_drop() {
    let temp = TempStore::new();
    let log_path = temp.temp_dir.path().join("activity.jsonl");
    let board = Board::new();
    let a = board.task("A");
    let b = board.task("B");

    let (recorder, writer) = ChannelRecorder::spawn(JsonlRecorder::new(&log_path), 16);
    let manager = DependencyManager::with_recorder(Arc::clone(&board.store), Arc::new(recorder));
    manager.add_dependency(ACTOR, &b, &a).unwrap();
    manager.set_status(ACTOR, &a, TaskStatus::Done).unwrap();

    drop(manager);
    writer.join().expect("activity writer panicked");

    let records = JsonlRecorder::new(&log_path).read_all().unwrap();
    assert_eq!(records.len(), 2);
    assert_eq!(records[0].kind, ActivityKind::DependencyAdded);
    assert_eq!(records[1].kind, ActivityKind::StatusChanged);
}
