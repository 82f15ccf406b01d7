//! Audit trail of task changes.
//!
//! The dependency manager reports each committed mutation to an
//! [`ActivityRecorder`] after its transaction succeeds. Recording is
//! best-effort: it never returns an error and never waits on a full queue,
//! so a slow or broken sink cannot fail or stall the mutation itself.

use std::fs::OpenOptions;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Mutex;
use std::thread::JoinHandle;

use chrono::{DateTime, Utc};
use crossbeam_channel::{Receiver, Sender, TrySendError};
use serde::{Deserialize, Serialize};

use crate::core::TaskId;
use crate::{tlog_debug, tlog_error, tlog_warn};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ActivityKind {
    DependencyAdded,
    DependencyRemoved,
    StatusChanged,
    AssigneeChanged,
    TaskUpdated,
    TaskMoved,
    CommentAdded,
    CommentEdited,
    CommentDeleted,
}

impl std::fmt::Display for ActivityKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ActivityKind::DependencyAdded => write!(f, "dependency added"),
            ActivityKind::DependencyRemoved => write!(f, "dependency removed"),
            ActivityKind::StatusChanged => write!(f, "status changed"),
            ActivityKind::AssigneeChanged => write!(f, "assignee changed"),
            ActivityKind::TaskUpdated => write!(f, "task updated"),
            ActivityKind::TaskMoved => write!(f, "task moved"),
            ActivityKind::CommentAdded => write!(f, "comment added"),
            ActivityKind::CommentEdited => write!(f, "comment edited"),
            ActivityKind::CommentDeleted => write!(f, "comment deleted"),
        }
    }
}

/// One audit entry: who changed what on which task, with before/after values.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ActivityRecord {
    pub actor: String,
    pub timestamp: DateTime<Utc>,
    pub task: TaskId,
    pub kind: ActivityKind,
    /// Edited field, for `TaskUpdated` records.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub field: Option<String>,
    pub before: Option<String>,
    pub after: Option<String>,
}

impl ActivityRecord {
    pub fn new(actor: &str, task: TaskId, kind: ActivityKind) -> Self {
        Self {
            actor: actor.to_string(),
            timestamp: Utc::now(),
            task,
            kind,
            field: None,
            before: None,
            after: None,
        }
    }

    pub fn with_field(mut self, field: &str) -> Self {
        self.field = Some(field.to_string());
        self
    }

    pub fn with_change(mut self, before: Option<String>, after: Option<String>) -> Self {
        self.before = before;
        self.after = after;
        self
    }
}

/// Sink for activity records.
pub trait ActivityRecorder: Send + Sync {
    fn record(&self, record: ActivityRecord);
}

/// Discards every record.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullRecorder;

impl ActivityRecorder for NullRecorder {
    fn record(&self, _record: ActivityRecord) {}
}

/// Keeps records in memory, in arrival order.
#[derive(Debug, Default)]
pub struct MemoryRecorder {
    records: Mutex<Vec<ActivityRecord>>,
}

impl MemoryRecorder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn records(&self) -> Vec<ActivityRecord> {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    pub fn len(&self) -> usize {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl ActivityRecorder for MemoryRecorder {
    fn record(&self, record: ActivityRecord) {
        self.records
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .push(record);
    }
}

/// Appends one JSON object per line to a file.
///
/// Write failures are logged and the record is dropped.
#[derive(Debug, Clone)]
pub struct JsonlRecorder {
    path: PathBuf,
}

impl JsonlRecorder {
    pub fn new(path: &Path) -> Self {
        Self {
            path: path.to_path_buf(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    fn append(&self, record: &ActivityRecord) -> crate::Result<()> {
        if let Some(dir) = self.path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir)?;
            }
        }
        let line = serde_json::to_string(record)?;
        let mut file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        writeln!(file, "{}", line)?;
        Ok(())
    }

    /// Read every record back from the file, skipping unparsable lines.
    pub fn read_all(&self) -> crate::Result<Vec<ActivityRecord>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let contents = std::fs::read_to_string(&self.path)?;
        Ok(contents
            .lines()
            .filter(|line| !line.trim().is_empty())
            .filter_map(|line| serde_json::from_str(line).ok())
            .collect())
    }
}

impl ActivityRecorder for JsonlRecorder {
    fn record(&self, record: ActivityRecord) {
        if let Err(err) = self.append(&record) {
            tlog_error!(
                "Failed to append activity to {}: {}",
                self.path.display(),
                err
            );
        }
    }
}

/// Queues records on a bounded channel.
///
/// `try_send` never blocks: when the queue is full the record is dropped
/// and counted.
#[derive(Debug)]
pub struct ChannelRecorder {
    tx: Sender<ActivityRecord>,
    dropped: AtomicU64,
}

impl ChannelRecorder {
    pub fn bounded(capacity: usize) -> (Self, Receiver<ActivityRecord>) {
        let (tx, rx) = crossbeam_channel::bounded(capacity);
        (
            Self {
                tx,
                dropped: AtomicU64::new(0),
            },
            rx,
        )
    }

    /// Queue records for `sink` on a background thread.
    ///
    /// The thread drains the queue and exits once the recorder is dropped.
    pub fn spawn<R>(sink: R, capacity: usize) -> (Self, JoinHandle<()>)
    where
        R: ActivityRecorder + 'static,
    {
        let (recorder, rx) = Self::bounded(capacity);
        let handle = std::thread::spawn(move || {
            for record in rx.iter() {
                sink.record(record);
            }
            tlog_debug!("Activity writer thread exiting");
        });
        (recorder, handle)
    }

    /// Number of records dropped because the queue was full or closed.
    pub fn dropped(&self) -> u64 {
        self.dropped.load(Ordering::Relaxed)
    }
}

impl ActivityRecorder for ChannelRecorder {
    fn record(&self, record: ActivityRecord) {
        match self.tx.try_send(record) {
            Ok(()) => {}
            Err(TrySendError::Full(record)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tlog_warn!(
                    "Activity queue full, dropping {} on task {}",
                    record.kind,
                    record.task
                );
            }
            Err(TrySendError::Disconnected(_)) => {
                self.dropped.fetch_add(1, Ordering::Relaxed);
                tlog_debug!("Activity queue closed, dropping record");
            }
        }
    }
}
