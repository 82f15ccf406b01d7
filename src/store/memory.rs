use std::sync::{RwLock, RwLockWriteGuard};

use super::{StoreState, StoreTxn, StoreView, TaskStore};
use crate::{tlog_debug, Error, Result};

/// Store that keeps everything in process memory.
///
/// Readers share an `RwLock`; a transaction holds the write guard for its
/// whole closure and restores a snapshot of the state if the closure fails.
#[derive(Debug, Default)]
pub struct MemoryStore {
    state: RwLock<StoreState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn write_guard(&self) -> Result<RwLockWriteGuard<'_, StoreState>> {
        self.state.write().map_err(|_| Error::LockPoisoned)
    }
}

impl TaskStore for MemoryStore {
    fn read<R>(&self, f: impl FnOnce(&dyn StoreView) -> Result<R>) -> Result<R> {
        let guard = self.state.read().map_err(|_| Error::LockPoisoned)?;
        f(&*guard)
    }

    fn transaction<R>(&self, f: impl FnOnce(&mut dyn StoreTxn) -> Result<R>) -> Result<R> {
        let mut guard = self.write_guard()?;
        let before = guard.clone();

        let outcome = f(&mut *guard);
        if let Err(err) = &outcome {
            tlog_debug!("MemoryStore transaction rolled back: {}", err);
            *guard = before;
        }
        outcome
    }
}
