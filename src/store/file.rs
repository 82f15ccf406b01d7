use std::fs::{self, File, OpenOptions};
use std::path::{Path, PathBuf};

use fs4::fs_std::FileExt;

use super::{StoreSnapshot, StoreState, StoreTxn, StoreView, TaskStore};
use crate::{tlog_debug, Result};

/// Store persisted as a JSON snapshot on disk.
///
/// The file is the only copy of the state. Each transaction takes an
/// exclusive lock on a `.lock` sibling, reloads the snapshot, runs, and
/// writes the result back before unlocking, so writers in other processes
/// holding the same path are serialized. Reads take a shared lock and
/// load the latest commit. A failed transaction writes nothing.
#[derive(Debug)]
pub struct FileStore {
    path: PathBuf,
    lock_path: PathBuf,
}

impl FileStore {
    /// Open the snapshot at `path`, or start empty if it does not exist.
    ///
    /// # Errors
    /// Returns an error if the file cannot be read or parsed, or if its
    /// contents reference unknown entities or contain a dependency cycle.
    pub fn open(path: &Path) -> Result<Self> {
        tlog_debug!("FileStore::open path={}", path.display());
        let store = Self {
            path: path.to_path_buf(),
            lock_path: path.with_extension("json.lock"),
        };

        let _lock = store.lock(false)?;
        store.load()?;
        Ok(store)
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Open the lock file and block until the lock is granted.
    ///
    /// The lock is released when the returned handle is dropped.
    fn lock(&self, exclusive: bool) -> Result<File> {
        if let Some(dir) = self.lock_path.parent() {
            if !dir.as_os_str().is_empty() && !dir.exists() {
                tlog_debug!("Creating store directory: {}", dir.display());
                fs::create_dir_all(dir)?;
            }
        }
        let file = OpenOptions::new()
            .create(true)
            .truncate(false)
            .read(true)
            .write(true)
            .open(&self.lock_path)?;
        if exclusive {
            FileExt::lock_exclusive(&file)?;
        } else {
            FileExt::lock_shared(&file)?;
        }
        Ok(file)
    }

    /// Read the current snapshot. Caller must hold the lock.
    fn load(&self) -> Result<StoreState> {
        if !self.path.exists() {
            tlog_debug!("Store file not found, starting empty");
            return Ok(StoreState::new());
        }
        let contents = fs::read_to_string(&self.path)?;
        let snapshot: StoreSnapshot = serde_json::from_str(&contents)?;
        tlog_debug!(
            "Snapshot loaded: {} tasks, {} dependencies",
            snapshot.tasks.len(),
            snapshot.dependencies.len()
        );
        StoreState::from_snapshot(snapshot)
    }
}

fn save(path: &Path, state: &StoreState) -> Result<()> {
    let contents = serde_json::to_string_pretty(&state.snapshot())?;

    if path.exists() {
        let backup_path = path.with_extension("json.bak");
        fs::copy(path, &backup_path)?;
    }

    let temp_path = path.with_extension("json.tmp");
    fs::write(&temp_path, &contents)?;
    fs::rename(&temp_path, path)?;
    tlog_debug!("Store saved: {}", path.display());
    Ok(())
}

impl TaskStore for FileStore {
    fn read<R>(&self, f: impl FnOnce(&dyn StoreView) -> Result<R>) -> Result<R> {
        let _lock = self.lock(false)?;
        let state = self.load()?;
        f(&state)
    }

    fn transaction<R>(&self, f: impl FnOnce(&mut dyn StoreTxn) -> Result<R>) -> Result<R> {
        let _lock = self.lock(true)?;
        let mut state = self.load()?;
        let value = f(&mut state)?;
        save(&self.path, &state)?;
        Ok(value)
    }
}
