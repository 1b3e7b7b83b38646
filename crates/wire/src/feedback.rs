// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-slot feedback records shared between the launcher and its workers.
//!
//! Each slot is one small file in the feedback directory, guarded by an
//! advisory exclusive lock held for the duration of every read or write.
//! Operations touch exactly one slot file, so no two locks are ever held
//! at once.
//!
//! Protocol:
//! - the launcher creates every slot as `consumed = true`
//! - a worker writes its slot once, flipping `consumed` to false
//! - after confirming the worker exited, the launcher reads the slot and
//!   flips `consumed` back to true

use std::fs::{self, File};
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use ew_core::{FeedbackRecord, StatusCode};
use fs2::FileExt;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Errors from feedback table operations
#[derive(Debug, Error)]
pub enum FeedbackError {
    #[error("feedback slot {0} does not exist")]
    NoSuchSlot(usize),

    #[error("feedback slot {0} already holds an unread record")]
    AlreadyWritten(usize),

    #[error("feedback slot {index} is corrupt: {source}")]
    Corrupt {
        index: usize,
        #[source]
        source: serde_json::Error,
    },

    #[error("feedback I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

/// On-disk contents of one slot.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct SlotState {
    consumed: bool,
    #[serde(flatten)]
    record: FeedbackRecord,
}

impl Default for SlotState {
    fn default() -> Self {
        Self { consumed: true, record: FeedbackRecord::new(0, "", "") }
    }
}

/// Handle on a feedback directory.
///
/// Cheap to construct; holds no open files between operations.
#[derive(Debug, Clone)]
pub struct FeedbackTable {
    dir: PathBuf,
}

impl FeedbackTable {
    /// Create (or reset) slots `0..capacity` under `dir`.
    ///
    /// Slot files beyond `capacity` from an earlier, larger table are removed.
    pub fn create(dir: impl Into<PathBuf>, capacity: usize) -> Result<Self, FeedbackError> {
        let table = Self { dir: dir.into() };
        fs::create_dir_all(&table.dir).map_err(|e| table.io(&table.dir, e))?;

        for index in 0..capacity {
            table.reset(index)?;
        }
        for index in table.slot_indices()? {
            if index >= capacity {
                table.remove_slot(index)?;
            }
        }
        Ok(table)
    }

    /// Open an existing table without touching any slot.
    pub fn open(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    /// Store a worker's outcome in slot `index`.
    ///
    /// The message is truncated to its bound. Fails if the slot was never
    /// created or still holds a record the launcher has not consumed.
    pub fn write(
        &self,
        index: usize,
        exit_code: i32,
        status: impl Into<StatusCode>,
        message: &str,
    ) -> Result<(), FeedbackError> {
        let record = FeedbackRecord::new(exit_code, status, message);
        self.with_slot(index, false, |state| {
            if !state.consumed {
                return Err(FeedbackError::AlreadyWritten(index));
            }
            *state = SlotState { consumed: false, record };
            Ok(())
        })?
    }

    /// Take the unread record in slot `index`, if any.
    ///
    /// Returns `None` when the slot was already consumed or never written.
    pub fn try_read_and_consume(
        &self,
        index: usize,
    ) -> Result<Option<FeedbackRecord>, FeedbackError> {
        self.with_slot(index, false, |state| {
            if state.consumed {
                return None;
            }
            state.consumed = true;
            Some(state.record.clone())
        })
    }

    /// Put slot `index` back to its initial, consumed state, creating it if needed.
    ///
    /// The previous contents are never parsed, so a torn write is cleared too.
    pub fn reset(&self, index: usize) -> Result<(), FeedbackError> {
        let path = self.slot_path(index);
        self.with_locked(index, true, |file| {
            self.persist(index, &path, file, &SlotState::default())
        })
    }

    /// Delete slot `index`.
    pub fn remove_slot(&self, index: usize) -> Result<(), FeedbackError> {
        let path = self.slot_path(index);
        match fs::remove_file(&path) {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(e) => Err(self.io(&path, e)),
        }
    }

    fn slot_path(&self, index: usize) -> PathBuf {
        self.dir.join(format!("slot-{index}"))
    }

    fn slot_indices(&self) -> Result<Vec<usize>, FeedbackError> {
        let entries = fs::read_dir(&self.dir).map_err(|e| self.io(&self.dir, e))?;
        let mut indices = Vec::new();
        for entry in entries {
            let entry = entry.map_err(|e| self.io(&self.dir, e))?;
            let name = entry.file_name();
            let index = name
                .to_str()
                .and_then(|n| n.strip_prefix("slot-"))
                .and_then(|n| n.parse().ok());
            if let Some(index) = index {
                indices.push(index);
            }
        }
        Ok(indices)
    }

    /// Run `f` on slot `index` while holding the slot's lock, then persist.
    fn with_slot<T>(
        &self,
        index: usize,
        create: bool,
        f: impl FnOnce(&mut SlotState) -> T,
    ) -> Result<T, FeedbackError> {
        let path = self.slot_path(index);
        self.with_locked(index, create, |file| self.locked_update(index, &path, file, f))
    }

    /// Open slot `index` and run `f` under its exclusive lock.
    fn with_locked<T>(
        &self,
        index: usize,
        create: bool,
        f: impl FnOnce(&mut File) -> Result<T, FeedbackError>,
    ) -> Result<T, FeedbackError> {
        let path = self.slot_path(index);
        let mut file = fs::OpenOptions::new()
            .read(true)
            .write(true)
            .create(create)
            .truncate(false)
            .mode(0o600)
            .open(&path)
            .map_err(|e| match e.kind() {
                io::ErrorKind::NotFound => FeedbackError::NoSuchSlot(index),
                _ => self.io(&path, e),
            })?;

        file.lock_exclusive().map_err(|e| self.io(&path, e))?;
        let result = f(&mut file);
        let _ = FileExt::unlock(&file);
        result
    }

    fn locked_update<T>(
        &self,
        index: usize,
        path: &Path,
        file: &mut File,
        f: impl FnOnce(&mut SlotState) -> T,
    ) -> Result<T, FeedbackError> {
        let mut raw = String::new();
        file.read_to_string(&mut raw).map_err(|e| self.io(path, e))?;
        let mut state = if raw.trim().is_empty() {
            SlotState::default()
        } else {
            serde_json::from_str(&raw).map_err(|source| FeedbackError::Corrupt { index, source })?
        };

        let before = state.clone();
        let out = f(&mut state);
        if state != before || raw.trim().is_empty() {
            self.persist(index, path, file, &state)?;
        }
        Ok(out)
    }

    /// Replace the slot file's contents with `state`.
    fn persist(
        &self,
        index: usize,
        path: &Path,
        file: &mut File,
        state: &SlotState,
    ) -> Result<(), FeedbackError> {
        let encoded =
            serde_json::to_vec(state).map_err(|source| FeedbackError::Corrupt { index, source })?;
        file.seek(SeekFrom::Start(0)).map_err(|e| self.io(path, e))?;
        file.set_len(0).map_err(|e| self.io(path, e))?;
        file.write_all(&encoded).map_err(|e| self.io(path, e))?;
        file.sync_data().map_err(|e| self.io(path, e))
    }

    fn io(&self, path: &Path, source: io::Error) -> FeedbackError {
        FeedbackError::Io { path: path.to_path_buf(), source }
    }
}

#[cfg(test)]
#[path = "feedback_tests.rs"]
mod tests;
