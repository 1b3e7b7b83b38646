// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Single-use handoff of a job descriptor from the launcher to one worker.
//!
//! The launcher writes an envelope into a private file under its runtime
//! directory and passes the file's path to the worker as its only argument.
//! The worker claims the file with an atomic rename, so at most one process
//! can ever read a given envelope, then deletes it. The launcher treats the
//! file's disappearance as the worker's start-up confirmation.

use std::fmt;
use std::fs;
use std::io::{self, Write};
use std::os::unix::fs::OpenOptionsExt;
use std::path::{Path, PathBuf};

use ew_core::{DescriptorError, JobDescriptor};
use nix::errno::Errno;
use nix::sys::signal;
use nix::unistd::Pid;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Envelope format version; bumped on incompatible changes.
pub const HANDOFF_VERSION: u32 = 1;

const HANDOFF_EXT: &str = "handoff";
const CLAIMED_EXT: &str = "claimed";
const TMP_EXT: &str = "tmp";

/// Errors from handoff operations
#[derive(Debug, Error)]
pub enum HandoffError {
    #[error("handoff {handle} unavailable: {reason}")]
    Unavailable { handle: HandoffHandle, reason: String },

    #[error("handoff {handle} is corrupt: {reason}")]
    Corrupt { handle: HandoffHandle, reason: String },

    #[error(transparent)]
    Descriptor(#[from] DescriptorError),

    #[error("failed to encode handoff: {0}")]
    Encode(#[from] serde_json::Error),

    #[error("handoff I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

impl HandoffError {
    fn io(path: &Path, source: io::Error) -> Self {
        Self::Io { path: path.to_path_buf(), source }
    }
}

/// Everything a worker needs from the launcher.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HandoffEnvelope {
    pub version: u32,
    /// Pid of the launcher that created the envelope
    pub owner_pid: u32,
    /// Feedback slot the worker reports into
    pub slot: usize,
    pub feedback_dir: PathBuf,
    pub job: JobDescriptor,
}

impl HandoffEnvelope {
    /// Envelope owned by the current process.
    pub fn new(slot: usize, feedback_dir: impl Into<PathBuf>, job: JobDescriptor) -> Self {
        Self {
            version: HANDOFF_VERSION,
            owner_pid: std::process::id(),
            slot,
            feedback_dir: feedback_dir.into(),
            job,
        }
    }
}

/// Opaque locator a worker uses to find its envelope.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct HandoffHandle(PathBuf);

impl HandoffHandle {
    pub fn path(&self) -> &Path {
        &self.0
    }

    fn claimed_path(&self) -> PathBuf {
        self.0.with_extension(CLAIMED_EXT)
    }
}

impl fmt::Display for HandoffHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.display())
    }
}

impl From<PathBuf> for HandoffHandle {
    fn from(path: PathBuf) -> Self {
        Self(path)
    }
}

impl From<&str> for HandoffHandle {
    fn from(s: &str) -> Self {
        Self(PathBuf::from(s))
    }
}

/// Launcher-side ownership of one handoff.
///
/// Dropping the channel removes the envelope if no worker claimed it.
#[derive(Debug)]
pub struct HandoffChannel {
    handle: HandoffHandle,
}

impl HandoffChannel {
    /// Write `envelope` into a fresh handoff file under `dir`.
    pub fn create(dir: &Path, envelope: &HandoffEnvelope) -> Result<Self, HandoffError> {
        envelope.job.validate()?;
        let payload = serde_json::to_vec(envelope)?;

        let name = format!(
            "{}-slot{}-run{}",
            envelope.owner_pid, envelope.slot, envelope.job.log_id
        );
        let path = dir.join(&name).with_extension(HANDOFF_EXT);
        let tmp = dir.join(&name).with_extension(TMP_EXT);

        let mut file = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .mode(0o600)
            .open(&tmp)
            .map_err(|e| HandoffError::io(&tmp, e))?;
        file.write_all(&payload).map_err(|e| HandoffError::io(&tmp, e))?;
        drop(file);

        // Publish atomically so a worker never sees a partial envelope
        fs::rename(&tmp, &path).map_err(|e| {
            let _ = fs::remove_file(&tmp);
            HandoffError::io(&path, e)
        })?;

        tracing::debug!(
            handle = %path.display(),
            job_id = %envelope.job.job_id,
            bytes = payload.len(),
            "created handoff"
        );
        Ok(Self { handle: HandoffHandle(path) })
    }

    pub fn handle(&self) -> &HandoffHandle {
        &self.handle
    }

    /// True once a worker has claimed the envelope.
    pub fn is_attached(&self) -> bool {
        !self.handle.path().exists()
    }
}

impl Drop for HandoffChannel {
    fn drop(&mut self) {
        for path in [self.handle.path().to_path_buf(), self.handle.claimed_path()] {
            match fs::remove_file(&path) {
                Ok(()) => tracing::debug!(path = %path.display(), "removed handoff file"),
                Err(e) if e.kind() == io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "failed to remove handoff file"
                ),
            }
        }
    }
}

/// Claim, read, and delete the envelope behind `handle`.
///
/// Fails with [`HandoffError::Unavailable`] when the envelope was already
/// claimed or released, or when the launcher that wrote it has exited.
pub fn attach(handle: &HandoffHandle) -> Result<HandoffEnvelope, HandoffError> {
    let claimed = handle.claimed_path();
    if let Err(e) = fs::rename(handle.path(), &claimed) {
        return Err(match e.kind() {
            io::ErrorKind::NotFound => HandoffError::Unavailable {
                handle: handle.clone(),
                reason: "already attached or released".to_string(),
            },
            _ => HandoffError::io(handle.path(), e),
        });
    }

    let bytes = fs::read(&claimed);
    let _ = fs::remove_file(&claimed);
    let bytes = bytes.map_err(|e| HandoffError::io(&claimed, e))?;

    let envelope: HandoffEnvelope = serde_json::from_slice(&bytes)
        .map_err(|e| HandoffError::Corrupt { handle: handle.clone(), reason: e.to_string() })?;

    if envelope.version != HANDOFF_VERSION {
        return Err(HandoffError::Corrupt {
            handle: handle.clone(),
            reason: format!("version {} (expected {HANDOFF_VERSION})", envelope.version),
        });
    }
    if !process_alive(envelope.owner_pid) {
        return Err(HandoffError::Unavailable {
            handle: handle.clone(),
            reason: format!("launcher {} is gone", envelope.owner_pid),
        });
    }
    Ok(envelope)
}

/// Remove handoff files left behind by a previous launcher.
pub fn sweep_stale(dir: &Path) -> io::Result<usize> {
    let mut removed = 0;
    for entry in fs::read_dir(dir)? {
        let path = entry?.path();
        let is_handoff = path
            .extension()
            .and_then(|ext| ext.to_str())
            .is_some_and(|ext| [HANDOFF_EXT, CLAIMED_EXT, TMP_EXT].contains(&ext));
        if is_handoff && fs::remove_file(&path).is_ok() {
            removed += 1;
        }
    }
    Ok(removed)
}

fn process_alive(pid: u32) -> bool {
    let Ok(raw) = i32::try_from(pid) else {
        return false;
    };
    // Signal 0 probes for existence; EPERM still means the process exists.
    match signal::kill(Pid::from_raw(raw), None) {
        Ok(()) => true,
        Err(Errno::EPERM) => true,
        Err(_) => false,
    }
}

#[cfg(test)]
#[path = "handoff_tests.rs"]
mod tests;
