// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Launcher lifecycle management: startup and shutdown.

mod startup;
pub use startup::startup;

use std::fs::File;
use std::path::PathBuf;

use thiserror::Error;
use tracing::{info, warn};

/// Launcher filesystem layout
#[derive(Debug, Clone)]
pub struct Config {
    /// Root state directory (e.g. ~/.local/state/ew)
    pub state_dir: PathBuf,
    /// Path to lock/PID file
    pub lock_path: PathBuf,
    /// Path to the settings file
    pub settings_path: PathBuf,
    /// Directory holding in-flight handoff files
    pub handoff_dir: PathBuf,
    /// Directory holding the feedback table's slot files
    pub feedback_dir: PathBuf,
}

impl Config {
    /// Resolve the layout from the environment.
    ///
    /// `settings_path` overrides `EW_CONFIG` and the default location.
    pub fn load(settings_path: Option<PathBuf>) -> Result<Self, LifecycleError> {
        let state_dir = crate::env::state_dir()?;
        let settings_path = settings_path.unwrap_or_else(|| crate::env::settings_path(&state_dir));
        Ok(Self { settings_path, ..Self::for_state_dir(state_dir) })
    }

    /// Layout rooted at `state_dir` with the settings file inside it.
    pub fn for_state_dir(state_dir: impl Into<PathBuf>) -> Self {
        let state_dir = state_dir.into();
        let run_dir = state_dir.join("run");
        Self {
            lock_path: state_dir.join("ewd.pid"),
            settings_path: state_dir.join("ewd.toml"),
            handoff_dir: run_dir.join("handoff"),
            feedback_dir: run_dir.join("feedback"),
            state_dir,
        }
    }
}

/// A running launcher's hold on its state directory.
pub struct LauncherLock {
    pub config: Config,
    // NOTE(lifetime): Held to maintain exclusive file lock; released on drop
    #[allow(dead_code)]
    lock_file: File,
}

impl LauncherLock {
    /// Remove the PID file and release the lock.
    pub fn shutdown(self) {
        if self.config.lock_path.exists() {
            if let Err(e) = std::fs::remove_file(&self.config.lock_path) {
                warn!("Failed to remove PID file: {}", e);
            }
        }
        info!("Launcher shutdown complete");
    }
}

/// Lifecycle errors
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("Could not determine state directory")]
    NoStateDir,

    #[error("Failed to acquire lock: launcher already running?")]
    LockFailed(#[source] std::io::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
