// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Launcher startup and initialization logic.

use std::io::Write;

use fs2::FileExt;
use tracing::{info, warn};

use super::{Config, LauncherLock, LifecycleError};

/// Claim the state directory and prepare the runtime directories
pub fn startup(config: &Config) -> Result<LauncherLock, LifecycleError> {
    match startup_inner(config) {
        Ok(lock) => Ok(lock),
        Err(e) => {
            // Don't clean up if we failed to acquire the lock:
            // the PID file belongs to the already-running launcher.
            if !matches!(e, LifecycleError::LockFailed(_)) {
                cleanup_on_failure(config);
            }
            Err(e)
        }
    }
}

fn startup_inner(config: &Config) -> Result<LauncherLock, LifecycleError> {
    // 1. Create state directory
    std::fs::create_dir_all(&config.state_dir)?;

    // 2. Acquire lock file FIRST - prevents two launchers sharing slots.
    // Don't truncate before we hold the lock, or the running launcher's PID is lost.
    let lock_file = std::fs::OpenOptions::new()
        .write(true)
        .create(true)
        .truncate(false)
        .open(&config.lock_path)?;
    lock_file.try_lock_exclusive().map_err(LifecycleError::LockFailed)?;

    let mut lock_file = lock_file;
    lock_file.set_len(0)?;
    writeln!(lock_file, "{}", std::process::id())?;
    let lock_file = lock_file;

    // 3. Runtime directories
    std::fs::create_dir_all(&config.handoff_dir)?;
    std::fs::create_dir_all(&config.feedback_dir)?;

    // 4. Handoffs from a launcher that died mid-spawn can never be claimed
    match ew_wire::sweep_stale(&config.handoff_dir) {
        Ok(0) => {}
        Ok(removed) => info!(removed, "removed stale handoff files"),
        Err(e) => warn!(error = %e, "failed to sweep handoff directory"),
    }

    info!(state_dir = %config.state_dir.display(), pid = std::process::id(), "launcher started");
    Ok(LauncherLock { config: config.clone(), lock_file })
}

fn cleanup_on_failure(config: &Config) {
    if config.lock_path.exists() {
        let _ = std::fs::remove_file(&config.lock_path);
    }
}

#[cfg(test)]
#[path = "startup_tests.rs"]
mod tests;
