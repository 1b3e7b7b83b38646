// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon crate.

use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::lifecycle::LifecycleError;

/// Resolve state directory: EW_STATE_DIR > XDG_STATE_HOME/ew > ~/.local/state/ew
pub fn state_dir() -> Result<PathBuf, LifecycleError> {
    if let Ok(dir) = std::env::var("EW_STATE_DIR") {
        return Ok(PathBuf::from(dir));
    }
    if let Ok(xdg) = std::env::var("XDG_STATE_HOME") {
        return Ok(PathBuf::from(xdg).join("ew"));
    }
    let home = dirs::home_dir().ok_or(LifecycleError::NoStateDir)?;
    Ok(home.join(".local/state/ew"))
}

/// Settings file: EW_CONFIG > <state_dir>/ewd.toml
pub fn settings_path(state_dir: &Path) -> PathBuf {
    match std::env::var("EW_CONFIG") {
        Ok(path) if !path.is_empty() => PathBuf::from(path),
        _ => state_dir.join("ewd.toml"),
    }
}

/// Drain timeout override (`EW_DRAIN_TIMEOUT_MS`).
pub fn drain_timeout() -> Option<Duration> {
    std::env::var("EW_DRAIN_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
}

/// Log filter directive: EW_LOG > RUST_LOG > "info"
pub fn log_filter() -> String {
    ["EW_LOG", "RUST_LOG"]
        .iter()
        .find_map(|key| std::env::var(key).ok().filter(|s| !s.is_empty()))
        .unwrap_or_else(|| "info".to_string())
}

#[cfg(test)]
#[path = "env_tests.rs"]
mod tests;
