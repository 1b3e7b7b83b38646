// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Launcher settings file.
//!
//! ```toml
//! capacity = 5
//! poll_interval = "500ms"
//! startup_timeout = "5s"
//! drain_timeout = "5s"
//! jobs_file = "/var/lib/ew/jobs.toml"
//! audit_log = "/var/lib/ew/runs.jsonl"
//! log_file = "/var/log/ewd.log"
//! watch_parent = false
//! ```
//!
//! Every key is optional. Relative paths resolve against the state directory.

use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;
use thiserror::Error;

/// Largest supported worker pool
pub const MAX_CAPACITY: usize = 1024;

/// Shortest supported poll interval
pub const MIN_POLL_INTERVAL: Duration = Duration::from_millis(10);

/// Settings errors
#[derive(Debug, Error)]
pub enum SettingsError {
    #[error("failed to read settings {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("invalid settings {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid settings: {0}")]
    Invalid(String),
}

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct SettingsFile {
    capacity: Option<usize>,
    #[serde(default, with = "opt_duration")]
    poll_interval: Option<Duration>,
    #[serde(default, with = "opt_duration")]
    startup_timeout: Option<Duration>,
    #[serde(default, with = "opt_duration")]
    drain_timeout: Option<Duration>,
    jobs_file: Option<PathBuf>,
    audit_log: Option<PathBuf>,
    log_file: Option<PathBuf>,
    watch_parent: Option<bool>,
}

mod opt_duration {
    use ew_core::parse_duration;
    use serde::{Deserialize, Deserializer};
    use std::time::Duration;

    pub fn deserialize<'de, D: Deserializer<'de>>(d: D) -> Result<Option<Duration>, D::Error> {
        Option::<String>::deserialize(d)?
            .map(|raw| parse_duration(&raw).map_err(serde::de::Error::custom))
            .transpose()
    }
}

/// Values the launcher can change without restarting
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Tunables {
    pub capacity: usize,
    pub poll_interval: Duration,
    pub startup_timeout: Duration,
    pub drain_timeout: Duration,
}

impl Default for Tunables {
    fn default() -> Self {
        Self {
            capacity: 5,
            poll_interval: Duration::from_millis(500),
            startup_timeout: Duration::from_secs(5),
            drain_timeout: Duration::from_secs(5),
        }
    }
}

/// Fully resolved launcher settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Settings {
    pub tunables: Tunables,
    pub jobs_file: PathBuf,
    pub audit_log: Option<PathBuf>,
    pub log_file: Option<PathBuf>,
    pub watch_parent: bool,
}

impl Settings {
    /// Defaults for a launcher rooted at `state_dir`.
    pub fn defaults(state_dir: &Path) -> Self {
        Self {
            tunables: Tunables::default(),
            jobs_file: state_dir.join("jobs.toml"),
            audit_log: None,
            log_file: None,
            watch_parent: false,
        }
    }

    /// Load `path`, falling back to defaults when the file does not exist.
    pub fn load(path: &Path, state_dir: &Path) -> Result<Self, SettingsError> {
        match std::fs::read_to_string(path) {
            Ok(text) => Self::parse(&text, state_dir).map_err(|e| e.with_path(path)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::defaults(state_dir)),
            Err(source) => Err(SettingsError::Read { path: path.to_path_buf(), source }),
        }
    }

    pub fn parse(text: &str, state_dir: &Path) -> Result<Self, SettingsError> {
        let file: SettingsFile = toml::from_str(text)
            .map_err(|source| SettingsError::Parse { path: PathBuf::new(), source })?;
        let defaults = Self::defaults(state_dir);
        let resolve = |p: PathBuf| if p.is_absolute() { p } else { state_dir.join(p) };

        let settings = Self {
            tunables: Tunables {
                capacity: file.capacity.unwrap_or(defaults.tunables.capacity),
                poll_interval: file.poll_interval.unwrap_or(defaults.tunables.poll_interval),
                startup_timeout: file.startup_timeout.unwrap_or(defaults.tunables.startup_timeout),
                drain_timeout: file.drain_timeout.unwrap_or(defaults.tunables.drain_timeout),
            },
            jobs_file: file.jobs_file.map(resolve).unwrap_or(defaults.jobs_file),
            audit_log: file.audit_log.map(resolve),
            log_file: file.log_file.map(resolve),
            watch_parent: file.watch_parent.unwrap_or(defaults.watch_parent),
        };
        settings.validate()?;
        Ok(settings)
    }

    pub fn validate(&self) -> Result<(), SettingsError> {
        let t = &self.tunables;
        if !(1..=MAX_CAPACITY).contains(&t.capacity) {
            return Err(SettingsError::Invalid(format!(
                "capacity must be between 1 and {MAX_CAPACITY}, got {}",
                t.capacity
            )));
        }
        if t.poll_interval < MIN_POLL_INTERVAL {
            return Err(SettingsError::Invalid(format!(
                "poll_interval must be at least {}ms",
                MIN_POLL_INTERVAL.as_millis()
            )));
        }
        if t.startup_timeout.is_zero() {
            return Err(SettingsError::Invalid("startup_timeout must be positive".to_string()));
        }
        Ok(())
    }
}

impl SettingsError {
    fn with_path(self, path: &Path) -> Self {
        match self {
            SettingsError::Parse { source, .. } => {
                SettingsError::Parse { path: path.to_path_buf(), source }
            }
            other => other,
        }
    }
}

/// Where settings come from, re-read on every reload request.
#[derive(Debug, Clone)]
pub struct SettingsSource {
    pub path: PathBuf,
    pub state_dir: PathBuf,
    /// Fixed drain timeout that wins over the file (`EW_DRAIN_TIMEOUT_MS`)
    pub drain_timeout_override: Option<Duration>,
}

impl SettingsSource {
    pub fn new(path: impl Into<PathBuf>, state_dir: impl Into<PathBuf>) -> Self {
        Self { path: path.into(), state_dir: state_dir.into(), drain_timeout_override: None }
    }

    pub fn with_drain_timeout_override(mut self, timeout: Option<Duration>) -> Self {
        self.drain_timeout_override = timeout;
        self
    }

    pub fn load(&self) -> Result<Settings, SettingsError> {
        let mut settings = Settings::load(&self.path, &self.state_dir)?;
        if let Some(timeout) = self.drain_timeout_override {
            settings.tunables.drain_timeout = timeout;
        }
        Ok(settings)
    }
}

#[cfg(test)]
#[path = "settings_tests.rs"]
mod tests;
