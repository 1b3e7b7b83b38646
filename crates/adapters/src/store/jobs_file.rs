// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job store backed by a TOML file of interval-scheduled jobs.

use super::{JobStore, StoreError};
use async_trait::async_trait;
use ew_core::duration::serde_str;
use ew_core::{Clock, JobDescriptor, JobId, LogId, Target, DEFAULT_JOB_TIMEOUT};
use parking_lot::Mutex;
use serde::Deserialize;
use std::collections::{HashMap, HashSet};
use std::fs::OpenOptions;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
struct JobsFile {
    #[serde(default)]
    job: Vec<JobEntry>,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(deny_unknown_fields)]
struct JobEntry {
    id: JobId,
    #[serde(with = "serde_str")]
    every: Duration,
    command: String,
    #[serde(default = "default_timeout", with = "serde_str")]
    timeout: Duration,
    #[serde(default)]
    parallel: bool,
    #[serde(default = "default_enabled")]
    enabled: bool,
    target: Target,
}

fn default_timeout() -> Duration {
    DEFAULT_JOB_TIMEOUT
}

fn default_enabled() -> bool {
    true
}

#[derive(Debug)]
struct Schedule {
    entry: JobEntry,
    next_due_ms: u64,
}

#[derive(Debug)]
struct StoreState {
    jobs: Vec<Schedule>,
    next_log_id: u32,
}

/// Interval-scheduled jobs read from a TOML file.
///
/// Every job is due as soon as the store is loaded. Once a run of it starts
/// the job is next due `every` later; a job whose launch was refused stays
/// due and is offered again on the next query.
#[derive(Clone)]
pub struct TomlJobStore<C: Clock> {
    path: PathBuf,
    audit_log: Option<PathBuf>,
    clock: C,
    state: Arc<Mutex<StoreState>>,
}

impl<C: Clock> TomlJobStore<C> {
    /// Load `path`. A missing file is an empty job list.
    pub fn open(path: impl Into<PathBuf>, clock: C) -> Result<Self, StoreError> {
        let path = path.into();
        let entries = load_entries(&path)?;
        let now = clock.epoch_ms();
        let jobs = entries.into_iter().map(|entry| Schedule { entry, next_due_ms: now }).collect();
        // Seed from wall-clock seconds so log ids keep increasing across restarts
        let next_log_id = u32::try_from(now / 1000).unwrap_or(1).max(1);

        tracing::info!(path = %path.display(), "loaded jobs file");
        Ok(Self {
            path,
            audit_log: None,
            clock,
            state: Arc::new(Mutex::new(StoreState { jobs, next_log_id })),
        })
    }

    /// Append one JSON line per started run to `path`.
    pub fn with_audit_log(mut self, path: impl Into<PathBuf>) -> Self {
        self.audit_log = Some(path.into());
        self
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Ids of every configured job, enabled or not, in file order
    pub fn job_ids(&self) -> Vec<JobId> {
        self.state.lock().jobs.iter().map(|s| s.entry.id).collect()
    }

    fn append_audit(&self, path: &Path, job_id: JobId, log_id: LogId) -> io::Result<()> {
        let line = serde_json::json!({
            "job_id": job_id,
            "log_id": log_id,
            "started_at_ms": self.clock.epoch_ms(),
        });
        let mut file = OpenOptions::new().create(true).append(true).open(path)?;
        writeln!(file, "{line}")
    }
}

#[async_trait]
impl<C: Clock> JobStore for TomlJobStore<C> {
    async fn due_jobs(&self) -> Result<Vec<JobDescriptor>, StoreError> {
        let now = self.clock.epoch_ms();
        let mut state = self.state.lock();
        let StoreState { jobs, next_log_id } = &mut *state;

        let mut due = Vec::new();
        for schedule in jobs.iter().filter(|s| s.entry.enabled && s.next_due_ms <= now) {
            let entry = &schedule.entry;
            let log_id = LogId::new(*next_log_id);
            *next_log_id = next_log_id.checked_add(1).unwrap_or(1);
            due.push(
                JobDescriptor::new(entry.id, log_id, entry.target.clone(), entry.command.clone())
                    .with_timeout(entry.timeout)
                    .with_parallel(entry.parallel),
            );
        }
        Ok(due)
    }

    async fn record_run_start(&self, job_id: JobId, log_id: LogId) -> Result<(), StoreError> {
        let now = self.clock.epoch_ms();
        {
            let mut state = self.state.lock();
            if let Some(schedule) = state.jobs.iter_mut().find(|s| s.entry.id == job_id) {
                let every = u64::try_from(schedule.entry.every.as_millis()).unwrap_or(u64::MAX);
                schedule.next_due_ms = now.saturating_add(every);
            }
        }

        match &self.audit_log {
            Some(path) => self
                .append_audit(path, job_id, log_id)
                .map_err(|source| StoreError::Audit { path: path.clone(), source }),
            None => {
                tracing::debug!(%job_id, %log_id, "run started");
                Ok(())
            }
        }
    }

    async fn reload(&self) -> Result<(), StoreError> {
        let entries = load_entries(&self.path)?;
        let now = self.clock.epoch_ms();
        let mut state = self.state.lock();

        let previous: HashMap<JobId, u64> =
            state.jobs.iter().map(|s| (s.entry.id, s.next_due_ms)).collect();
        state.jobs = entries
            .into_iter()
            .map(|entry| {
                let next_due_ms = previous.get(&entry.id).copied().unwrap_or(now);
                Schedule { entry, next_due_ms }
            })
            .collect();

        tracing::info!(path = %self.path.display(), jobs = state.jobs.len(), "reloaded jobs file");
        Ok(())
    }
}

fn load_entries(path: &Path) -> Result<Vec<JobEntry>, StoreError> {
    let text = match std::fs::read_to_string(path) {
        Ok(text) => text,
        Err(e) if e.kind() == io::ErrorKind::NotFound => {
            tracing::info!(path = %path.display(), "no jobs file, nothing to schedule");
            return Ok(Vec::new());
        }
        Err(source) => return Err(StoreError::Read { path: path.to_path_buf(), source }),
    };
    let file: JobsFile = toml::from_str(&text)
        .map_err(|source| StoreError::Parse { path: path.to_path_buf(), source })?;

    let invalid = |reason: String| StoreError::Invalid { path: path.to_path_buf(), reason };
    let mut seen = HashSet::new();
    for entry in &file.job {
        if !seen.insert(entry.id) {
            return Err(invalid(format!("duplicate job id {}", entry.id)));
        }
        if entry.command.trim().is_empty() {
            return Err(invalid(format!("job {} has an empty command", entry.id)));
        }
        if entry.every.is_zero() {
            return Err(invalid(format!("job {} has a zero interval", entry.id)));
        }
        JobDescriptor::new(entry.id, LogId::new(0), entry.target.clone(), entry.command.as_str())
            .validate()
            .map_err(|e| invalid(e.to_string()))?;
    }
    Ok(file.job)
}

#[cfg(test)]
#[path = "jobs_file_tests.rs"]
mod tests;
