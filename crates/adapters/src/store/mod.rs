// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job store adapter: the source of due jobs

mod jobs_file;

pub use jobs_file::TomlJobStore;

use async_trait::async_trait;
use ew_core::{JobDescriptor, JobId, LogId};
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Errors from job store operations
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("failed to read jobs file {path}: {source}")]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("invalid jobs file {path}: {source}")]
    Parse {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("invalid jobs file {path}: {reason}")]
    Invalid { path: PathBuf, reason: String },

    #[error("failed to append to audit log {path}: {source}")]
    Audit {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("job store unavailable: {0}")]
    Unavailable(String),
}

/// Adapter for the store that knows which jobs are due
#[async_trait]
pub trait JobStore: Clone + Send + Sync + 'static {
    /// Jobs ready to run now, in the order they should be considered.
    async fn due_jobs(&self) -> Result<Vec<JobDescriptor>, StoreError>;

    /// Called once a worker for `job_id` has confirmed start-up.
    async fn record_run_start(&self, _job_id: JobId, _log_id: LogId) -> Result<(), StoreError> {
        Ok(())
    }

    /// Re-read job definitions after a reconfiguration request.
    async fn reload(&self) -> Result<(), StoreError> {
        Ok(())
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{JobStore, StoreError};
    use async_trait::async_trait;
    use ew_core::{JobDescriptor, JobId, LogId};
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;

    #[derive(Default)]
    struct FakeStoreState {
        queued: VecDeque<Vec<JobDescriptor>>,
        standing: Vec<JobDescriptor>,
        fail_next: bool,
        queries: usize,
        starts: Vec<(JobId, LogId)>,
        reloads: usize,
    }

    /// Fake job store for testing.
    ///
    /// Each query returns the next queued batch, or the standing batch once
    /// the queue is empty.
    #[derive(Clone, Default)]
    pub struct FakeJobStore {
        inner: Arc<Mutex<FakeStoreState>>,
    }

    impl FakeJobStore {
        pub fn new() -> Self {
            Self::default()
        }

        /// Queue the result of one future `due_jobs` call
        pub fn push_due(&self, jobs: Vec<JobDescriptor>) {
            self.inner.lock().queued.push_back(jobs);
        }

        /// Result returned whenever nothing is queued
        pub fn set_due(&self, jobs: Vec<JobDescriptor>) {
            self.inner.lock().standing = jobs;
        }

        /// Make the next `due_jobs` call fail
        pub fn fail_next_query(&self) {
            self.inner.lock().fail_next = true;
        }

        pub fn query_count(&self) -> usize {
            self.inner.lock().queries
        }

        /// Every `(job_id, log_id)` passed to `record_run_start`
        pub fn starts(&self) -> Vec<(JobId, LogId)> {
            self.inner.lock().starts.clone()
        }

        pub fn reload_count(&self) -> usize {
            self.inner.lock().reloads
        }
    }

    #[async_trait]
    impl JobStore for FakeJobStore {
        async fn due_jobs(&self) -> Result<Vec<JobDescriptor>, StoreError> {
            let mut inner = self.inner.lock();
            inner.queries += 1;
            if std::mem::take(&mut inner.fail_next) {
                return Err(StoreError::Unavailable("injected failure".to_string()));
            }
            match inner.queued.pop_front() {
                Some(jobs) => Ok(jobs),
                None => Ok(inner.standing.clone()),
            }
        }

        async fn record_run_start(&self, job_id: JobId, log_id: LogId) -> Result<(), StoreError> {
            self.inner.lock().starts.push((job_id, log_id));
            Ok(())
        }

        async fn reload(&self) -> Result<(), StoreError> {
            self.inner.lock().reloads += 1;
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeJobStore;

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
