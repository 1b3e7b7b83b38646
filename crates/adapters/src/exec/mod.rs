// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Execution adapter: runs one job's command against its target

mod shell;

pub use shell::{run_with_timeout, ShellExecutor};

use async_trait::async_trait;
use ew_core::{JobDescriptor, StatusCode};
use std::time::Duration;
use thiserror::Error;

/// Successful outcome of a job's payload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutcome {
    pub status: StatusCode,
    pub message: String,
}

impl ExecOutcome {
    pub fn ok(message: impl Into<String>) -> Self {
        Self { status: StatusCode::ok(), message: message.into() }
    }
}

/// Errors from running a job's payload
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ExecError {
    #[error("command exited with {exit_code}: {stderr}")]
    Failed { exit_code: i32, stderr: String },

    #[error("command timed out after {}", ew_core::format_duration(*.0))]
    Timeout(Duration),

    #[error("failed to start command: {0}")]
    Spawn(String),
}

/// Adapter that executes job payloads
#[async_trait]
pub trait Executor: Clone + Send + Sync + 'static {
    /// Run `job.command` against `job.target`, giving up after `job.timeout`.
    async fn run(&self, job: &JobDescriptor) -> Result<ExecOutcome, ExecError>;
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{ExecError, ExecOutcome, Executor};
    use async_trait::async_trait;
    use ew_core::JobDescriptor;
    use parking_lot::Mutex;
    use std::collections::VecDeque;
    use std::sync::Arc;
    use std::time::Duration;

    #[derive(Default)]
    struct FakeExecState {
        results: VecDeque<Result<ExecOutcome, ExecError>>,
        delay: Option<Duration>,
        calls: Vec<JobDescriptor>,
    }

    /// Fake executor for testing.
    ///
    /// Returns scripted results in order, then `OK` with an empty message.
    #[derive(Clone, Default)]
    pub struct FakeExecutor {
        inner: Arc<Mutex<FakeExecState>>,
    }

    impl FakeExecutor {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn push_result(&self, result: Result<ExecOutcome, ExecError>) {
            self.inner.lock().results.push_back(result);
        }

        /// Sleep this long before returning, to simulate a slow payload
        pub fn set_delay(&self, delay: Duration) {
            self.inner.lock().delay = Some(delay);
        }

        /// Every descriptor passed to `run`
        pub fn calls(&self) -> Vec<JobDescriptor> {
            self.inner.lock().calls.clone()
        }
    }

    #[async_trait]
    impl Executor for FakeExecutor {
        async fn run(&self, job: &JobDescriptor) -> Result<ExecOutcome, ExecError> {
            let (result, delay) = {
                let mut inner = self.inner.lock();
                inner.calls.push(job.clone());
                let result = inner.results.pop_front().unwrap_or_else(|| Ok(ExecOutcome::ok("")));
                (result, inner.delay)
            };
            if let Some(delay) = delay {
                tokio::time::sleep(delay).await;
            }
            result
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::FakeExecutor;
