// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Job descriptor: the immutable description of one scheduled run.

use crate::id::{JobId, LogId};
use crate::target::Target;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use thiserror::Error;

/// Largest command payload, in bytes, a descriptor may carry.
pub const MAX_COMMAND_LEN: usize = 64 * 1024;

/// Default job timeout when the job store does not specify one.
pub const DEFAULT_JOB_TIMEOUT: Duration = Duration::from_secs(3600);

/// Descriptor validation errors
#[derive(Debug, Error, PartialEq, Eq)]
pub enum DescriptorError {
    #[error("job {job_id}: command is {len} bytes, limit is {MAX_COMMAND_LEN}")]
    CommandTooLong { job_id: JobId, len: usize },
}

/// One scheduled run of a job.
///
/// Owned by the launcher until handoff, then by the worker that attached it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JobDescriptor {
    pub job_id: JobId,
    pub log_id: LogId,
    pub timeout: Duration,
    /// Whether several runs of this job may execute at once
    pub parallel: bool,
    pub target: Target,
    /// Opaque payload interpreted by the execution adapter
    pub command: String,
}

impl JobDescriptor {
    pub fn new(job_id: JobId, log_id: LogId, target: Target, command: impl Into<String>) -> Self {
        Self {
            job_id,
            log_id,
            timeout: DEFAULT_JOB_TIMEOUT,
            parallel: false,
            target,
            command: command.into(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Check the descriptor fits through a handoff channel.
    pub fn validate(&self) -> Result<(), DescriptorError> {
        if self.command.len() > MAX_COMMAND_LEN {
            return Err(DescriptorError::CommandTooLong {
                job_id: self.job_id,
                len: self.command.len(),
            });
        }
        Ok(())
    }

    /// Process title used in logs, e.g. `worker 12`.
    pub fn worker_name(&self) -> String {
        format!("worker {}", self.job_id)
    }
}

crate::builder! {
    pub struct JobDescriptorBuilder => JobDescriptor {
        into {
            target: Target = Target::new("postgres"),
            command: String = "true",
        }
        set {
            job_id: JobId = JobId::new(1),
            log_id: LogId = LogId::new(1),
            timeout: Duration = Duration::from_secs(60),
            parallel: bool = false,
        }
    }
}

#[cfg(test)]
#[path = "job_tests.rs"]
mod tests;
