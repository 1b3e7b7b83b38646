// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shell executor: runs commands with `bash -c` under strict mode.

use super::{ExecError, ExecOutcome, Executor};
use async_trait::async_trait;
use ew_core::{JobDescriptor, MAX_MESSAGE_LEN};
use std::path::PathBuf;
use std::process::{Output, Stdio};
use std::time::Duration;
use tokio::process::Command;

/// Runs job commands through `bash`.
///
/// The target is exposed to the command as `EW_DATABASE`, `EW_ROLE` and
/// `EW_SCHEMA`; the run is identified by `EW_JOB_ID` and `EW_LOG_ID`.
#[derive(Debug, Clone, Default)]
pub struct ShellExecutor {
    cwd: Option<PathBuf>,
}

impl ShellExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run commands from `dir` instead of the inherited working directory.
    pub fn with_cwd(mut self, dir: impl Into<PathBuf>) -> Self {
        self.cwd = Some(dir.into());
        self
    }

    fn command(&self, job: &JobDescriptor) -> Command {
        let wrapped = format!("set -euo pipefail\n{}", job.command);
        let mut cmd = Command::new("bash");
        cmd.arg("-c")
            .arg(wrapped)
            .env("EW_DATABASE", &job.target.database)
            .env("EW_ROLE", job.target.role.as_deref().unwrap_or_default())
            .env("EW_SCHEMA", job.target.schema.as_deref().unwrap_or_default())
            .env("EW_JOB_ID", job.job_id.to_string())
            .env("EW_LOG_ID", job.log_id.to_string());
        if let Some(cwd) = &self.cwd {
            cmd.current_dir(cwd);
        }
        cmd
    }
}

#[async_trait]
impl Executor for ShellExecutor {
    async fn run(&self, job: &JobDescriptor) -> Result<ExecOutcome, ExecError> {
        tracing::info!(
            job_id = %job.job_id,
            log_id = %job.log_id,
            job_target = %job.target,
            command = %job.command,
            "running shell command"
        );

        let output = run_with_timeout(self.command(job), job.timeout, "job command").await?;
        let stdout = String::from_utf8_lossy(&output.stdout);
        let stderr = String::from_utf8_lossy(&output.stderr);
        if !stderr.is_empty() {
            tracing::warn!(job_id = %job.job_id, stderr = %stderr, "shell stderr");
        }

        match output.status.code() {
            Some(0) => {
                let message = stdout.lines().rev().find(|l| !l.trim().is_empty()).unwrap_or("");
                Ok(ExecOutcome::ok(message.trim()))
            }
            code => Err(ExecError::Failed {
                exit_code: code.unwrap_or(-1),
                stderr: tail(stderr.trim_end(), MAX_MESSAGE_LEN).to_string(),
            }),
        }
    }
}

/// Run `cmd` to completion with captured output, killing it after `timeout`.
pub async fn run_with_timeout(
    mut cmd: Command,
    timeout: Duration,
    description: &str,
) -> Result<Output, ExecError> {
    cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped()).kill_on_drop(true);
    match tokio::time::timeout(timeout, cmd.output()).await {
        Ok(Ok(output)) => Ok(output),
        Ok(Err(e)) => {
            tracing::error!(description, error = %e, "failed to spawn");
            Err(ExecError::Spawn(e.to_string()))
        }
        Err(_) => {
            tracing::warn!(description, timeout_ms = timeout.as_millis() as u64, "timed out");
            Err(ExecError::Timeout(timeout))
        }
    }
}

/// Last `max` bytes of `s`, starting on a character boundary.
fn tail(s: &str, max: usize) -> &str {
    if s.len() <= max {
        return s;
    }
    let mut start = s.len() - max;
    while !s.is_char_boundary(start) {
        start += 1;
    }
    &s[start..]
}

#[cfg(test)]
#[path = "shell_tests.rs"]
mod tests;
