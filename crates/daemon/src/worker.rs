// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker process entry point.
//!
//! A worker attaches to its handoff, runs the job through an [`Executor`],
//! records the outcome in its feedback slot, and exits. Only a failure to
//! attach or to write feedback ends the process without a record.

use std::future::Future;

use ew_adapters::{ExecError, ExecOutcome, Executor};
use ew_core::{status, FeedbackRecord};
use ew_wire::{FeedbackTable, HandoffHandle};
use tracing::{error, info, info_span, Instrument};

/// Exit status when no feedback could be recorded
pub const NO_FEEDBACK_EXIT: i32 = 2;

/// Exit status reported after a termination request
pub const TERMINATED_EXIT: i32 = 143;

/// Run the job behind `handle` and return the process exit status.
///
/// `terminate` resolves when the launcher asks the worker to stop; the job
/// is then abandoned and recorded as `TERMINATED`.
pub async fn run_worker<E, T>(handle: &HandoffHandle, executor: &E, terminate: T) -> i32
where
    E: Executor,
    T: Future<Output = ()>,
{
    let envelope = match ew_wire::attach(handle) {
        Ok(envelope) => envelope,
        Err(e) => {
            error!(%handle, error = %e, "no job to run");
            return NO_FEEDBACK_EXIT;
        }
    };
    let job = &envelope.job;
    let span = info_span!(
        "worker",
        job_id = %job.job_id,
        log_id = %job.log_id,
        slot = envelope.slot
    );

    async {
        info!(command_len = job.command.len(), job_target = %job.target, "job started");
        let record = tokio::select! {
            result = executor.run(job) => feedback_for(result),
            () = terminate => {
                FeedbackRecord::new(TERMINATED_EXIT, status::TERMINATED, "terminated by launcher")
            }
        };

        let table = FeedbackTable::open(&envelope.feedback_dir);
        if let Err(e) =
            table.write(envelope.slot, record.exit_code, record.status.clone(), &record.message)
        {
            error!(error = %e, "failed to record feedback");
            return NO_FEEDBACK_EXIT;
        }
        info!(exit_code = record.exit_code, status = %record.status, "job finished");
        process_exit_code(record.exit_code)
    }
    .instrument(span)
    .await
}

/// Translate an execution result into the record the launcher will read.
pub fn feedback_for(result: Result<ExecOutcome, ExecError>) -> FeedbackRecord {
    match result {
        Ok(outcome) => FeedbackRecord::new(0, outcome.status, outcome.message),
        Err(ExecError::Failed { exit_code, stderr }) => {
            FeedbackRecord::new(exit_code, status::ERR, stderr)
        }
        Err(e @ ExecError::Timeout(_)) => FeedbackRecord::new(1, status::TIMEOUT, e.to_string()),
        Err(e @ ExecError::Spawn(_)) => FeedbackRecord::new(1, status::EXEC, e.to_string()),
    }
}

/// Feedback exit codes outside `0..=255` cannot be a process status.
fn process_exit_code(code: i32) -> i32 {
    if (0..=255).contains(&code) {
        code
    } else {
        1
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
