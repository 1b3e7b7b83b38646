// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Reaping finished workers and collecting their feedback.

use ew_adapters::{JobStore, Liveness, ProcessManager, WorkerProcess};
use ew_core::{Clock, FeedbackRecord, JobId, LogId};
use tracing::{info, warn};

use super::Launcher;

/// A worker whose slot was just released
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ReapedWorker {
    pub slot: usize,
    pub job_id: JobId,
    pub log_id: LogId,
    pub pid: u32,
    /// Process exit status, absent when a signal ended it
    pub process_exit: Option<i32>,
    /// The worker's own report, absent if it died without writing one
    pub feedback: Option<FeedbackRecord>,
}

impl<S, P, C> Launcher<S, P, C>
where
    S: JobStore,
    P: ProcessManager,
    C: Clock,
{
    /// Release every slot whose process has terminated.
    ///
    /// Feedback is consumed before the slot is released, so an index is
    /// never reused while its record is still unread.
    pub fn reap(&mut self) -> Vec<ReapedWorker> {
        let finished: Vec<(usize, Option<i32>)> = self
            .slots
            .occupied_mut()
            .filter_map(|(index, occupant)| match occupant.process.poll_liveness() {
                Ok(Liveness::Terminated(code)) => Some((index, code)),
                Ok(Liveness::Alive) => None,
                Err(e) => {
                    warn!(slot = index, pid = occupant.pid, error = %e, "failed to poll worker");
                    None
                }
            })
            .collect();

        let mut reaped = Vec::with_capacity(finished.len());
        for (slot, process_exit) in finished {
            let feedback = match self.feedback.try_read_and_consume(slot) {
                Ok(record) => record,
                Err(e) => {
                    warn!(slot, error = %e, "failed to read worker feedback");
                    if let Err(e) = self.feedback.reset(slot) {
                        warn!(slot, error = %e, "failed to reset feedback slot");
                    }
                    None
                }
            };
            let occupant = match self.slots.release(slot) {
                Ok(occupant) => occupant,
                Err(e) => {
                    warn!(slot, error = %e, "failed to release slot");
                    continue;
                }
            };
            if slot >= self.slots.capacity() {
                if let Err(e) = self.feedback.remove_slot(slot) {
                    warn!(slot, error = %e, "failed to remove retired feedback slot");
                }
            }

            let worker = ReapedWorker {
                slot,
                job_id: occupant.job_id,
                log_id: occupant.log_id,
                pid: occupant.pid,
                process_exit,
                feedback,
            };
            log_outcome(&worker);
            reaped.push(worker);
        }
        reaped
    }
}

fn log_outcome(worker: &ReapedWorker) {
    match &worker.feedback {
        Some(record) if record.is_success() => info!(
            job_id = %worker.job_id,
            log_id = %worker.log_id,
            slot = worker.slot,
            pid = worker.pid,
            status = %record.status,
            message = %record.message,
            "worker finished"
        ),
        Some(record) => warn!(
            job_id = %worker.job_id,
            log_id = %worker.log_id,
            slot = worker.slot,
            pid = worker.pid,
            exit_code = record.exit_code,
            status = %record.status,
            message = %record.message,
            "job failed"
        ),
        None => warn!(
            job_id = %worker.job_id,
            log_id = %worker.log_id,
            slot = worker.slot,
            pid = worker.pid,
            process_exit = ?worker.process_exit,
            "worker terminated without feedback"
        ),
    }
}
