// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Launching one admitted job into a slot.

use std::time::Duration;

use ew_adapters::{JobStore, Liveness, ProcessError, ProcessManager, SpawnRequest, WorkerProcess};
use ew_core::{format_duration, Clock, JobDescriptor};
use ew_wire::{FeedbackError, HandoffChannel, HandoffEnvelope, HandoffError};
use thiserror::Error;
use tokio::time::Instant;
use tracing::{info, warn};

use super::slots::{Occupant, SlotError};
use super::Launcher;

/// How often start-up confirmation is checked
const STARTUP_POLL: Duration = Duration::from_millis(10);

/// Reasons a worker never got bound to its slot
#[derive(Debug, Error)]
pub enum LaunchError {
    #[error(transparent)]
    Handoff(#[from] HandoffError),

    #[error(transparent)]
    Feedback(#[from] FeedbackError),

    #[error(transparent)]
    Spawn(ProcessError),

    #[error("worker {pid} did not attach within {}", format_duration(*.timeout))]
    StartupTimeout { pid: u32, timeout: Duration },

    #[error("worker {pid} exited during start-up with {}", describe_exit(*.code))]
    ExitedDuringStartup { pid: u32, code: Option<i32> },

    #[error(transparent)]
    Slot(#[from] SlotError),
}

impl LaunchError {
    /// True when the launcher can no longer supervise anything.
    pub fn is_fatal(&self) -> bool {
        matches!(self, LaunchError::Spawn(ProcessError::ControlPlaneLost(_)))
    }
}

fn describe_exit(code: Option<i32>) -> String {
    match code {
        Some(code) => format!("status {code}"),
        None => "a signal".to_string(),
    }
}

impl<S, P, C> Launcher<S, P, C>
where
    S: JobStore,
    P: ProcessManager,
    C: Clock,
{
    /// Hand `job` to a new worker and bind it to `slot` once it attaches.
    ///
    /// On any failure the slot stays empty and the handoff is torn down.
    pub(crate) async fn launch(
        &mut self,
        slot: usize,
        job: &JobDescriptor,
    ) -> Result<u32, LaunchError> {
        // A late write from an abandoned worker must not be read as this run's outcome
        self.feedback.reset(slot)?;

        let envelope = HandoffEnvelope::new(slot, self.feedback.dir(), job.clone());
        let channel = HandoffChannel::create(&self.config.handoff_dir, &envelope)?;
        let request = SpawnRequest {
            handle: channel.handle().clone(),
            job_id: job.job_id,
            log_id: job.log_id,
            slot,
        };
        let mut process = self.processes.spawn(&request).map_err(LaunchError::Spawn)?;
        let pid = process.pid();

        if let Err(e) = self.await_startup(&channel, &mut process).await {
            if let Err(kill) = process.force_terminate() {
                warn!(pid, error = %kill, "failed to kill unconfirmed worker");
            }
            return Err(e);
        }
        drop(channel);

        let started_at_ms = self.clock.epoch_ms();
        self.slots.bind(
            slot,
            Occupant { pid, job_id: job.job_id, log_id: job.log_id, started_at_ms, process },
        )?;
        info!(
            job_id = %job.job_id,
            log_id = %job.log_id,
            slot,
            pid,
            worker = %job.worker_name(),
            "worker started"
        );

        if let Err(e) = self.store.record_run_start(job.job_id, job.log_id).await {
            warn!(
                job_id = %job.job_id,
                log_id = %job.log_id,
                error = %e,
                "failed to record run start"
            );
        }
        Ok(pid)
    }

    /// Wait for the worker to claim its handoff, exit, or run out of time.
    async fn await_startup(
        &self,
        channel: &HandoffChannel,
        process: &mut P::Process,
    ) -> Result<(), LaunchError> {
        let pid = process.pid();
        let timeout = self.tunables.startup_timeout;
        let deadline = Instant::now() + timeout;
        loop {
            if channel.is_attached() {
                return Ok(());
            }
            match process.poll_liveness().map_err(LaunchError::Spawn)? {
                Liveness::Alive => {}
                Liveness::Terminated(code) => {
                    return Err(LaunchError::ExitedDuringStartup { pid, code });
                }
            }
            if Instant::now() >= deadline {
                return Err(LaunchError::StartupTimeout { pid, timeout });
            }
            tokio::time::sleep(STARTUP_POLL).await;
        }
    }
}
