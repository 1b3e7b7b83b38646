// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Launcher control loop.
//!
//! One [`Launcher`] owns the slot table and the feedback table. It wakes on
//! the poll interval or on a [`LauncherEvent`], and on each wake handles, in
//! order: control-plane loss, shutdown, reload, reaping, and polling the job
//! store for due work.

mod admission;
mod drain;
mod event;
mod reap;
mod slots;
mod spawn;

pub use admission::{admit, Admission, Rejection};
pub use drain::DrainReport;
pub use event::{spawn_signal_listener, LauncherEvent};
pub use reap::ReapedWorker;
pub use slots::{Occupant, SlotError, SlotTable};
pub use spawn::LaunchError;

use std::path::PathBuf;

use ew_adapters::{JobStore, ProcessManager};
use ew_core::{format_duration, Clock};
use ew_wire::{FeedbackError, FeedbackTable};
use thiserror::Error;
use tokio::sync::mpsc::{self, error::TryRecvError};
use tokio::time::{interval, interval_at, Instant, Interval, MissedTickBehavior};
use tracing::{error, info, warn};

use crate::settings::{SettingsSource, Tunables};
use event::Pending;

/// Errors that stop a launcher operation
#[derive(Debug, Error)]
pub enum LauncherError {
    #[error(transparent)]
    Feedback(#[from] FeedbackError),

    #[error(transparent)]
    Slot(#[from] SlotError),

    #[error("lost control plane: {0}")]
    ControlPlaneLost(String),
}

/// Launcher adapter dependencies
pub struct LauncherDeps<S, P> {
    pub store: S,
    pub processes: P,
}

/// Launcher path configuration
#[derive(Debug, Clone)]
pub struct LauncherConfig {
    pub handoff_dir: PathBuf,
    pub feedback_dir: PathBuf,
    /// Re-read on reload; `None` keeps the initial tunables for good
    pub settings: Option<SettingsSource>,
}

/// Counts from one poll of the job store
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct PollSummary {
    pub admitted: usize,
    pub rejected: usize,
    pub failed: usize,
    pub deferred: usize,
}

/// Why the control loop stopped
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LauncherExit {
    Drained(DrainReport),
    ControlPlaneLost(String),
}

impl LauncherExit {
    /// Process exit status: clean only if every worker stopped on request.
    pub fn exit_code(&self) -> i32 {
        match self {
            LauncherExit::Drained(report) if report.forced == 0 => 0,
            LauncherExit::Drained(_) => 1,
            LauncherExit::ControlPlaneLost(_) => 1,
        }
    }
}

/// The scheduler process
pub struct Launcher<S, P: ProcessManager, C> {
    store: S,
    processes: P,
    clock: C,
    config: LauncherConfig,
    tunables: Tunables,
    slots: SlotTable<P::Process>,
    feedback: FeedbackTable,
}

impl<S, P, C> Launcher<S, P, C>
where
    S: JobStore,
    P: ProcessManager,
    C: Clock,
{
    /// Create a launcher, (re)initializing every feedback slot.
    pub fn new(
        deps: LauncherDeps<S, P>,
        config: LauncherConfig,
        tunables: Tunables,
        clock: C,
    ) -> Result<Self, LauncherError> {
        let feedback = FeedbackTable::create(&config.feedback_dir, tunables.capacity)?;
        Ok(Self {
            store: deps.store,
            processes: deps.processes,
            clock,
            config,
            tunables,
            slots: SlotTable::new(tunables.capacity),
            feedback,
        })
    }

    pub fn tunables(&self) -> Tunables {
        self.tunables
    }

    pub fn slots(&self) -> &SlotTable<P::Process> {
        &self.slots
    }

    /// Run until shutdown or control-plane loss.
    ///
    /// A closed event channel counts as a shutdown request.
    pub async fn run(mut self, mut events: mpsc::Receiver<LauncherEvent>) -> LauncherExit {
        let mut ticker = poll_ticker(self.tunables, false);
        info!(
            capacity = self.tunables.capacity,
            poll_interval = %format_duration(self.tunables.poll_interval),
            "launcher running"
        );

        loop {
            let mut pending = Pending::default();
            tokio::select! {
                _ = ticker.tick() => pending.tick = true,
                event = events.recv() => match event {
                    Some(event) => pending.note(event),
                    None => pending.shutdown = true,
                },
            }
            loop {
                match events.try_recv() {
                    Ok(event) => pending.note(event),
                    Err(TryRecvError::Empty) => break,
                    Err(TryRecvError::Disconnected) => {
                        pending.shutdown = true;
                        break;
                    }
                }
            }

            if !self.processes.control_plane_alive() {
                return self.abandon("process supervisor is gone".to_string());
            }
            if pending.shutdown {
                return LauncherExit::Drained(self.drain().await);
            }
            if pending.reload {
                let before = self.tunables.poll_interval;
                self.reload().await;
                if self.tunables.poll_interval != before {
                    ticker = poll_ticker(self.tunables, true);
                }
            }
            if pending.child_exited || pending.tick {
                self.reap();
            }
            if pending.tick {
                match self.poll().await {
                    Ok(_) => {}
                    Err(LauncherError::ControlPlaneLost(reason)) => return self.abandon(reason),
                    Err(e) => error!(error = %e, "poll failed"),
                }
            }
        }
    }

    /// Query the job store once and launch whatever admission allows.
    ///
    /// A store failure skips the poll. Only control-plane loss is an error.
    pub async fn poll(&mut self) -> Result<PollSummary, LauncherError> {
        let mut summary = PollSummary::default();
        let due = match self.store.due_jobs().await {
            Ok(due) => due,
            Err(e) => {
                warn!(error = %e, "job store query failed, skipping poll");
                return Ok(summary);
            }
        };

        for (position, job) in due.iter().enumerate() {
            match admit(&mut self.slots, job, self.clock.epoch_ms()) {
                Admission::Reject(reason) => {
                    warn!(job_id = %job.job_id, log_id = %job.log_id, %reason, "job not admitted");
                    summary.rejected += 1;
                }
                Admission::Deferred => {
                    summary.deferred = due.len() - position;
                    info!(
                        deferred = summary.deferred,
                        capacity = self.slots.capacity(),
                        "no free worker slot, deferring to next poll"
                    );
                    break;
                }
                Admission::Admit(slot) => match self.launch(slot, job).await {
                    Ok(_) => summary.admitted += 1,
                    Err(e) if e.is_fatal() => {
                        return Err(LauncherError::ControlPlaneLost(e.to_string()));
                    }
                    Err(e) => {
                        warn!(
                            job_id = %job.job_id,
                            log_id = %job.log_id,
                            slot,
                            error = %e,
                            "failed to start worker"
                        );
                        summary.failed += 1;
                    }
                },
            }
        }
        Ok(summary)
    }

    /// Re-read settings and job definitions without touching running workers.
    pub async fn reload(&mut self) {
        match self.config.settings.as_ref().map(SettingsSource::load) {
            Some(Ok(settings)) => self.apply_tunables(settings.tunables),
            Some(Err(e)) => warn!(error = %e, "keeping previous settings"),
            None => {}
        }
        if let Err(e) = self.store.reload().await {
            warn!(error = %e, "job store reload failed");
        }
    }

    fn apply_tunables(&mut self, next: Tunables) {
        if next.capacity != self.tunables.capacity {
            self.resize(next.capacity);
        }
        self.tunables = next;
        info!(
            capacity = next.capacity,
            poll_interval = %format_duration(next.poll_interval),
            startup_timeout = %format_duration(next.startup_timeout),
            drain_timeout = %format_duration(next.drain_timeout),
            "settings applied"
        );
    }

    /// Resize slots and their feedback files. Occupied slots are never touched.
    fn resize(&mut self, capacity: usize) {
        let previous = self.slots.capacity();
        self.slots.resize(capacity);

        let (range, growing) = if capacity > previous {
            (previous..capacity, true)
        } else {
            (capacity..previous, false)
        };
        for index in range.filter(|&index| self.slots.is_free(index)) {
            let result =
                if growing { self.feedback.reset(index) } else { self.feedback.remove_slot(index) };
            if let Err(e) = result {
                warn!(slot = index, error = %e, "failed to resize feedback table");
            }
        }
    }

    fn abandon(&self, reason: String) -> LauncherExit {
        error!(
            %reason,
            workers = self.slots.occupied_count(),
            "control plane lost, exiting without draining"
        );
        LauncherExit::ControlPlaneLost(reason)
    }
}

fn poll_ticker(tunables: Tunables, delay_first: bool) -> Interval {
    let period = tunables.poll_interval;
    let mut ticker =
        if delay_first { interval_at(Instant::now() + period, period) } else { interval(period) };
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
    ticker
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
