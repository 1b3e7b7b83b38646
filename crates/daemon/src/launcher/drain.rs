// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Graceful shutdown of all running workers.

use std::time::Duration;

use ew_adapters::{JobStore, ProcessManager, WorkerProcess};
use ew_core::{format_duration, Clock};
use tokio::time::Instant;
use tracing::{info, warn};

use super::Launcher;

const DRAIN_POLL: Duration = Duration::from_millis(20);

/// How long force-killed workers get to be reaped
const KILL_GRACE: Duration = Duration::from_secs(1);

/// What happened during a drain
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct DrainReport {
    /// Workers running when the drain began
    pub workers: usize,
    /// Workers that ignored the termination request and were killed
    pub forced: usize,
    /// Workers still unreaped when the launcher gave up
    pub abandoned: usize,
}

impl<S, P, C> Launcher<S, P, C>
where
    S: JobStore,
    P: ProcessManager,
    C: Clock,
{
    /// Ask every worker to stop, wait up to `drain_timeout`, then kill the rest.
    pub async fn drain(&mut self) -> DrainReport {
        let mut report = DrainReport { workers: self.slots.occupied_count(), ..Default::default() };
        if report.workers == 0 {
            info!("no workers running, shutting down");
            return report;
        }

        let timeout = self.tunables.drain_timeout;
        info!(workers = report.workers, timeout = %format_duration(timeout), "draining workers");
        for (slot, occupant) in self.slots.occupied_mut() {
            if let Err(e) = occupant.process.request_termination() {
                warn!(slot, pid = occupant.pid, error = %e, "failed to request termination");
            }
        }

        if !self.reap_until_empty(Instant::now() + timeout).await {
            for (slot, occupant) in self.slots.occupied_mut() {
                warn!(
                    slot,
                    pid = occupant.pid,
                    job_id = %occupant.job_id,
                    "worker ignored termination request, killing"
                );
                if let Err(e) = occupant.process.force_terminate() {
                    warn!(slot, pid = occupant.pid, error = %e, "failed to kill worker");
                }
                report.forced += 1;
            }
            self.reap_until_empty(Instant::now() + KILL_GRACE).await;
        }

        report.abandoned = self.slots.occupied_count();
        info!(forced = report.forced, abandoned = report.abandoned, "drain complete");
        report
    }

    /// Reap until no slot is occupied or `deadline` passes. True if emptied.
    async fn reap_until_empty(&mut self, deadline: Instant) -> bool {
        loop {
            self.reap();
            if self.slots.occupied_count() == 0 {
                return true;
            }
            if Instant::now() >= deadline {
                return false;
            }
            tokio::time::sleep(DRAIN_POLL).await;
        }
    }
}
