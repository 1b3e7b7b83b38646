// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admission policy for due jobs.
//!
//! Non-parallel jobs are refused while a live worker already runs them, and
//! again while their most recent start falls in the current wall-clock
//! minute. Parallel jobs only need a free slot.

use ew_adapters::WorkerProcess;
use ew_core::JobDescriptor;

use super::slots::SlotTable;

/// Why a candidate was turned away for this poll
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Rejection {
    AlreadyRunning,
    StartedThisMinute,
}

ew_core::simple_display! {
    Rejection {
        AlreadyRunning => "already running",
        StartedThisMinute => "already started this minute",
    }
}

/// Outcome of evaluating one candidate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Admission {
    /// Launch into this slot
    Admit(usize),
    Reject(Rejection),
    /// No free slot; this and every later candidate wait for the next poll
    Deferred,
}

pub fn admit<P: WorkerProcess>(
    slots: &mut SlotTable<P>,
    job: &JobDescriptor,
    now_ms: u64,
) -> Admission {
    if !job.parallel {
        if slots.is_job_running(job.job_id) {
            return Admission::Reject(Rejection::AlreadyRunning);
        }
        if slots.started_in_minute_of(job.job_id, now_ms) {
            return Admission::Reject(Rejection::StartedThisMinute);
        }
    }
    match slots.find_free_slot() {
        Some(index) => Admission::Admit(index),
        None => Admission::Deferred,
    }
}

#[cfg(test)]
#[path = "admission_tests.rs"]
mod tests;
