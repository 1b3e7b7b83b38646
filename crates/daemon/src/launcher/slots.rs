// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker slot table: which of the launcher's worker units are busy.
//!
//! A slot index is stable for the life of the launcher and doubles as the
//! worker's feedback table index. Slots beyond the current capacity linger
//! only while still occupied after a capacity reduction.

use std::collections::HashMap;

use ew_adapters::WorkerProcess;
use ew_core::{minute_of, JobId, LogId};
use thiserror::Error;

/// Errors from slot table transitions
#[derive(Debug, Error, PartialEq, Eq)]
pub enum SlotError {
    #[error("slot {index} is outside capacity {capacity}")]
    OutOfRange { index: usize, capacity: usize },

    #[error("slot {0} is already occupied")]
    Occupied(usize),

    #[error("slot {0} is empty")]
    Empty(usize),
}

/// A worker bound to a slot
#[derive(Debug)]
pub struct Occupant<P> {
    pub pid: u32,
    pub job_id: JobId,
    pub log_id: LogId,
    /// Epoch milliseconds at which start-up was confirmed
    pub started_at_ms: u64,
    pub process: P,
}

/// The launcher's bookkeeping of active workers
#[derive(Debug)]
pub struct SlotTable<P> {
    slots: Vec<Option<Occupant<P>>>,
    capacity: usize,
    /// Most recent start per job, kept after the slot is released
    last_started: HashMap<JobId, u64>,
}

impl<P: WorkerProcess> SlotTable<P> {
    pub fn new(capacity: usize) -> Self {
        Self {
            slots: std::iter::repeat_with(|| None).take(capacity).collect(),
            capacity,
            last_started: HashMap::new(),
        }
    }

    pub fn capacity(&self) -> usize {
        self.capacity
    }

    /// Lowest-index empty slot below capacity.
    pub fn find_free_slot(&self) -> Option<usize> {
        (0..self.capacity).find(|&index| self.is_free(index))
    }

    pub fn is_free(&self, index: usize) -> bool {
        matches!(self.slots.get(index), Some(None) | None)
    }

    /// True if an occupied slot runs `job_id` and its process is alive.
    ///
    /// A process whose liveness cannot be determined counts as alive.
    pub fn is_job_running(&mut self, job_id: JobId) -> bool {
        self.slots.iter_mut().enumerate().any(|(index, slot)| {
            let Some(occupant) = slot else {
                return false;
            };
            if occupant.job_id != job_id {
                return false;
            }
            match occupant.process.poll_liveness() {
                Ok(liveness) => liveness.is_alive(),
                Err(e) => {
                    tracing::warn!(
                        slot = index,
                        pid = occupant.pid,
                        error = %e,
                        "liveness unknown"
                    );
                    true
                }
            }
        })
    }

    /// Transition slot `index` from empty to occupied.
    pub fn bind(&mut self, index: usize, occupant: Occupant<P>) -> Result<(), SlotError> {
        if index >= self.capacity {
            return Err(SlotError::OutOfRange { index, capacity: self.capacity });
        }
        let slot = &mut self.slots[index];
        if slot.is_some() {
            return Err(SlotError::Occupied(index));
        }
        self.last_started.insert(occupant.job_id, occupant.started_at_ms);
        *slot = Some(occupant);
        Ok(())
    }

    /// Transition slot `index` back to empty, returning its occupant.
    ///
    /// Only call once the process is confirmed terminated and its feedback
    /// has been consumed.
    pub fn release(&mut self, index: usize) -> Result<Occupant<P>, SlotError> {
        let occupant =
            self.slots.get_mut(index).and_then(Option::take).ok_or(SlotError::Empty(index))?;
        self.trim();
        Ok(occupant)
    }

    /// Change capacity. Occupied slots beyond the new capacity stay until released.
    pub fn resize(&mut self, capacity: usize) {
        if self.slots.len() < capacity {
            self.slots.resize_with(capacity, || None);
        }
        self.capacity = capacity;
        self.trim();
    }

    pub fn get(&self, index: usize) -> Option<&Occupant<P>> {
        self.slots.get(index).and_then(Option::as_ref)
    }

    pub fn occupied(&self) -> impl Iterator<Item = (usize, &Occupant<P>)> {
        self.slots.iter().enumerate().filter_map(|(i, s)| s.as_ref().map(|o| (i, o)))
    }

    pub fn occupied_mut(&mut self) -> impl Iterator<Item = (usize, &mut Occupant<P>)> {
        self.slots.iter_mut().enumerate().filter_map(|(i, s)| s.as_mut().map(|o| (i, o)))
    }

    pub fn occupied_count(&self) -> usize {
        self.slots.iter().filter(|s| s.is_some()).count()
    }

    pub fn last_started(&self, job_id: JobId) -> Option<u64> {
        self.last_started.get(&job_id).copied()
    }

    /// True if `job_id` was started during the wall-clock minute containing `now_ms`.
    pub fn started_in_minute_of(&self, job_id: JobId, now_ms: u64) -> bool {
        self.last_started(job_id).is_some_and(|t| minute_of(t) == minute_of(now_ms))
    }

    /// Drop trailing slots that are beyond capacity and empty.
    fn trim(&mut self) {
        while self.slots.len() > self.capacity && matches!(self.slots.last(), Some(None)) {
            self.slots.pop();
        }
    }
}

#[cfg(test)]
#[path = "slots_tests.rs"]
mod tests;
