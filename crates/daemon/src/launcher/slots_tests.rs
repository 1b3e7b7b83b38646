// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ew_adapters::{FakeProcess, FakeProcessManager, ProcessManager, SpawnRequest};
use ew_wire::HandoffHandle;

const T0: u64 = 1_700_000_040_000;

fn manager() -> FakeProcessManager {
    FakeProcessManager::new().without_attach()
}

fn occupant(manager: &FakeProcessManager, job: u32, started_at_ms: u64) -> Occupant<FakeProcess> {
    let request = SpawnRequest {
        handle: HandoffHandle::from("/unused.handoff"),
        job_id: JobId::new(job),
        log_id: LogId::new(job * 10),
        slot: 0,
    };
    let process = manager.spawn(&request).unwrap();
    Occupant {
        pid: process.pid(),
        job_id: request.job_id,
        log_id: request.log_id,
        started_at_ms,
        process,
    }
}

#[test]
fn free_slots_are_found_lowest_first() {
    let procs = manager();
    let mut table = SlotTable::new(3);
    assert_eq!(table.find_free_slot(), Some(0));

    table.bind(0, occupant(&procs, 1, T0)).unwrap();
    table.bind(2, occupant(&procs, 2, T0)).unwrap();
    assert_eq!(table.find_free_slot(), Some(1));

    table.bind(1, occupant(&procs, 3, T0)).unwrap();
    assert_eq!(table.find_free_slot(), None);
    assert_eq!(table.occupied_count(), 3);
}

#[test]
fn bind_rejects_occupied_and_out_of_range_slots() {
    let procs = manager();
    let mut table = SlotTable::new(1);
    table.bind(0, occupant(&procs, 1, T0)).unwrap();

    assert_eq!(table.bind(0, occupant(&procs, 2, T0)).unwrap_err(), SlotError::Occupied(0));
    assert_eq!(
        table.bind(1, occupant(&procs, 2, T0)).unwrap_err(),
        SlotError::OutOfRange { index: 1, capacity: 1 }
    );
    assert_eq!(table.get(0).map(|o| o.job_id), Some(JobId::new(1)));
}

#[test]
fn release_empties_the_slot_once() {
    let procs = manager();
    let mut table = SlotTable::new(2);
    table.bind(1, occupant(&procs, 5, T0)).unwrap();

    let released = table.release(1).unwrap();
    assert_eq!(released.job_id, JobId::new(5));
    assert!(table.is_free(1));
    assert_eq!(table.release(1).unwrap_err(), SlotError::Empty(1));
}

#[test]
fn running_job_requires_a_live_process() {
    let procs = manager();
    let mut table = SlotTable::new(2);
    let first = occupant(&procs, 7, T0);
    let pid = first.pid;
    table.bind(0, first).unwrap();

    assert!(table.is_job_running(JobId::new(7)));
    assert!(!table.is_job_running(JobId::new(8)));

    procs.exit(pid, 0);
    assert!(!table.is_job_running(JobId::new(7)));
}

#[test]
fn start_times_outlive_the_slot() {
    let procs = manager();
    let mut table = SlotTable::new(1);
    table.bind(0, occupant(&procs, 4, T0 + 1_000)).unwrap();
    table.release(0).unwrap();

    assert_eq!(table.last_started(JobId::new(4)), Some(T0 + 1_000));
    assert!(table.started_in_minute_of(JobId::new(4), T0 + 59_999));
    assert!(!table.started_in_minute_of(JobId::new(4), T0 + 60_000));
    assert!(!table.started_in_minute_of(JobId::new(5), T0));
}

#[test]
fn growing_adds_free_slots() {
    let procs = manager();
    let mut table = SlotTable::new(1);
    table.bind(0, occupant(&procs, 1, T0)).unwrap();

    table.resize(3);
    assert_eq!(table.capacity(), 3);
    assert_eq!(table.find_free_slot(), Some(1));
    table.bind(2, occupant(&procs, 2, T0)).unwrap();
}

#[test]
fn shrinking_never_evicts_a_running_worker() {
    let procs = manager();
    let mut table = SlotTable::new(3);
    table.bind(2, occupant(&procs, 9, T0)).unwrap();

    table.resize(1);
    assert_eq!(table.capacity(), 1);
    assert_eq!(table.occupied_count(), 1);
    assert_eq!(table.get(2).map(|o| o.job_id), Some(JobId::new(9)));
    assert_eq!(table.find_free_slot(), Some(0));
    assert!(table.bind(2, occupant(&procs, 1, T0)).is_err());

    table.release(2).unwrap();
    assert_eq!(table.occupied().count(), 0);
    assert_eq!(table.find_free_slot(), Some(0));
}

#[test]
fn occupied_iterates_in_index_order() {
    let procs = manager();
    let mut table = SlotTable::new(4);
    table.bind(3, occupant(&procs, 30, T0)).unwrap();
    table.bind(1, occupant(&procs, 10, T0)).unwrap();

    let indices: Vec<usize> = table.occupied().map(|(i, _)| i).collect();
    assert_eq!(indices, vec![1, 3]);
}
