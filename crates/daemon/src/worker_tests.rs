// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ew_adapters::FakeExecutor;
use ew_core::test_support::job;
use ew_core::JobDescriptor;
use ew_wire::{HandoffChannel, HandoffEnvelope};
use std::future::pending;
use std::time::Duration;
use tempfile::TempDir;
use yare::parameterized;

/// A launcher-side handoff for `job` in slot 0, plus its feedback table.
struct Fixture {
    _dir: TempDir,
    channel: HandoffChannel,
    feedback: FeedbackTable,
}

fn fixture(job: JobDescriptor) -> Fixture {
    let dir = TempDir::new().unwrap();
    let feedback = FeedbackTable::create(dir.path().join("feedback"), 1).unwrap();
    let envelope = HandoffEnvelope::new(0, feedback.dir(), job);
    let channel = HandoffChannel::create(dir.path(), &envelope).unwrap();
    Fixture { _dir: dir, channel, feedback }
}

#[tokio::test]
async fn success_is_recorded_and_exits_zero() {
    let fx = fixture(job(7));
    let executor = FakeExecutor::new();
    executor.push_result(Ok(ExecOutcome::ok("vacuumed 3 tables")));

    let code = run_worker(fx.channel.handle(), &executor, pending()).await;

    assert_eq!(code, 0);
    assert_eq!(executor.calls(), vec![job(7)]);
    assert_eq!(
        fx.feedback.try_read_and_consume(0).unwrap(),
        Some(FeedbackRecord::new(0, status::OK, "vacuumed 3 tables"))
    );
    assert!(fx.channel.is_attached());
}

#[parameterized(
    failed = { ExecError::Failed { exit_code: 3, stderr: "boom".into() }, 3, status::ERR },
    failed_out_of_range = {
        ExecError::Failed { exit_code: 300, stderr: "boom".into() }, 1, status::ERR
    },
    failed_negative = {
        ExecError::Failed { exit_code: -1, stderr: "boom".into() }, 1, status::ERR
    },
    timeout = { ExecError::Timeout(Duration::from_secs(600)), 1, status::TIMEOUT },
    spawn = { ExecError::Spawn("bash: not found".into()), 1, status::EXEC },
)]
fn failures_are_recorded(error: ExecError, exit: i32, expected_status: &str) {
    let fx = fixture(job(1));
    let executor = FakeExecutor::new();
    executor.push_result(Err(error.clone()));

    let runtime = tokio::runtime::Builder::new_current_thread().enable_all().build().unwrap();
    let code = runtime.block_on(run_worker(fx.channel.handle(), &executor, pending()));

    assert_eq!(code, exit);
    let record = fx.feedback.try_read_and_consume(0).unwrap().unwrap();
    assert_eq!(record, feedback_for(Err(error)));
    assert_eq!(record.status.as_str(), expected_status);
}

#[test]
fn failure_feedback_carries_the_cause() {
    let error = ExecError::Failed { exit_code: 4, stderr: "no such table".into() };
    let failed = feedback_for(Err(error));
    assert_eq!(failed, FeedbackRecord::new(4, status::ERR, "no such table"));

    let timeout = feedback_for(Err(ExecError::Timeout(Duration::from_secs(600))));
    assert_eq!(timeout.message, "command timed out after 10m");
}

#[tokio::test]
async fn termination_abandons_the_job() {
    let fx = fixture(job(2));
    let executor = FakeExecutor::new();
    executor.set_delay(Duration::from_secs(60));

    let code = run_worker(fx.channel.handle(), &executor, async {}).await;

    assert_eq!(code, TERMINATED_EXIT);
    let record = fx.feedback.try_read_and_consume(0).unwrap().unwrap();
    assert_eq!(record.exit_code, TERMINATED_EXIT);
    assert_eq!(record.status.as_str(), status::TERMINATED);
}

#[tokio::test]
async fn missing_handoff_exits_without_feedback() {
    let fx = fixture(job(3));
    let executor = FakeExecutor::new();
    ew_wire::attach(fx.channel.handle()).unwrap();

    let code = run_worker(fx.channel.handle(), &executor, pending()).await;

    assert_eq!(code, NO_FEEDBACK_EXIT);
    assert!(executor.calls().is_empty());
    assert_eq!(fx.feedback.try_read_and_consume(0).unwrap(), None);
}

#[tokio::test]
async fn unwritable_feedback_exits_two() {
    let fx = fixture(job(4));
    fx.feedback.write(0, 0, status::OK, "unread").unwrap();
    let executor = FakeExecutor::new();

    let code = run_worker(fx.channel.handle(), &executor, pending()).await;

    assert_eq!(code, NO_FEEDBACK_EXIT);
    assert_eq!(executor.calls().len(), 1);
}
