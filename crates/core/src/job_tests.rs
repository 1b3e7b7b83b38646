// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;

#[test]
fn new_uses_defaults() {
    let job = JobDescriptor::new(JobId::new(4), LogId::new(40), Target::new("db"), "select 1");
    assert_eq!(job.timeout, DEFAULT_JOB_TIMEOUT);
    assert!(!job.parallel);
    assert_eq!(job.command, "select 1");
}

#[test]
fn builder_overrides_fields() {
    let job = JobDescriptor::builder()
        .job_id(JobId::new(9))
        .parallel(true)
        .command("vacuum")
        .build();
    assert_eq!(job.job_id, 9);
    assert!(job.parallel);
    assert_eq!(job.command, "vacuum");
}

#[yare::parameterized(
    empty       = { 0,                   true },
    at_limit    = { MAX_COMMAND_LEN,     true },
    over_limit  = { MAX_COMMAND_LEN + 1, false },
)]
fn validate_command_length(len: usize, ok: bool) {
    let job = JobDescriptor::builder().command("x".repeat(len)).build();
    assert_eq!(job.validate().is_ok(), ok);
}

#[test]
fn validate_reports_job_and_length() {
    let job = JobDescriptor::builder()
        .job_id(JobId::new(3))
        .command("y".repeat(MAX_COMMAND_LEN + 5))
        .build();
    assert_eq!(
        job.validate(),
        Err(DescriptorError::CommandTooLong { job_id: JobId::new(3), len: MAX_COMMAND_LEN + 5 })
    );
}

#[test]
fn worker_name_includes_job_id() {
    let job = JobDescriptor::builder().job_id(JobId::new(12)).build();
    assert_eq!(job.worker_name(), "worker 12");
}
