// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared test helpers for use across crates.
//!
//! Gated behind `#[cfg(any(test, feature = "test-support"))]`.

use crate::{JobDescriptor, JobId, LogId};

// ── Proptest strategies ─────────────────────────────────────────────────

pub mod strategies {
    use crate::{JobDescriptor, JobId, LogId, Target, MAX_COMMAND_LEN};
    use proptest::prelude::*;
    use std::time::Duration;

    pub fn arb_target() -> impl Strategy<Value = Target> {
        ("[a-z_]{1,16}", proptest::option::of("[a-z_]{1,16}"), proptest::option::of("[a-z_]{1,16}"))
            .prop_map(|(database, role, schema)| Target { database, role, schema })
    }

    /// Commands of arbitrary unicode text, short enough to keep cases fast.
    pub fn arb_command() -> impl Strategy<Value = String> {
        prop_oneof![
            Just(String::new()),
            ".{1,256}",
            Just("z".repeat(MAX_COMMAND_LEN)),
        ]
    }

    pub fn arb_descriptor() -> impl Strategy<Value = JobDescriptor> {
        (any::<u32>(), any::<u32>(), 0u64..86_400_000, any::<bool>(), arb_target(), arb_command())
            .prop_map(|(job_id, log_id, timeout_ms, parallel, target, command)| JobDescriptor {
                job_id: JobId::new(job_id),
                log_id: LogId::new(log_id),
                timeout: Duration::from_millis(timeout_ms),
                parallel,
                target,
                command,
            })
    }
}

// ── Descriptor factories ────────────────────────────────────────────────

/// A non-parallel job with the given id and a run id derived from it.
pub fn job(id: u32) -> JobDescriptor {
    JobDescriptor::builder()
        .job_id(JobId::new(id))
        .log_id(LogId::new(id.wrapping_mul(100)))
        .command(format!("echo job-{id}"))
        .build()
}

/// Like [`job`] but allowed to run concurrently with itself.
pub fn parallel_job(id: u32) -> JobDescriptor {
    JobDescriptor { parallel: true, ..job(id) }
}
