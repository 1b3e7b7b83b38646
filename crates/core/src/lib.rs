// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! ew-core: data model shared by the Elephant Worker launcher and its workers

pub mod macros;

pub mod clock;
pub mod duration;
pub mod feedback;
pub mod id;
pub mod job;
pub mod target;

#[cfg(any(test, feature = "test-support"))]
pub mod test_support;

pub use clock::{minute_of, Clock, FakeClock, SystemClock};
pub use duration::{format_duration, parse_duration};
pub use feedback::{
    status, truncate_utf8, FeedbackRecord, StatusCode, MAX_MESSAGE_LEN, MAX_STATUS_LEN,
};
pub use id::{JobId, LogId};
#[cfg(any(test, feature = "test-support"))]
pub use job::JobDescriptorBuilder;
pub use job::{DescriptorError, JobDescriptor, DEFAULT_JOB_TIMEOUT, MAX_COMMAND_LEN};
pub use target::Target;
