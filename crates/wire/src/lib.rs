// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Launcher ↔ worker IPC.
//!
//! - [`handoff`]: one-shot transfer of a job descriptor to a new worker
//! - [`feedback`]: per-slot outcome records read back by the launcher

pub mod feedback;
pub mod handoff;

pub use feedback::{FeedbackError, FeedbackTable};
pub use handoff::{
    attach, sweep_stale, HandoffChannel, HandoffEnvelope, HandoffError, HandoffHandle,
    HANDOFF_VERSION,
};
