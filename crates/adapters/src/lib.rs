// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

//! Adapters for the launcher's external collaborators

pub mod exec;
pub mod process;
pub mod store;

pub use exec::{run_with_timeout, ExecError, ExecOutcome, Executor, ShellExecutor};
pub use process::{
    LocalProcess, LocalProcessManager, Liveness, ProcessError, ProcessManager, SpawnRequest,
    WorkerProcess,
};
pub use store::{JobStore, StoreError, TomlJobStore};

#[cfg(any(test, feature = "test-support"))]
pub use exec::FakeExecutor;
#[cfg(any(test, feature = "test-support"))]
pub use process::{FakeProcess, FakeProcessManager};
#[cfg(any(test, feature = "test-support"))]
pub use store::FakeJobStore;
