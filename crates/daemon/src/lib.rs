// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Elephant Worker daemon library
//!
//! The `ewd` binary is a thin shell over these modules: the launcher control
//! loop, the worker entry point, and the settings and lifecycle plumbing
//! they share.

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]

pub mod env;
pub mod launcher;
pub mod lifecycle;
pub mod settings;
pub mod worker;

pub use launcher::{
    spawn_signal_listener, DrainReport, Launcher, LauncherConfig, LauncherDeps, LauncherError,
    LauncherEvent, LauncherExit, PollSummary,
};
pub use lifecycle::{Config, LauncherLock, LifecycleError};
pub use settings::{Settings, SettingsError, SettingsSource, Tunables};
pub use worker::run_worker;
