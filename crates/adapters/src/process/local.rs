// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker processes spawned on the local host.

use super::{Liveness, ProcessError, ProcessManager, SpawnRequest, WorkerProcess};
use nix::errno::Errno;
use nix::sys::signal::{self, Signal};
use nix::unistd::{getppid, Pid};
use std::ffi::OsString;
use std::path::PathBuf;
use std::process::Stdio;
use tokio::process::{Child, Command};

/// Spawns `<program> <args...> <handoff handle>` for each worker.
///
/// Must be used from within a tokio runtime.
#[derive(Debug, Clone)]
pub struct LocalProcessManager {
    program: PathBuf,
    args: Vec<OsString>,
    /// Parent pid recorded at startup when parent watching is on
    parent: Option<i32>,
}

impl LocalProcessManager {
    pub fn new(program: impl Into<PathBuf>) -> Self {
        Self { program: program.into(), args: Vec::new(), parent: None }
    }

    /// Re-run the current executable as `<exe> worker <handle>`.
    pub fn current_exe() -> std::io::Result<Self> {
        Ok(Self::new(std::env::current_exe()?).with_args(["worker"]))
    }

    /// Arguments placed before the handoff handle
    pub fn with_args<I, S>(mut self, args: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<OsString>,
    {
        self.args = args.into_iter().map(Into::into).collect();
        self
    }

    /// Treat a change of parent process as loss of the control plane.
    pub fn watch_parent(mut self) -> Self {
        self.parent = Some(getppid().as_raw());
        self
    }
}

impl ProcessManager for LocalProcessManager {
    type Process = LocalProcess;

    fn spawn(&self, request: &SpawnRequest) -> Result<LocalProcess, ProcessError> {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args).arg(request.handle.path()).stdin(Stdio::null());
        // Own process group: a terminal Ctrl-C reaches the launcher, which drains
        cmd.process_group(0);

        let child =
            cmd.spawn().map_err(|source| ProcessError::Spawn { job_id: request.job_id, source })?;
        let pid = child.id().unwrap_or_default();
        tracing::debug!(
            pid,
            job_id = %request.job_id,
            log_id = %request.log_id,
            slot = request.slot,
            "spawned worker process"
        );
        Ok(LocalProcess { pid, child })
    }

    fn control_plane_alive(&self) -> bool {
        match self.parent {
            Some(parent) => getppid().as_raw() == parent,
            None => true,
        }
    }
}

/// A child process of this launcher
#[derive(Debug)]
pub struct LocalProcess {
    pid: u32,
    child: Child,
}

impl LocalProcess {
    /// Once reaped the pid may belong to another process
    fn reaped(&self) -> bool {
        self.child.id().is_none()
    }
}

impl WorkerProcess for LocalProcess {
    fn pid(&self) -> u32 {
        self.pid
    }

    fn poll_liveness(&mut self) -> Result<Liveness, ProcessError> {
        match self.child.try_wait() {
            Ok(Some(status)) => Ok(Liveness::Terminated(status.code())),
            Ok(None) => Ok(Liveness::Alive),
            Err(source) => Err(ProcessError::Io { pid: self.pid, source }),
        }
    }

    fn request_termination(&mut self) -> Result<(), ProcessError> {
        if self.reaped() {
            return Ok(());
        }
        let Ok(raw) = i32::try_from(self.pid) else {
            return Ok(());
        };
        match signal::kill(Pid::from_raw(raw), Signal::SIGTERM) {
            Ok(()) | Err(Errno::ESRCH) => Ok(()),
            Err(source) => Err(ProcessError::Signal { pid: self.pid, source }),
        }
    }

    fn force_terminate(&mut self) -> Result<(), ProcessError> {
        if self.reaped() {
            return Ok(());
        }
        self.child.start_kill().map_err(|source| ProcessError::Io { pid: self.pid, source })
    }
}

#[cfg(test)]
#[path = "local_tests.rs"]
mod tests;
