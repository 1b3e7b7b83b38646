// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Process manager adapter: spawns and supervises worker processes

mod local;

pub use local::{LocalProcess, LocalProcessManager};

use ew_core::{JobId, LogId};
use ew_wire::HandoffHandle;
use std::io;
use thiserror::Error;

/// Errors from process manager operations
#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("failed to spawn worker for job {job_id}: {source}")]
    Spawn {
        job_id: JobId,
        #[source]
        source: io::Error,
    },

    #[error("spawn refused for job {job_id}: {reason}")]
    Refused { job_id: JobId, reason: String },

    /// The supervisor that owns this launcher is gone; continuing is unsafe.
    #[error("lost contact with the process supervisor: {0}")]
    ControlPlaneLost(String),

    #[error("failed to signal worker {pid}: {source}")]
    Signal {
        pid: u32,
        #[source]
        source: nix::errno::Errno,
    },

    #[error("I/O error on worker {pid}: {source}")]
    Io {
        pid: u32,
        #[source]
        source: io::Error,
    },
}

/// What the launcher asks the process manager to start.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SpawnRequest {
    pub handle: HandoffHandle,
    pub job_id: JobId,
    pub log_id: LogId,
    pub slot: usize,
}

/// Observed state of a worker process
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Liveness {
    Alive,
    /// Exited; the exit code is absent when a signal ended the process
    Terminated(Option<i32>),
}

impl Liveness {
    pub fn is_alive(self) -> bool {
        matches!(self, Liveness::Alive)
    }
}

/// Handle on one spawned worker
pub trait WorkerProcess: Send + 'static {
    fn pid(&self) -> u32;

    /// Check whether the process is still running, reaping it if it exited.
    fn poll_liveness(&mut self) -> Result<Liveness, ProcessError>;

    /// Ask the worker to stop (SIGTERM).
    fn request_termination(&mut self) -> Result<(), ProcessError>;

    /// Stop the worker without its cooperation (SIGKILL).
    fn force_terminate(&mut self) -> Result<(), ProcessError>;
}

/// Adapter that creates worker processes
pub trait ProcessManager: Send + Sync + 'static {
    type Process: WorkerProcess;

    fn spawn(&self, request: &SpawnRequest) -> Result<Self::Process, ProcessError>;

    /// False once the launcher can no longer safely supervise children.
    fn control_plane_alive(&self) -> bool {
        true
    }
}

#[cfg(any(test, feature = "test-support"))]
#[cfg_attr(coverage_nightly, coverage(off))]
mod fake {
    use super::{Liveness, ProcessError, ProcessManager, SpawnRequest, WorkerProcess};
    use ew_wire::HandoffEnvelope;
    use parking_lot::Mutex;
    use std::collections::{HashMap, VecDeque};
    use std::sync::Arc;

    const FIRST_PID: u32 = 4000;
    const SIGTERM_EXIT: i32 = 143;

    #[derive(Debug)]
    enum SpawnFailure {
        Refused,
        ControlPlaneLost,
    }

    #[derive(Debug, Default)]
    struct FakeProc {
        exit: Option<Option<i32>>,
        term_requests: usize,
        killed: bool,
    }

    #[derive(Debug)]
    struct FakeProcessState {
        next_pid: u32,
        attach_on_spawn: bool,
        exit_on_termination: bool,
        control_plane_alive: bool,
        failures: VecDeque<SpawnFailure>,
        spawns: Vec<SpawnRequest>,
        envelopes: Vec<HandoffEnvelope>,
        procs: HashMap<u32, FakeProc>,
    }

    /// Fake process manager for testing.
    ///
    /// By default every spawn claims its handoff immediately, as a real
    /// worker would on start-up, and processes exit when asked to.
    #[derive(Debug, Clone)]
    pub struct FakeProcessManager {
        inner: Arc<Mutex<FakeProcessState>>,
    }

    impl Default for FakeProcessManager {
        fn default() -> Self {
            Self {
                inner: Arc::new(Mutex::new(FakeProcessState {
                    next_pid: FIRST_PID,
                    attach_on_spawn: true,
                    exit_on_termination: true,
                    control_plane_alive: true,
                    failures: VecDeque::new(),
                    spawns: Vec::new(),
                    envelopes: Vec::new(),
                    procs: HashMap::new(),
                })),
            }
        }
    }

    impl FakeProcessManager {
        pub fn new() -> Self {
            Self::default()
        }

        /// Spawned processes never claim their handoff (start-up hangs)
        pub fn without_attach(self) -> Self {
            self.inner.lock().attach_on_spawn = false;
            self
        }

        /// Processes ignore SIGTERM and only stop when killed
        pub fn ignore_termination(self) -> Self {
            self.inner.lock().exit_on_termination = false;
            self
        }

        pub fn fail_next_spawn(&self) {
            self.inner.lock().failures.push_back(SpawnFailure::Refused);
        }

        pub fn lose_control_plane_on_next_spawn(&self) {
            self.inner.lock().failures.push_back(SpawnFailure::ControlPlaneLost);
        }

        pub fn set_control_plane_alive(&self, alive: bool) {
            self.inner.lock().control_plane_alive = alive;
        }

        /// Make process `pid` exit with `code`
        pub fn exit(&self, pid: u32, code: i32) {
            if let Some(proc) = self.inner.lock().procs.get_mut(&pid) {
                proc.exit = Some(Some(code));
            }
        }

        pub fn spawns(&self) -> Vec<SpawnRequest> {
            self.inner.lock().spawns.clone()
        }

        /// Envelopes claimed on behalf of spawned processes
        pub fn envelopes(&self) -> Vec<HandoffEnvelope> {
            self.inner.lock().envelopes.clone()
        }

        /// Pids of processes that have not exited, in ascending order
        pub fn alive_pids(&self) -> Vec<u32> {
            let inner = self.inner.lock();
            let mut pids: Vec<u32> = inner
                .procs
                .iter()
                .filter(|(_, p)| p.exit.is_none())
                .map(|(pid, _)| *pid)
                .collect();
            pids.sort_unstable();
            pids
        }

        pub fn termination_requests(&self, pid: u32) -> usize {
            self.inner.lock().procs.get(&pid).map_or(0, |p| p.term_requests)
        }

        pub fn was_killed(&self, pid: u32) -> bool {
            self.inner.lock().procs.get(&pid).is_some_and(|p| p.killed)
        }
    }

    impl ProcessManager for FakeProcessManager {
        type Process = FakeProcess;

        fn spawn(&self, request: &SpawnRequest) -> Result<FakeProcess, ProcessError> {
            let mut inner = self.inner.lock();
            match inner.failures.pop_front() {
                Some(SpawnFailure::Refused) => {
                    return Err(ProcessError::Refused {
                        job_id: request.job_id,
                        reason: "injected failure".to_string(),
                    })
                }
                Some(SpawnFailure::ControlPlaneLost) => {
                    return Err(ProcessError::ControlPlaneLost("injected failure".to_string()))
                }
                None => {}
            }

            let pid = inner.next_pid;
            inner.next_pid += 1;
            inner.spawns.push(request.clone());

            let mut proc = FakeProc::default();
            if inner.attach_on_spawn {
                match ew_wire::attach(&request.handle) {
                    Ok(envelope) => inner.envelopes.push(envelope),
                    // A real worker exits 2 when it has nothing to run
                    Err(_) => proc.exit = Some(Some(2)),
                }
            }
            inner.procs.insert(pid, proc);
            Ok(FakeProcess { pid, inner: Arc::clone(&self.inner) })
        }

        fn control_plane_alive(&self) -> bool {
            self.inner.lock().control_plane_alive
        }
    }

    /// Process handle issued by [`FakeProcessManager`]
    #[derive(Debug)]
    pub struct FakeProcess {
        pid: u32,
        inner: Arc<Mutex<FakeProcessState>>,
    }

    impl WorkerProcess for FakeProcess {
        fn pid(&self) -> u32 {
            self.pid
        }

        fn poll_liveness(&mut self) -> Result<Liveness, ProcessError> {
            let inner = self.inner.lock();
            match inner.procs.get(&self.pid).and_then(|p| p.exit) {
                Some(code) => Ok(Liveness::Terminated(code)),
                None => Ok(Liveness::Alive),
            }
        }

        fn request_termination(&mut self) -> Result<(), ProcessError> {
            let mut inner = self.inner.lock();
            let exit_on_termination = inner.exit_on_termination;
            if let Some(proc) = inner.procs.get_mut(&self.pid) {
                proc.term_requests += 1;
                if exit_on_termination && proc.exit.is_none() {
                    proc.exit = Some(Some(SIGTERM_EXIT));
                }
            }
            Ok(())
        }

        fn force_terminate(&mut self) -> Result<(), ProcessError> {
            if let Some(proc) = self.inner.lock().procs.get_mut(&self.pid) {
                if proc.exit.is_none() {
                    proc.killed = true;
                    proc.exit = Some(None);
                }
            }
            Ok(())
        }
    }
}

#[cfg(any(test, feature = "test-support"))]
pub use fake::{FakeProcess, FakeProcessManager};

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
