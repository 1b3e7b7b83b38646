// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! End-to-end checks against the real `ewd` binary.

use std::path::{Path, PathBuf};
use std::process::{Child, Command as StdCommand, Stdio};
use std::time::{Duration, Instant};

use assert_cmd::Command;
use tempfile::TempDir;

const WAIT_MAX: Duration = Duration::from_secs(15);

/// A state directory for one `ewd` invocation.
struct StateDir {
    dir: TempDir,
}

impl StateDir {
    fn new() -> Self {
        Self { dir: TempDir::new().unwrap() }
    }

    fn path(&self) -> &Path {
        self.dir.path()
    }

    fn file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    fn ewd(&self) -> Command {
        let mut cmd = Command::cargo_bin("ewd").unwrap();
        cmd.env("EW_STATE_DIR", self.path())
            .env_remove("EW_CONFIG")
            .env_remove("EW_DRAIN_TIMEOUT_MS")
            .env("EW_LOG", "debug");
        cmd
    }

    fn spawn_launcher(&self) -> Child {
        StdCommand::new(env!("CARGO_BIN_EXE_ewd"))
            .arg("launcher")
            .env("EW_STATE_DIR", self.path())
            .env_remove("EW_CONFIG")
            .env("EW_LOG", "debug")
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .unwrap()
    }
}

fn wait_for(mut check: impl FnMut() -> bool) -> bool {
    let start = Instant::now();
    while start.elapsed() < WAIT_MAX {
        if check() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    false
}

fn wait_exit(child: &mut Child) -> Option<i32> {
    let start = Instant::now();
    while start.elapsed() < WAIT_MAX {
        if let Some(status) = child.try_wait().unwrap() {
            return status.code();
        }
        std::thread::sleep(Duration::from_millis(50));
    }
    let _ = child.kill();
    None
}

fn sigterm(child: &Child) {
    let status = StdCommand::new("kill")
        .args(["-TERM", &child.id().to_string()])
        .status()
        .unwrap();
    assert!(status.success());
}

#[test]
fn check_accepts_an_empty_state_dir() {
    let state = StateDir::new();

    let output = state.ewd().arg("check").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("capacity:        5"), "{stdout}");
    assert!(stdout.contains("(0 jobs)"), "{stdout}");
}

#[test]
fn check_counts_jobs() {
    let state = StateDir::new();
    state.file("ewd.toml", "capacity = 2\n");
    state.file(
        "jobs.toml",
        r#"
[[job]]
id = 1
every = "1m"
command = "true"
[job.target]
database = "postgres"

[[job]]
id = 2
every = "1h"
command = "true"
[job.target]
database = "postgres"
"#,
    );

    let output = state.ewd().arg("check").output().unwrap();

    assert!(output.status.success());
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.contains("capacity:        2"), "{stdout}");
    assert!(stdout.contains("(2 jobs)"), "{stdout}");
}

#[test]
fn check_rejects_invalid_settings() {
    let state = StateDir::new();
    let settings = state.file("custom.toml", "capacity = 0\n");

    let output = state.ewd().arg("check").arg("--config").arg(settings).output().unwrap();

    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("capacity"));
}

#[test]
fn worker_without_a_handoff_exits_two() {
    let state = StateDir::new();

    let output =
        state.ewd().arg("worker").arg(state.path().join("missing.handoff")).output().unwrap();

    assert_eq!(output.status.code(), Some(2));
}

#[test]
fn launcher_runs_a_due_job_and_drains_on_sigterm() {
    let state = StateDir::new();
    let marker = state.path().join("ran");
    let audit = state.path().join("runs.jsonl");
    state.file(
        "ewd.toml",
        concat!(
            "capacity = 2\n",
            "poll_interval = \"50ms\"\n",
            "drain_timeout = \"2s\"\n",
            "audit_log = \"runs.jsonl\"\n",
        ),
    );
    state.file(
        "jobs.toml",
        &format!(
            r#"
[[job]]
id = 1
every = "1h"
command = "echo \"$EW_JOB_ID\" > '{}'"
[job.target]
database = "postgres"
"#,
            marker.display()
        ),
    );

    let mut launcher = state.spawn_launcher();
    let ran = wait_for(|| {
        std::fs::read_to_string(&marker).is_ok_and(|s| s.trim() == "1")
            && std::fs::read_to_string(&audit).is_ok_and(|s| s.contains("\"job_id\":1"))
    });
    let pid_file_written = state.path().join("ewd.pid").exists();

    sigterm(&launcher);
    let code = wait_exit(&mut launcher);

    assert!(ran, "job should have run and been recorded");
    assert!(pid_file_written);
    assert_eq!(code, Some(0));
    assert!(!state.path().join("ewd.pid").exists(), "PID file should be removed on shutdown");
}

#[test]
fn second_launcher_refuses_to_start() {
    let state = StateDir::new();
    let mut first = state.spawn_launcher();
    let pid_file = state.path().join("ewd.pid");
    assert!(wait_for(|| std::fs::read_to_string(&pid_file).is_ok_and(|s| !s.trim().is_empty())));

    let output = state.ewd().arg("launcher").output().unwrap();

    sigterm(&first);
    wait_exit(&mut first);
    assert_eq!(output.status.code(), Some(1));
    assert!(String::from_utf8_lossy(&output.stderr).contains("already running"));
}
