// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use super::*;
use ew_core::{JobId, LogId};
use ew_wire::HandoffHandle;
use std::time::Duration;

fn request() -> SpawnRequest {
    SpawnRequest {
        handle: HandoffHandle::from("/nonexistent/handle.handoff"),
        job_id: JobId::new(1),
        log_id: LogId::new(10),
        slot: 0,
    }
}

fn shell(script: &str) -> LocalProcessManager {
    LocalProcessManager::new("sh").with_args(["-c", script, "sh"])
}

async fn wait_for_exit(process: &mut LocalProcess) -> Option<i32> {
    for _ in 0..200 {
        if let Liveness::Terminated(code) = process.poll_liveness().unwrap() {
            return code;
        }
        tokio::time::sleep(Duration::from_millis(25)).await;
    }
    panic!("process {} did not exit", process.pid());
}

#[tokio::test]
async fn exit_code_is_observed() {
    let mut process = shell("exit 7").spawn(&request()).unwrap();
    assert!(process.pid() > 0);
    assert_eq!(wait_for_exit(&mut process).await, Some(7));
}

#[tokio::test]
async fn handle_is_the_last_argument() {
    let manager = shell("test \"$1\" = /nonexistent/handle.handoff");
    let mut process = manager.spawn(&request()).unwrap();
    assert_eq!(wait_for_exit(&mut process).await, Some(0));
}

#[tokio::test]
async fn termination_request_stops_a_running_process() {
    let mut process = shell("exec sleep 30").spawn(&request()).unwrap();
    assert_eq!(process.poll_liveness().unwrap(), Liveness::Alive);

    process.request_termination().unwrap();
    assert_eq!(wait_for_exit(&mut process).await, None);
}

#[tokio::test]
async fn force_terminate_kills_a_process_ignoring_sigterm() {
    let dir = tempfile::TempDir::new().unwrap();
    let ready = dir.path().join("ready");
    let script = format!("trap '' TERM; touch '{}'; exec sleep 30", ready.display());
    let mut process = shell(&script).spawn(&request()).unwrap();
    for _ in 0..200 {
        if ready.exists() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }
    assert!(ready.exists(), "trap was never installed");

    process.request_termination().unwrap();
    tokio::time::sleep(Duration::from_millis(100)).await;
    assert_eq!(process.poll_liveness().unwrap(), Liveness::Alive);

    process.force_terminate().unwrap();
    assert_eq!(wait_for_exit(&mut process).await, None);
}

#[tokio::test]
async fn workers_get_their_own_process_group() {
    let mut process = shell("exec sleep 30").spawn(&request()).unwrap();
    let pid = nix::unistd::Pid::from_raw(process.pid() as i32);

    let group = nix::unistd::getpgid(Some(pid)).unwrap();

    assert_eq!(group, pid);
    assert_ne!(group, nix::unistd::getpgrp());
    process.force_terminate().unwrap();
    wait_for_exit(&mut process).await;
}

#[tokio::test]
async fn signalling_a_reaped_process_is_a_no_op() {
    let mut process = shell("exit 0").spawn(&request()).unwrap();
    wait_for_exit(&mut process).await;

    process.request_termination().unwrap();
    process.force_terminate().unwrap();
}

#[tokio::test]
async fn missing_program_is_a_spawn_error() {
    let err = LocalProcessManager::new("/nonexistent/ewd").spawn(&request()).unwrap_err();
    assert!(matches!(err, ProcessError::Spawn { .. }), "got {err:?}");
}

#[test]
fn control_plane_is_alive_while_parent_is_unchanged() {
    assert!(LocalProcessManager::new("sh").control_plane_alive());
    assert!(LocalProcessManager::new("sh").watch_parent().control_plane_alive());
}
