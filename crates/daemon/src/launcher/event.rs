// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Wake-up events for the launcher control loop.

use std::io;

use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, info};

/// Asynchronous requests delivered to the control loop
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LauncherEvent {
    /// SIGTERM or SIGINT: drain and exit
    Shutdown,
    /// SIGHUP: re-read settings and the job store
    Reload,
    /// SIGCHLD: some worker changed state
    ChildExited,
}

/// Events gathered during one wake of the loop.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Pending {
    pub shutdown: bool,
    pub reload: bool,
    pub child_exited: bool,
    pub tick: bool,
}

impl Pending {
    pub fn note(&mut self, event: LauncherEvent) {
        match event {
            LauncherEvent::Shutdown => self.shutdown = true,
            LauncherEvent::Reload => self.reload = true,
            LauncherEvent::ChildExited => self.child_exited = true,
        }
    }
}

/// Forward process signals into `tx` until the receiver goes away.
///
/// Handlers are installed before this returns, so no signal delivered after
/// the call is lost.
pub fn spawn_signal_listener(tx: mpsc::Sender<LauncherEvent>) -> io::Result<JoinHandle<()>> {
    let mut sigterm = signal(SignalKind::terminate())?;
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sighup = signal(SignalKind::hangup())?;
    let mut sigchld = signal(SignalKind::child())?;

    Ok(tokio::spawn(async move {
        loop {
            let event = tokio::select! {
                Some(()) = sigterm.recv() => {
                    info!("received SIGTERM, draining");
                    LauncherEvent::Shutdown
                }
                Some(()) = sigint.recv() => {
                    info!("received SIGINT, draining");
                    LauncherEvent::Shutdown
                }
                Some(()) = sighup.recv() => {
                    info!("received SIGHUP, reloading");
                    LauncherEvent::Reload
                }
                Some(()) = sigchld.recv() => LauncherEvent::ChildExited,
                else => break,
            };
            if tx.send(event).await.is_err() {
                debug!("launcher gone, signal listener exiting");
                break;
            }
        }
    }))
}
