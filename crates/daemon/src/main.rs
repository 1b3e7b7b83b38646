// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! `ewd`: the Elephant Worker launcher and worker binary

mod exit_error;

use std::path::{Path, PathBuf};
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::{Args, Parser, Subcommand};
use ew_adapters::{LocalProcessManager, ShellExecutor, TomlJobStore};
use ew_core::{format_duration, SystemClock};
use ew_daemon::worker::NO_FEEDBACK_EXIT;
use ew_daemon::{
    env, lifecycle, run_worker, spawn_signal_listener, Config, Launcher, LauncherConfig,
    LauncherDeps, LauncherExit, Settings, SettingsSource,
};
use ew_wire::HandoffHandle;
use tokio::signal::unix::{signal, SignalKind};
use tokio::sync::mpsc;
use tracing::info;
use tracing_appender::non_blocking::WorkerGuard;
use tracing_subscriber::EnvFilter;

use exit_error::ExitError;

/// Depth of the signal-to-launcher event queue
const EVENT_QUEUE_DEPTH: usize = 64;

#[derive(Parser)]
#[command(name = "ewd", version, about = "Elephant Worker: runs due jobs in a bounded worker pool")]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Run the launcher in the foreground until SIGTERM or SIGINT
    Launcher(LauncherArgs),
    /// Run one handed-off job (started by the launcher)
    #[command(hide = true)]
    Worker {
        /// Handoff handle passed by the launcher
        handle: PathBuf,
    },
    /// Validate the settings and jobs files
    Check {
        /// Settings file (default: $EW_CONFIG or <state dir>/ewd.toml)
        #[arg(long)]
        config: Option<PathBuf>,
    },
}

#[derive(Args)]
struct LauncherArgs {
    /// Settings file (default: $EW_CONFIG or <state dir>/ewd.toml)
    #[arg(long)]
    config: Option<PathBuf>,
    /// Write logs to this file instead of stderr
    #[arg(long)]
    log_file: Option<PathBuf>,
}

fn main() -> ExitCode {
    let cli = Cli::parse();
    match run(cli) {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => match e.downcast_ref::<ExitError>() {
            Some(exit) => {
                if !exit.message.is_empty() {
                    eprintln!("ewd: {exit}");
                }
                ExitCode::from(u8::try_from(exit.code).unwrap_or(1))
            }
            None => {
                eprintln!("ewd: {e:#}");
                ExitCode::FAILURE
            }
        },
    }
}

fn run(cli: Cli) -> Result<()> {
    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .context("failed to start async runtime")?;

    match cli.command {
        Command::Launcher(args) => runtime.block_on(launcher(args)),
        Command::Worker { handle } => {
            let _guard = init_tracing(None)?;
            runtime.block_on(worker(HandoffHandle::from(handle)))
        }
        Command::Check { config } => check(config),
    }
}

async fn launcher(args: LauncherArgs) -> Result<()> {
    let config = Config::load(args.config)?;
    let source = SettingsSource::new(&config.settings_path, &config.state_dir)
        .with_drain_timeout_override(env::drain_timeout());
    let settings = source.load()?;
    let _guard = init_tracing(args.log_file.as_deref().or(settings.log_file.as_deref()))?;

    let lock = lifecycle::startup(&config)?;
    let exit = run_launcher(&config, source, &settings).await;
    lock.shutdown();

    let code = exit?.exit_code();
    if code == 0 {
        Ok(())
    } else {
        Err(ExitError::silent(code).into())
    }
}

async fn run_launcher(
    config: &Config,
    source: SettingsSource,
    settings: &Settings,
) -> Result<LauncherExit> {
    let mut store = TomlJobStore::open(&settings.jobs_file, SystemClock)?;
    if let Some(audit_log) = &settings.audit_log {
        store = store.with_audit_log(audit_log);
    }
    info!(
        jobs_file = %settings.jobs_file.display(),
        jobs = store.job_ids().len(),
        "job store loaded"
    );

    let mut processes =
        LocalProcessManager::current_exe().context("failed to locate the ewd executable")?;
    if settings.watch_parent {
        processes = processes.watch_parent();
    }

    let (tx, rx) = mpsc::channel(EVENT_QUEUE_DEPTH);
    let listener = spawn_signal_listener(tx).context("failed to install signal handlers")?;
    let launcher = Launcher::new(
        LauncherDeps { store, processes },
        LauncherConfig {
            handoff_dir: config.handoff_dir.clone(),
            feedback_dir: config.feedback_dir.clone(),
            settings: Some(source),
        },
        settings.tunables,
        SystemClock,
    )?;

    let exit = launcher.run(rx).await;
    listener.abort();
    Ok(exit)
}

async fn worker(handle: HandoffHandle) -> Result<()> {
    // Installed before attaching so an early SIGTERM is not lost
    let mut sigterm = signal(SignalKind::terminate()).map_err(|e| {
        ExitError::new(NO_FEEDBACK_EXIT, format!("failed to install SIGTERM handler: {e}"))
    })?;
    let terminate = async move {
        sigterm.recv().await;
    };

    let code = run_worker(&handle, &ShellExecutor::new(), terminate).await;
    if code == 0 {
        Ok(())
    } else {
        Err(ExitError::silent(code).into())
    }
}

fn check(config: Option<PathBuf>) -> Result<()> {
    let config = Config::load(config)?;
    let settings = SettingsSource::new(&config.settings_path, &config.state_dir)
        .with_drain_timeout_override(env::drain_timeout())
        .load()
        .map_err(|e| ExitError::new(1, e.to_string()))?;
    let store = TomlJobStore::open(&settings.jobs_file, SystemClock)
        .map_err(|e| ExitError::new(1, e.to_string()))?;

    let tunables = settings.tunables;
    println!("settings:        {}", config.settings_path.display());
    println!("capacity:        {}", tunables.capacity);
    println!("poll_interval:   {}", format_duration(tunables.poll_interval));
    println!("startup_timeout: {}", format_duration(tunables.startup_timeout));
    println!("drain_timeout:   {}", format_duration(tunables.drain_timeout));
    println!("jobs_file:       {} ({} jobs)", settings.jobs_file.display(), store.job_ids().len());
    Ok(())
}

/// Install the global subscriber. Keep the guard alive to flush file output.
fn init_tracing(log_file: Option<&Path>) -> Result<Option<WorkerGuard>> {
    let filter = EnvFilter::try_new(env::log_filter()).unwrap_or_else(|_| EnvFilter::new("info"));
    let Some(path) = log_file else {
        tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
        return Ok(None);
    };

    let dir = path.parent().filter(|p| !p.as_os_str().is_empty()).unwrap_or(Path::new("."));
    let name = path
        .file_name()
        .with_context(|| format!("log file {} has no file name", path.display()))?;
    std::fs::create_dir_all(dir)
        .with_context(|| format!("failed to create log directory {}", dir.display()))?;

    let appender = tracing_appender::rolling::never(dir, name);
    let (writer, guard) = tracing_appender::non_blocking(appender);
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(writer).with_ansi(false).init();
    Ok(Some(guard))
}
