// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! pwrd: power control arbitration daemon.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tokio::signal::unix::{signal, SignalKind};
use tokio_util::sync::CancellationToken;
use tracing::{error, info};

use pwrd_daemon::lifecycle::{self, Config, LifecycleError};
use pwrd_daemon::logging::StderrVerbosity;
use pwrd_daemon::{escalate, listener, logging};

/// Power control arbitration daemon.
///
/// Mediates concurrent set-requests from local clients against node power
/// control points (frequency limits, governors, C-state limits, power
/// caps), restoring baselines as clients depart.
#[derive(Parser)]
#[command(name = "pwrd")]
struct Cli {
    /// Pathname of the pidfile to use
    #[arg(short = 'p', long = "pidfile")]
    pidfile: Option<PathBuf>,

    /// Allow daemon restart after an unclean exit
    #[arg(short = 'r', long = "restart")]
    restart: bool,

    /// Don't run as a daemon (for debugging)
    #[arg(short = 'n', long = "nodaemon")]
    nodaemon: bool,

    /// Increase debug level to stderr (repeatable)
    #[arg(short = 'D', long = "debug", action = clap::ArgAction::Count)]
    debug: u8,

    /// Increase trace level to stderr (repeatable)
    #[arg(short = 'T', long = "trace", action = clap::ArgAction::Count)]
    trace: u8,
}

fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(e) => {
            let failed = e.use_stderr();
            let _ = e.print();
            return if failed { ExitCode::FAILURE } else { ExitCode::SUCCESS };
        }
    };

    // Fork before anything starts a thread (log appender, runtime).
    if !cli.nodaemon {
        if let Err(e) = nix::unistd::daemon(false, false) {
            eprintln!("pwrd: unable to daemonize: {}", e);
            return ExitCode::FAILURE;
        }
    }

    let config = Config::load().with_pidfile(cli.pidfile);
    let (verbosity, _log_guard) = logging::init(&config.log_dir, cli.debug, cli.trace);
    info!("pwrd started");

    let runtime = match tokio::runtime::Builder::new_multi_thread().enable_all().build() {
        Ok(rt) => rt,
        Err(e) => {
            error!("unable to start runtime: {}", e);
            return ExitCode::FAILURE;
        }
    };

    match runtime.block_on(run(config, cli.restart, verbosity)) {
        Ok(()) => {
            info!("pwrd exiting");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!("fatal: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(
    config: Config,
    restart: bool,
    verbosity: StderrVerbosity,
) -> Result<(), LifecycleError> {
    // SIGPIPE must not kill the daemon; write failures surface as EPIPE.
    // SIGALRM only interrupts blocking syscalls.
    let mut sigpipe = signal(SignalKind::pipe())?;
    let mut sigalrm = signal(SignalKind::alarm())?;
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = sigpipe.recv() => {}
                _ = sigalrm.recv() => {}
            }
        }
    });

    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    let started = match lifecycle::startup(config, restart, verbosity) {
        Ok(started) => started,
        Err(LifecycleError::RestartRefused) => {
            error!("daemon appears to have exited abnormally with overrides outstanding");
            error!("restart disallowed; setting node admin-down");
            escalate::set_node_admin_down().await;
            error!("waiting for signal to exit");
            tokio::select! {
                _ = sigint.recv() => {}
                _ = sigterm.recv() => {}
            }
            return Err(LifecycleError::RestartRefused);
        }
        Err(e) => return Err(e),
    };

    let shutdown = CancellationToken::new();
    {
        let shutdown = shutdown.clone();
        tokio::spawn(async move {
            tokio::select! {
                _ = sigint.recv() => {}
                _ = sigterm.recv() => {}
            }
            info!("termination signal received");
            shutdown.cancel();
        });
    }

    listener::run(
        Arc::clone(&started.ctx),
        started.listener,
        started.work_tx.clone(),
        shutdown,
    )
    .await;

    lifecycle::shutdown(&started.ctx, &started.work_tx, started.worker).await;
    Ok(())
}
