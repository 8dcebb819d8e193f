// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle: configuration, state markers, restart gate, shutdown.

mod startup;
pub use startup::{startup, Started};

use std::fs::File;
use std::path::PathBuf;
use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::arbiter;
use crate::env;
use crate::permissions::PermissionsError;
use crate::state::DaemonCtx;
use crate::worker::{WorkItem, WorkTx};

/// Daemon configuration. Paths default to the system locations with
/// `PWRD_*` environment overrides.
#[derive(Debug, Clone)]
pub struct Config {
    /// Run dir: socket, pidfile, dirty marker.
    pub run_dir: PathBuf,
    /// Path to the Unix socket rendezvous point.
    pub socket_path: PathBuf,
    /// Path to the pidfile.
    pub pidfile_path: PathBuf,
    /// Marker whose existence means hardware overrides are outstanding.
    pub dirty_path: PathBuf,
    /// Operator marker permitting restart after an unclean exit.
    pub allow_restart_path: PathBuf,
    /// Connection allow-list.
    pub permissions_path: PathBuf,
    /// Daemon log directory.
    pub log_dir: PathBuf,
    /// Session admission cap.
    pub max_sessions: usize,
}

impl Config {
    pub fn load() -> Self {
        let run_dir = env::run_dir();
        Self {
            socket_path: run_dir.join("pwrd.sock"),
            pidfile_path: run_dir.join("pwrd.pid"),
            dirty_path: run_dir.join("dirty"),
            allow_restart_path: env::allow_restart_path(),
            permissions_path: env::etc_dir().join("permissions"),
            log_dir: env::log_dir(),
            max_sessions: env::max_sessions(),
            run_dir,
        }
    }

    /// Apply the `-p` pidfile override.
    pub fn with_pidfile(mut self, pidfile: Option<PathBuf>) -> Self {
        if let Some(path) = pidfile {
            self.pidfile_path = path;
        }
        self
    }
}

/// Lifecycle errors. All of these are fatal to initialization.
#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("failed to bind socket at {0}: {1}")]
    BindFailed(PathBuf, std::io::Error),

    #[error("failed to write pidfile {0}: {1}")]
    Pidfile(PathBuf, std::io::Error),

    #[error("permissions: {0}")]
    Permissions(#[from] PermissionsError),

    #[error("daemon state is dirty and restart is not allowed")]
    RestartRefused,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Create the dirty marker: hardware overrides are (about to be)
/// outstanding.
pub fn set_state_dirty(config: &Config) {
    if let Err(e) = File::create(&config.dirty_path) {
        warn!("unable to create dirty marker {}: {}", config.dirty_path.display(), e);
    }
}

/// Remove the dirty marker: every override has been rolled back.
pub fn set_state_clean(config: &Config) {
    let _ = std::fs::remove_file(&config.dirty_path);
}

/// Verdict of the startup dirty-state check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RestartGate {
    /// No dirty marker; a clean previous exit.
    Clean,
    /// Dirty, but the operator marker permits continuing.
    AllowedByMarker,
    /// Dirty, but `-r` permits continuing.
    AllowedByFlag,
    /// Dirty and nothing permits continuing.
    Refused,
}

/// Decide whether a start may proceed. A present dirty marker means the
/// previous instance died with overrides possibly still applied.
pub fn restart_gate(config: &Config, restart_flag: bool) -> RestartGate {
    if !config.dirty_path.exists() {
        return RestartGate::Clean;
    }
    if config.allow_restart_path.exists() {
        return RestartGate::AllowedByMarker;
    }
    if restart_flag {
        return RestartGate::AllowedByFlag;
    }
    RestartGate::Refused
}

/// Clean shutdown: drain the worker through the sentinel, destruct every
/// session (rolling its changes back), then unlink the rendezvous point
/// and the pidfile.
pub async fn shutdown(ctx: &Arc<DaemonCtx>, work_tx: &WorkTx, worker: JoinHandle<()>) {
    info!("shutting down");

    // Stop the worker before resetting values.
    let _ = work_tx.send(WorkItem::Shutdown);
    if let Err(e) = worker.await {
        warn!("worker task failed: {}", e);
    }

    let ids: Vec<_> = ctx.state.lock().sessions.keys().copied().collect();
    for id in ids {
        arbiter::teardown_session(ctx, id);
    }

    if let Err(e) = std::fs::remove_file(&ctx.config.socket_path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("unable to remove socket {}: {}", ctx.config.socket_path.display(), e);
        }
    }
    if let Err(e) = std::fs::remove_file(&ctx.config.pidfile_path) {
        if e.kind() != std::io::ErrorKind::NotFound {
            warn!("unable to remove pidfile {}: {}", ctx.config.pidfile_path.display(), e);
        }
    }

    info!("shutdown complete");
}

#[cfg(test)]
#[path = "mod_tests.rs"]
mod tests;
