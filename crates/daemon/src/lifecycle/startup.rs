// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon startup and initialization logic.

use std::io::Write;
use std::os::unix::fs::PermissionsExt;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::net::UnixListener;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use pwrd_core::SystemClock;

use crate::hw::SysfsIo;
use crate::logging::StderrVerbosity;
use crate::permissions::Permissions;
use crate::state::{ArbiterState, DaemonCtx};
use crate::worker::{self, WorkTx};

use super::{restart_gate, set_state_clean, Config, LifecycleError, RestartGate};

/// Everything a running daemon needs after startup.
pub struct Started {
    pub ctx: Arc<DaemonCtx>,
    pub listener: UnixListener,
    pub work_tx: WorkTx,
    pub worker: JoinHandle<()>,
}

/// Start the daemon: pidfile, restart gate, permissions oracle, socket,
/// worker. Fatal errors surface to `main`, which exits 1.
pub fn startup(
    config: Config,
    restart_flag: bool,
    verbosity: StderrVerbosity,
) -> Result<Started, LifecycleError> {
    std::fs::create_dir_all(&config.run_dir)?;

    write_pidfile(&config)?;

    match restart_gate(&config, restart_flag) {
        RestartGate::Clean => {}
        RestartGate::AllowedByMarker => {
            warn!(
                "dirty marker present but {} exists; allowing restart",
                config.allow_restart_path.display()
            );
            set_state_clean(&config);
        }
        RestartGate::AllowedByFlag => {
            warn!("dirty marker present but -r given; allowing restart");
            set_state_clean(&config);
        }
        RestartGate::Refused => return Err(LifecycleError::RestartRefused),
    }

    let permissions = Permissions::restore(&config.permissions_path)?;

    // Remove a stale rendezvous point, bind, then open it up: arbitration
    // is by priority, not secrecy, so every local user may connect.
    if config.socket_path.exists() {
        std::fs::remove_file(&config.socket_path)?;
    }
    let listener = UnixListener::bind(&config.socket_path)
        .map_err(|e| LifecycleError::BindFailed(config.socket_path.clone(), e))?;
    std::fs::set_permissions(&config.socket_path, std::fs::Permissions::from_mode(0o666))?;

    info!("listening on {}", config.socket_path.display());

    let ctx = Arc::new(DaemonCtx {
        config,
        state: Mutex::new(ArbiterState::default()),
        hw: Arc::new(SysfsIo),
        clock: SystemClock,
        permissions,
        verbosity,
    });

    let (work_tx, worker) = worker::spawn(Arc::clone(&ctx));

    Ok(Started { ctx, listener, work_tx, worker })
}

fn write_pidfile(config: &Config) -> Result<(), LifecycleError> {
    let mut file = std::fs::File::create(&config.pidfile_path)
        .map_err(|e| LifecycleError::Pidfile(config.pidfile_path.clone(), e))?;
    write!(file, "{}", std::process::id())
        .map_err(|e| LifecycleError::Pidfile(config.pidfile_path.clone(), e))?;
    Ok(())
}
