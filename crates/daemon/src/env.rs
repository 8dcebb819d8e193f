// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Centralized environment variable access for the daemon.
//!
//! Every well-known path has a `PWRD_*` override so specs can point the
//! daemon at a temporary tree.

use std::path::PathBuf;
use std::time::Duration;

/// Hard cap on concurrent client sessions.
pub const DEFAULT_MAX_SESSIONS: usize = 300;

/// Run dir: socket, pidfile, and dirty marker live here.
pub fn run_dir() -> PathBuf {
    path_from_env("PWRD_RUN_DIR", "/var/run/pwrd")
}

/// Etc dir: the connection allow-list lives here.
pub fn etc_dir() -> PathBuf {
    path_from_env("PWRD_ETC_DIR", "/etc/pwrd")
}

/// Log dir for the daemon log file.
pub fn log_dir() -> PathBuf {
    path_from_env("PWRD_LOG_DIR", "/var/log/pwrd")
}

/// Operator marker permitting a restart after an unclean exit.
/// Default lives in /tmp so the permission evaporates at boot.
pub fn allow_restart_path() -> PathBuf {
    path_from_env("PWRD_ALLOW_RESTART", "/tmp/pwrd-allow-restart")
}

/// Session admission cap (`PWRD_MAX_SESSIONS` override).
pub fn max_sessions() -> usize {
    std::env::var("PWRD_MAX_SESSIONS")
        .ok()
        .and_then(|s| s.parse::<usize>().ok())
        .filter(|n| *n > 0)
        .unwrap_or(DEFAULT_MAX_SESSIONS)
}

/// Operator command invoked to mark the node admin-down.
pub fn admin_down_cmd() -> Option<String> {
    std::env::var("PWRD_ADMIN_DOWN_CMD").ok().filter(|s| !s.is_empty())
}

/// Timeout on a single response write.
pub fn ipc_timeout() -> Duration {
    std::env::var("PWRD_IPC_TIMEOUT_MS")
        .ok()
        .and_then(|s| s.parse::<u64>().ok())
        .map(Duration::from_millis)
        .unwrap_or(Duration::from_secs(5))
}

fn path_from_env(var: &str, default: &str) -> PathBuf {
    match std::env::var(var) {
        Ok(dir) if !dir.is_empty() => PathBuf::from(dir),
        _ => PathBuf::from(default),
    }
}
