// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admin-down escalation.
//!
//! When a dirty restart is refused, the daemon asks the operator-configured
//! command (`PWRD_ADMIN_DOWN_CMD`) to mark this node administratively down
//! before parking. Best effort: failures are logged, never propagated.

use std::time::Duration;

use tokio::process::Command;
use tracing::{info, warn};

use crate::env;

/// Bound on the whole remote exchange.
const REPLY_TIMEOUT: Duration = Duration::from_secs(120);

pub async fn set_node_admin_down() {
    let Some(cmdline) = env::admin_down_cmd() else {
        warn!("no admin-down command configured; node left as-is");
        return;
    };

    let mut parts = cmdline.split_whitespace();
    let Some(program) = parts.next() else {
        warn!("admin-down command is empty; node left as-is");
        return;
    };

    info!("invoking admin-down command: {}", cmdline);
    let mut command = Command::new(program);
    command.args(parts).kill_on_drop(true);
    let result = tokio::time::timeout(REPLY_TIMEOUT, command.output()).await;

    match result {
        Err(_) => warn!("admin-down command timed out after {:?}", REPLY_TIMEOUT),
        Ok(Err(e)) => warn!("admin-down command failed to start: {}", e),
        Ok(Ok(output)) => {
            for line in String::from_utf8_lossy(&output.stdout).lines() {
                info!("admin-down stdout: {}", line);
            }
            for line in String::from_utf8_lossy(&output.stderr).lines() {
                info!("admin-down stderr: {}", line);
            }
            if !output.status.success() {
                warn!("admin-down command exited with {}", output.status);
            }
        }
    }
}
