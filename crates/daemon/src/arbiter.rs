// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! The arbitration engine: apply a set request, roll a departing session's
//! requests back to the runner-up.
//!
//! Both entry points run under the state mutex for the full
//! insertion/withdrawal + head-read + conditional-hardware-write window, so
//! the worker and the listener can never interleave stale writes on the
//! same path.

use std::cmp::Ordering;

use tracing::{debug, info, warn};

use pwrd_core::{AttrPath, Clock, Session, SessionId, SetRequest};

use crate::hw::{PowerIo, ValueKind};
use crate::lifecycle;
use crate::protocol::RetCode;
use crate::state::{ArbiterState, DaemonCtx};
use crate::worker::SetJob;

/// Apply one queued set request.
///
/// Returns the code to send back to the client, or `None` when the
/// originating session is already gone: nobody is listening, and a write
/// on behalf of a departed client would only have to be rolled back again.
pub fn apply_set(
    state: &mut ArbiterState,
    hw: &dyn PowerIo,
    clock: &impl Clock,
    job: &SetJob,
) -> Option<RetCode> {
    let persistent = match state.sessions.get(&job.session) {
        Some(entry) => entry.session.is_persistent(),
        None => return None,
    };

    // Baseline: captured on first contested touch of the path, redefined on
    // every persistent write.
    if !state.defaults.contains(&job.path) || persistent {
        let value = if persistent {
            job.value
        } else {
            match hw.read(&job.path, job.kind, ValueKind::of(job.value)) {
                Ok(v) => v,
                Err(e) => {
                    warn!("unable to read default value for {}: {}", job.path, e);
                    return Some(RetCode::Failure);
                }
            }
        };

        if state.defaults.contains(&job.path) {
            state.ladder.withdraw(&job.path, None);
        }

        // Zero-stamped, so any later governor request outranks the baseline.
        let baseline = SetRequest {
            kind: job.kind,
            path: job.path.clone(),
            value,
            owner: None,
            stamp_us: 0,
        };
        debug!("setting default value for {} to {}", job.path, value);
        state.defaults.insert(baseline.clone());
        state.ladder.insert(baseline);
    }

    // At most one live request per (session, path): supersede the prior one.
    if let Some(old) = state.ladder.withdraw(&job.path, Some(job.session)) {
        debug!("superseding {} = {} for session {}", old.path, old.value, job.session);
    }

    let request = SetRequest {
        kind: job.kind,
        path: job.path.clone(),
        value: job.value,
        owner: Some(job.session),
        stamp_us: clock.epoch_us(),
    };

    if let Some(entry) = state.sessions.get_mut(&job.session) {
        entry.session.changes.insert(job.path.clone());
    }
    state.ladder.insert(request.clone());

    let mut code = RetCode::Success;
    if state.ladder.is_winner(&request) {
        if let Err(e) = hw.write(&job.path, job.kind, job.value) {
            warn!("hardware write to {} failed: {}", job.path, e);
            code = RetCode::Failure;
        }
    }

    Some(code)
}

/// Withdraw one departing request and restore the runner-up if the
/// departed request was the winner.
///
/// The priority verdict is computed against the new head before the removed
/// entry is dropped.
fn rollback_one(state: &mut ArbiterState, hw: &dyn PowerIo, id: SessionId, path: &AttrPath) {
    let Some(removed) = state.ladder.withdraw(path, Some(id)) else {
        warn!("session {} had no ladder entry for {}", id, path);
        return;
    };

    // The baseline entry keeps the ladder non-empty for any known path.
    let Some(head) = state.ladder.head(path) else {
        warn!("ladder for {} empty after withdrawal", path);
        return;
    };

    if removed.priority_cmp(head) == Ordering::Less {
        info!("rolling back session {} value of {}", id, path);
        if let Err(e) = hw.write(path, head.kind, head.value) {
            warn!("rollback write to {} failed: {}", path, e);
        }
    }
}

/// Roll back every change a session holds. The session record must already
/// be out of the table.
pub fn rollback_session(state: &mut ArbiterState, hw: &dyn PowerIo, mut session: Session) {
    for path in std::mem::take(&mut session.changes) {
        rollback_one(state, hw, session.id, &path);
    }
}

/// Destruct a session: remove it from the table, roll back its changes,
/// and mark the daemon clean once no session remains. Idempotent; the
/// caller that wins the removal runs the rollback.
pub fn teardown_session(ctx: &DaemonCtx, id: SessionId) {
    let mut state = ctx.state.lock();
    let Some(entry) = state.sessions.remove(&id) else {
        return;
    };
    debug!("cleaning up session {}", id);
    rollback_session(&mut state, ctx.hw.as_ref(), entry.session);
    if state.sessions.is_empty() {
        lifecycle::set_state_clean(&ctx.config);
    }
}

/// Log full internal state (the `Dump` request, root only).
pub fn dump_state(ctx: &DaemonCtx) {
    let state = ctx.state.lock();

    info!("dump sessions ({})", state.sessions.len());
    for entry in state.sessions.values() {
        let s = &entry.session;
        info!(
            "session {}, uid/gid/pid = {}/{}/{}, role = {}, name = {}, opened_us = {}, changes = {}",
            s.id,
            s.peer.uid,
            s.peer.gid,
            s.peer.pid,
            s.role.map(|r| r.to_string()).unwrap_or_else(|| "unspecified".to_string()),
            s.context_name.as_deref().unwrap_or("-"),
            s.opened_us,
            s.changes.len(),
        );
    }

    info!("dump defaults ({})", state.defaults.len());
    for d in state.defaults.iter() {
        info!("default {} {} = {}", d.kind, d.path, d.value);
    }

    info!("dump ladders ({})", state.ladder.len());
    for path in state.ladder.paths() {
        for e in state.ladder.entries(path) {
            info!(
                "ladder {} {} = {}, owner = {}, stamp_us = {}",
                e.kind,
                e.path,
                e.value,
                e.owner.map(|o| o.to_string()).unwrap_or_else(|| "default".to_string()),
                e.stamp_us,
            );
        }
    }

    info!("dump done");
}

#[cfg(test)]
#[path = "arbiter_tests.rs"]
mod tests;
