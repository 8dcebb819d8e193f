// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared daemon state.
//!
//! The ladder, the default register, and the session table are the
//! process-wide mutable tables; all three live behind one mutex so the
//! worker's apply path and the listener's teardown path serialize against
//! each other, hardware writes included.

use std::collections::HashMap;
use std::sync::Arc;

use parking_lot::Mutex;
use tokio::sync::mpsc;

use pwrd_core::{DefaultRegister, Ladder, Session, SessionId, SystemClock};

use crate::hw::PowerIo;
use crate::lifecycle::Config;
use crate::logging::StderrVerbosity;
use crate::permissions::Permissions;
use crate::protocol::{LogLevels, RetCode};

/// A reply queued for a session's writer task, which stamps the sequence
/// number in delivery order.
#[derive(Debug, Clone, Copy)]
pub struct Reply {
    pub code: RetCode,
    pub levels: Option<LogLevels>,
}

impl Reply {
    pub fn code(code: RetCode) -> Self {
        Self { code, levels: None }
    }
}

pub type ReplyTx = mpsc::UnboundedSender<Reply>;

/// A live session plus its reply channel.
#[derive(Debug)]
pub struct SessionEntry {
    pub session: Session,
    pub reply_tx: ReplyTx,
}

/// The mutable tables, guarded together.
#[derive(Default)]
pub struct ArbiterState {
    pub sessions: HashMap<SessionId, SessionEntry>,
    pub ladder: Ladder,
    pub defaults: DefaultRegister,
}

/// Shared daemon context handed to the listener and the worker.
pub struct DaemonCtx {
    pub config: Config,
    pub state: Mutex<ArbiterState>,
    pub hw: Arc<dyn PowerIo>,
    pub clock: SystemClock,
    pub permissions: Permissions,
    pub verbosity: StderrVerbosity,
}

/// Queue a reply to a session. A departed session is not an error; the
/// reply simply has nowhere to go.
pub fn send_reply(ctx: &DaemonCtx, id: SessionId, reply: Reply) {
    let state = ctx.state.lock();
    if let Some(entry) = state.sessions.get(&id) {
        let _ = entry.reply_tx.send(reply);
    }
}
