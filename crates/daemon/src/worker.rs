// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Worker task: single consumer of the set-request queue.
//!
//! Hardware writes for accepted sets all happen here, one at a time, in
//! arrival order. Shutdown pushes a sentinel item through the same queue
//! so the worker drains everything accepted before it.

use std::sync::Arc;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use pwrd_core::{AttrPath, AttributeKind, SessionId, Value};

use crate::arbiter;
use crate::state::{send_reply, DaemonCtx, Reply};

/// One accepted set request awaiting application.
#[derive(Debug, Clone)]
pub struct SetJob {
    pub session: SessionId,
    pub kind: AttributeKind,
    pub path: AttrPath,
    pub value: Value,
}

/// Work queue items. `Shutdown` is the sentinel that retires the worker.
#[derive(Debug)]
pub enum WorkItem {
    Set(SetJob),
    Shutdown,
}

pub type WorkTx = mpsc::UnboundedSender<WorkItem>;

/// Spawn the worker task. Returns the queue producer and the join handle
/// used to drain the worker at shutdown.
pub fn spawn(ctx: Arc<DaemonCtx>) -> (WorkTx, JoinHandle<()>) {
    let (tx, rx) = mpsc::unbounded_channel();
    let handle = tokio::spawn(run(ctx, rx));
    (tx, handle)
}

async fn run(ctx: Arc<DaemonCtx>, mut rx: mpsc::UnboundedReceiver<WorkItem>) {
    while let Some(item) = rx.recv().await {
        match item {
            WorkItem::Shutdown => break,
            WorkItem::Set(job) => process(&ctx, &job),
        }
    }
    debug!("worker retired");
}

fn process(ctx: &DaemonCtx, job: &SetJob) {
    debug!("work item arrived: {}", job.path);

    let code = {
        let mut state = ctx.state.lock();
        arbiter::apply_set(&mut state, ctx.hw.as_ref(), &ctx.clock, job)
    };

    match code {
        Some(code) => send_reply(ctx, job.session, Reply::code(code)),
        None => debug!("dropping set from departed session {}", job.session),
    }
}

#[cfg(test)]
#[path = "worker_tests.rs"]
mod tests;
