// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Listener: accepts connections on the rendezvous socket, authenticates
//! peers, and demultiplexes request frames.
//!
//! Set requests are handed to the worker and answered from there; every
//! other request is answered inline. Each connection gets a small task
//! that owns its socket I/O; replies flow through a per-session channel to
//! a writer task which stamps the monotonic sequence in delivery order.

use std::sync::Arc;

use tokio::net::unix::OwnedWriteHalf;
use tokio::net::{UnixListener, UnixStream};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, warn};

use pwrd_core::{AttrPath, Clock, Peer, Session, SessionId};

use crate::arbiter;
use crate::env;
use crate::lifecycle;
use crate::protocol::{self, ProtocolError, Request, Response, RetCode};
use crate::state::{send_reply, DaemonCtx, Reply, SessionEntry};
use crate::worker::{SetJob, WorkItem, WorkTx};

/// Run the accept loop until shutdown is requested.
pub async fn run(
    ctx: Arc<DaemonCtx>,
    listener: UnixListener,
    work_tx: WorkTx,
    shutdown: CancellationToken,
) {
    let mut next_id: u64 = 0;
    // One log line per over-cap episode; reset by a successful admission.
    let mut reject_logged = false;

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            result = listener.accept() => match result {
                Ok((stream, _addr)) => {
                    next_id += 1;
                    admit(&ctx, stream, SessionId(next_id), &mut reject_logged, &work_tx, &shutdown)
                        .await;
                }
                Err(e) => error!("accept() failed: {}", e),
            },
        }
    }
    debug!("listener retired");
}

/// Admission control for one accepted connection: capacity, peer
/// credentials, allow-list. Rejected peers get exactly one response frame.
async fn admit(
    ctx: &Arc<DaemonCtx>,
    stream: UnixStream,
    id: SessionId,
    reject_logged: &mut bool,
    work_tx: &WorkTx,
    shutdown: &CancellationToken,
) {
    let at_cap = ctx.state.lock().sessions.len() >= ctx.config.max_sessions;
    if at_cap {
        if !*reject_logged {
            error!("open session limit reached");
            *reject_logged = true;
        }
        debug!("open session limit reached");
        reject(stream, RetCode::Failure).await;
        return;
    }

    let cred = match stream.peer_cred() {
        Ok(cred) => cred,
        Err(e) => {
            if !*reject_logged {
                error!("unable to get client credentials: {}", e);
                *reject_logged = true;
            }
            reject(stream, RetCode::Invalid).await;
            return;
        }
    };
    *reject_logged = false;

    let peer = Peer { uid: cred.uid(), gid: cred.gid(), pid: cred.pid().unwrap_or(0) };
    if !ctx.permissions.check(peer.uid) {
        error!("authentication error: uid {} not permitted to connect", peer.uid);
        reject(stream, RetCode::NoPerm).await;
        return;
    }

    let (reply_tx, reply_rx) = mpsc::unbounded_channel();
    {
        let mut state = ctx.state.lock();
        let session = Session::new(id, peer, ctx.clock.epoch_us());
        state.sessions.insert(id, SessionEntry { session, reply_tx });
    }
    lifecycle::set_state_dirty(&ctx.config);
    debug!("session {} connected: uid/gid/pid = {}/{}/{}", id, peer.uid, peer.gid, peer.pid);

    let ctx = Arc::clone(ctx);
    let work_tx = work_tx.clone();
    let shutdown = shutdown.clone();
    tokio::spawn(handle_connection(ctx, stream, id, reply_rx, work_tx, shutdown));
}

/// Answer a rejected connect with one frame, then drop the socket.
async fn reject(stream: UnixStream, code: RetCode) {
    let (_reader, mut writer) = stream.into_split();
    let response = Response::new(code, 0);
    if let Err(e) = protocol::write_response(&mut writer, &response, env::ipc_timeout()).await {
        debug!("rejection write failed: {}", e);
    }
}

/// Serve one session until EOF, a broken frame, or shutdown, then run
/// teardown (which rolls the session's changes back).
async fn handle_connection(
    ctx: Arc<DaemonCtx>,
    stream: UnixStream,
    id: SessionId,
    reply_rx: mpsc::UnboundedReceiver<Reply>,
    work_tx: WorkTx,
    shutdown: CancellationToken,
) {
    let (mut reader, writer) = stream.into_split();
    let writer_task = tokio::spawn(write_replies(id, writer, reply_rx));

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => break,
            request = protocol::read_request(&mut reader) => match request {
                Ok(request) => dispatch(&ctx, id, request, &work_tx),
                Err(ProtocolError::ConnectionClosed) => {
                    debug!("session {} closed", id);
                    break;
                }
                Err(e) => {
                    warn!("session {} request error: {}", id, e);
                    break;
                }
            },
        }
    }

    arbiter::teardown_session(&ctx, id);
    // Teardown dropped the session's reply sender; the writer drains
    // whatever was queued and exits.
    let _ = writer_task.await;
}

fn dispatch(ctx: &DaemonCtx, id: SessionId, request: Request, work_tx: &WorkTx) {
    match request {
        Request::Auth { role, context_name } => {
            debug!("processing auth request from session {}", id);
            let reply = {
                let mut state = ctx.state.lock();
                let Some(entry) = state.sessions.get_mut(&id) else { return };
                if entry.session.authorize(role, context_name) {
                    let s = &entry.session;
                    debug!(
                        "session {} authorized: role = {}, name = {}, uid = {}",
                        id,
                        role,
                        s.context_name.as_deref().unwrap_or("-"),
                        s.peer.uid,
                    );
                    Reply::code(RetCode::Success)
                } else {
                    warn!("redundant authorization request from session {}", id);
                    Reply::code(RetCode::Invalid)
                }
            };
            send_reply(ctx, id, reply);
        }

        Request::Set { kind, path, value } => {
            debug!("processing set request from session {}", id);
            let authorized = {
                let state = ctx.state.lock();
                state.sessions.get(&id).map(|e| e.session.is_authorized()).unwrap_or(false)
            };
            if !authorized {
                warn!("set request from unauthorized session {}", id);
                send_reply(ctx, id, Reply::code(RetCode::Invalid));
                return;
            }

            let job = SetJob { session: id, kind, path: AttrPath::new(path), value };
            // The reply is sent when the worker applies the request.
            if work_tx.send(WorkItem::Set(job)).is_err() {
                send_reply(ctx, id, Reply::code(RetCode::Failure));
            }
        }

        Request::LogLevel { debug: dbg, trace } => {
            debug!("processing loglevel request: debug = {}, trace = {}", dbg, trace);
            let reply = match ctx.verbosity.set_levels(dbg, trace) {
                Some(levels) => Reply { code: RetCode::Success, levels: Some(levels) },
                None => Reply::code(RetCode::Invalid),
            };
            send_reply(ctx, id, reply);
        }

        Request::Dump => {
            debug!("processing dump request from session {}", id);
            let uid = {
                let state = ctx.state.lock();
                state.sessions.get(&id).map(|e| e.session.peer.uid)
            };
            let reply = match uid {
                Some(0) => {
                    arbiter::dump_state(ctx);
                    Reply::code(RetCode::Success)
                }
                Some(_) => Reply::code(RetCode::NoPerm),
                None => return,
            };
            send_reply(ctx, id, reply);
        }

        Request::Unknown => {
            warn!("invalid request type received from session {}", id);
            send_reply(ctx, id, Reply::code(RetCode::Invalid));
        }
    }
}

/// Drain a session's reply queue onto its socket, stamping the sequence.
async fn write_replies(
    id: SessionId,
    mut writer: OwnedWriteHalf,
    mut rx: mpsc::UnboundedReceiver<Reply>,
) {
    let mut sequence: u64 = 0;
    while let Some(reply) = rx.recv().await {
        let response = Response { code: reply.code, sequence, levels: reply.levels };
        sequence += 1;
        if let Err(e) = protocol::write_response(&mut writer, &response, env::ipc_timeout()).await {
            warn!("session {} response write error: {}", id, e);
        }
    }
}
