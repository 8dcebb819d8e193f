// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

use pwrd_core::{AttributeKind, Role, Value};

/// Request from a client to the daemon.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Request {
    /// Declare the session's role and context name. Allowed once.
    Auth { role: Role, context_name: String },

    /// Arbitrated write to a hardware control point. The reply is deferred
    /// until the worker has applied the request.
    Set { kind: AttributeKind, path: String, value: Value },

    /// Adjust stderr log verbosity; the reply carries the newly effective
    /// levels.
    LogLevel { debug: i32, trace: i32 },

    /// Log full internal daemon state. Restricted to uid 0.
    Dump,

    /// Any unrecognized request type. Well-formed but unknown frames land
    /// here and are answered with `Invalid` instead of tearing the session
    /// down.
    #[serde(other)]
    Unknown,
}
