// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

use serde::{Deserialize, Serialize};

/// Return code surfaced to clients.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RetCode {
    Success,
    /// Hardware or internal failure; the daemon keeps running.
    Failure,
    /// Malformed or out-of-sequence request.
    Invalid,
    /// Peer not in the allow list, or privileged operation from non-root.
    NoPerm,
}

/// Effective stderr verbosity, echoed in `LogLevel` replies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LogLevels {
    pub debug: i32,
    pub trace: i32,
}

/// Response from the daemon to a client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    pub code: RetCode,
    /// Per-session sequence, strictly monotonic from zero in delivery order.
    pub sequence: u64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub levels: Option<LogLevels>,
}

impl Response {
    pub fn new(code: RetCode, sequence: u64) -> Self {
        Self { code, sequence, levels: None }
    }
}
