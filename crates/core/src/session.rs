// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-connection session records.

use std::collections::HashSet;
use std::fmt;

use serde::{Deserialize, Serialize};

use crate::attr::AttrPath;

/// Daemon-assigned connection identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct SessionId(pub u64);

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Role a client declares when it authorizes its session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    App,
    MonitorControl,
    Os,
    User,
    ResourceManager,
    Admin,
    Manager,
    Accounting,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::App => "app",
            Self::MonitorControl => "monitor_control",
            Self::Os => "os",
            Self::User => "user",
            Self::ResourceManager => "resource_manager",
            Self::Admin => "admin",
            Self::Manager => "manager",
            Self::Accounting => "accounting",
        };
        f.write_str(name)
    }
}

/// Peer credentials as reported by the kernel, never by the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Peer {
    pub uid: u32,
    pub gid: u32,
    pub pid: i32,
}

/// One live client connection.
#[derive(Debug)]
pub struct Session {
    pub id: SessionId,
    pub peer: Peer,
    pub role: Option<Role>,
    pub context_name: Option<String>,
    pub opened_us: u64,
    /// Paths this session currently forces; the requests themselves live
    /// in the ladder, at most one per path.
    pub changes: HashSet<AttrPath>,
}

impl Session {
    pub fn new(id: SessionId, peer: Peer, opened_us: u64) -> Self {
        Self { id, peer, role: None, context_name: None, opened_us, changes: HashSet::new() }
    }

    /// Record the declared role and context name. Fails if the session
    /// already authorized once.
    pub fn authorize(&mut self, role: Role, context_name: String) -> bool {
        if self.role.is_some() {
            return false;
        }
        self.role = Some(role);
        self.context_name = Some(context_name);
        true
    }

    pub fn is_authorized(&self) -> bool {
        self.role.is_some()
    }

    /// Persistent sessions redefine the baseline instead of overlaying it.
    /// Only a root resource manager qualifies.
    pub fn is_persistent(&self) -> bool {
        self.peer.uid == 0 && self.role == Some(Role::ResourceManager)
    }
}

#[cfg(test)]
#[path = "session_tests.rs"]
mod tests;
