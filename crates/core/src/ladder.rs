// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Per-path priority ladders and the baseline register.
//!
//! Every live set request appears exactly once in the ladder for its path,
//! ordered highest priority first. The path's baseline (the value to
//! restore once no client holds the path) participates as an entry with no
//! owner, so the ladder for a known path is never empty and its head is
//! always the authoritative value.

use std::cmp::Ordering;
use std::collections::HashMap;

use crate::attr::{AttrPath, AttributeKind, Governor, PrioritySense, Value};
use crate::session::SessionId;

/// One accepted set request, or a path's baseline when `owner` is `None`.
#[derive(Debug, Clone, PartialEq)]
pub struct SetRequest {
    pub kind: AttributeKind,
    pub path: AttrPath,
    pub value: Value,
    /// Originating session; `None` marks the baseline default.
    pub owner: Option<SessionId>,
    /// Monotonic wall-clock stamp in microseconds, assigned by the worker.
    pub stamp_us: u64,
}

impl SetRequest {
    /// Priority comparison: `Less` means `self` outranks `other`.
    ///
    /// Two requests on the same path always share a kind; the comparator
    /// follows `self`'s.
    pub fn priority_cmp(&self, other: &SetRequest) -> Ordering {
        match self.kind.sense() {
            PrioritySense::LowerWins => self.value.numeric_cmp(other.value),
            PrioritySense::HigherWins => other.value.numeric_cmp(self.value),
            PrioritySense::Governor => self.governor_cmp(other),
        }
    }

    // Userspace dominates; between two non-userspace governors the later
    // stamp wins; equal stamps compare equal.
    fn governor_cmp(&self, other: &SetRequest) -> Ordering {
        let g1 = self.value.as_u64();
        let g2 = other.value.as_u64();
        if g1 == g2 {
            Ordering::Equal
        } else if g1 == Governor::Userspace.code() {
            Ordering::Less
        } else if g2 == Governor::Userspace.code() {
            Ordering::Greater
        } else {
            other.stamp_us.cmp(&self.stamp_us)
        }
    }
}

/// Per-path ordered request lists, highest priority first.
#[derive(Debug, Default)]
pub struct Ladder {
    rungs: HashMap<AttrPath, Vec<SetRequest>>,
}

impl Ladder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert at priority rank. Among equals the newcomer lands last, so
    /// relative order for a given insertion sequence is deterministic.
    pub fn insert(&mut self, req: SetRequest) {
        let list = self.rungs.entry(req.path.clone()).or_default();
        let pos = list
            .iter()
            .position(|e| e.priority_cmp(&req) == Ordering::Greater)
            .unwrap_or(list.len());
        list.insert(pos, req);
    }

    /// Remove and return the entry owned by `owner` (`None` withdraws the
    /// baseline). Returns the entry so the caller can compare its priority
    /// against the new head before dropping it.
    pub fn withdraw(&mut self, path: &AttrPath, owner: Option<SessionId>) -> Option<SetRequest> {
        let list = self.rungs.get_mut(path)?;
        let idx = list.iter().position(|e| e.owner == owner)?;
        let req = list.remove(idx);
        if list.is_empty() {
            self.rungs.remove(path);
        }
        Some(req)
    }

    /// The authoritative entry for a path.
    pub fn head(&self, path: &AttrPath) -> Option<&SetRequest> {
        self.rungs.get(path).and_then(|list| list.first())
    }

    /// A request is the winner iff the comparator puts it at head rank.
    pub fn is_winner(&self, req: &SetRequest) -> bool {
        self.head(&req.path).is_some_and(|head| req.priority_cmp(head) == Ordering::Equal)
    }

    pub fn entries(&self, path: &AttrPath) -> &[SetRequest] {
        self.rungs.get(path).map(Vec::as_slice).unwrap_or_default()
    }

    pub fn paths(&self) -> impl Iterator<Item = &AttrPath> {
        self.rungs.keys()
    }

    pub fn len(&self) -> usize {
        self.rungs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rungs.is_empty()
    }
}

/// Baseline values per path, lazily captured on first contested touch.
///
/// Each entry mirrors the owner-less ladder entry for the same path; the
/// two are kept in step by the arbiter. A baseline is only ever replaced
/// (by a persistent session), never removed while the path is known.
#[derive(Debug, Default)]
pub struct DefaultRegister {
    values: HashMap<AttrPath, SetRequest>,
}

impl DefaultRegister {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn contains(&self, path: &AttrPath) -> bool {
        self.values.contains_key(path)
    }

    pub fn get(&self, path: &AttrPath) -> Option<&SetRequest> {
        self.values.get(path)
    }

    /// Record (or overwrite) the baseline for a path.
    pub fn insert(&mut self, req: SetRequest) {
        self.values.insert(req.path.clone(), req);
    }

    pub fn iter(&self) -> impl Iterator<Item = &SetRequest> {
        self.values.values()
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

#[cfg(test)]
#[path = "ladder_tests.rs"]
mod tests;
