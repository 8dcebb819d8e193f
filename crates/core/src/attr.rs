// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Attribute kinds, values, and the cpufreq governor table.

use std::cmp::Ordering;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Opaque key naming one writable hardware control point.
///
/// The daemon never interprets the path beyond using it as a ladder key;
/// the hardware layer writes to the named sysfs sink.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct AttrPath(pub String);

impl AttrPath {
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for AttrPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AttrPath {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

/// Semantic category of a control point.
///
/// The kind determines the priority sense (which end of the value range
/// outranks the other) and the text encoding against the hardware sink.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeKind {
    /// Requested operating frequency.
    FreqReq,
    /// Frequency floor.
    FreqLimitMin,
    /// Frequency ceiling.
    FreqLimitMax,
    /// RAPL power cap.
    PowerLimitMax,
    /// RAPL power floor.
    PowerLimitMin,
    /// Deepest allowed C-state index.
    CstateLimit,
    /// P-state governor selector.
    Gov,
}

/// Which way the priority comparator leans for a kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PrioritySense {
    /// A tighter cap wins: the smaller value is higher priority.
    LowerWins,
    /// A higher floor wins: the larger value is higher priority.
    HigherWins,
    /// Userspace dominates every other governor; among the rest the
    /// later-stamped request wins.
    Governor,
}

impl AttributeKind {
    pub fn sense(self) -> PrioritySense {
        match self {
            Self::CstateLimit | Self::FreqReq | Self::FreqLimitMax | Self::PowerLimitMax => {
                PrioritySense::LowerWins
            }
            Self::FreqLimitMin | Self::PowerLimitMin => PrioritySense::HigherWins,
            Self::Gov => PrioritySense::Governor,
        }
    }
}

impl fmt::Display for AttributeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Self::FreqReq => "freq_req",
            Self::FreqLimitMin => "freq_limit_min",
            Self::FreqLimitMax => "freq_limit_max",
            Self::PowerLimitMax => "power_limit_max",
            Self::PowerLimitMin => "power_limit_min",
            Self::CstateLimit => "cstate_limit",
            Self::Gov => "gov",
        };
        f.write_str(name)
    }
}

/// A set-request payload: integer or double, never mixed within one path.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Value {
    Uint(u64),
    Float(f64),
}

impl Value {
    pub fn as_u64(self) -> u64 {
        match self {
            Self::Uint(v) => v,
            Self::Float(v) => v as u64,
        }
    }

    pub fn as_f64(self) -> f64 {
        match self {
            Self::Uint(v) => v as f64,
            Self::Float(v) => v,
        }
    }

    /// Plain numeric ordering, used by the kind-directed comparator.
    ///
    /// Values on one path never mix types; if they somehow do, both sides
    /// are compared as floats.
    pub fn numeric_cmp(self, other: Self) -> Ordering {
        match (self, other) {
            (Self::Uint(a), Self::Uint(b)) => a.cmp(&b),
            (a, b) => a.as_f64().partial_cmp(&b.as_f64()).unwrap_or(Ordering::Equal),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uint(v) => write!(f, "{}", v),
            Self::Float(v) => write!(f, "{:.6}", v),
        }
    }
}

/// Linux cpufreq governors, in wire-code order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Governor {
    Ondemand,
    Performance,
    Conservative,
    Powersave,
    Userspace,
}

impl Governor {
    pub const ALL: [Governor; 5] = [
        Self::Ondemand,
        Self::Performance,
        Self::Conservative,
        Self::Powersave,
        Self::Userspace,
    ];

    pub fn code(self) -> u64 {
        match self {
            Self::Ondemand => 0,
            Self::Performance => 1,
            Self::Conservative => 2,
            Self::Powersave => 3,
            Self::Userspace => 4,
        }
    }

    pub fn from_code(code: u64) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.code() == code)
    }

    /// Name as written to the sysfs `scaling_governor` file.
    pub fn name(self) -> &'static str {
        match self {
            Self::Ondemand => "ondemand",
            Self::Performance => "performance",
            Self::Conservative => "conservative",
            Self::Powersave => "powersave",
            Self::Userspace => "userspace",
        }
    }

    pub fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|g| g.name() == name)
    }
}

impl fmt::Display for Governor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[cfg(test)]
#[path = "attr_tests.rs"]
mod tests;
