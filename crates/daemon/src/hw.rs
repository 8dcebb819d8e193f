// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Hardware sink/source: text encodings against kernel-maintained control
//! files.
//!
//! Every operation opens the file, transfers the text encoding, and closes
//! it; the daemon holds no hardware file descriptors between operations.
//! The `CstateLimit` kind fans out over the per-state `disable` files, and
//! `Gov` maps between governor names and wire codes.

use std::fmt::Display;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::debug;

use pwrd_core::{AttrPath, AttributeKind, Governor, Value};

#[derive(Debug, Error)]
pub enum HwError {
    #[error("unable to access {path}: {source}")]
    Io { path: PathBuf, source: std::io::Error },

    #[error("malformed value {text:?} in {path}")]
    Parse { path: PathBuf, text: String },

    #[error("unknown governor {name:?} in {path}")]
    UnknownGovernor { path: PathBuf, name: String },

    #[error("governor code {code} is not valid")]
    UnknownGovernorCode { code: u64 },

    #[error("c-state limit {value} out of range for {states} states")]
    CstateOutOfRange { value: u64, states: u64 },
}

/// Which text encoding a plain scalar read should parse.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValueKind {
    Uint,
    Float,
}

impl ValueKind {
    /// The encoding a value already carries; reads for a path's baseline
    /// follow the triggering request's encoding.
    pub fn of(value: Value) -> Self {
        match value {
            Value::Uint(_) => Self::Uint,
            Value::Float(_) => Self::Float,
        }
    }
}

/// Hardware sink/source consumed by the arbiter.
pub trait PowerIo: Send + Sync {
    /// Read the current value of a control point.
    fn read(&self, path: &AttrPath, kind: AttributeKind, hint: ValueKind)
        -> Result<Value, HwError>;

    /// Write a value to a control point.
    fn write(&self, path: &AttrPath, kind: AttributeKind, value: Value) -> Result<(), HwError>;
}

/// Production implementation over sysfs-style text files.
#[derive(Debug, Default, Clone)]
pub struct SysfsIo;

impl PowerIo for SysfsIo {
    fn read(
        &self,
        path: &AttrPath,
        kind: AttributeKind,
        hint: ValueKind,
    ) -> Result<Value, HwError> {
        let value = match kind {
            AttributeKind::CstateLimit => read_cstate_limit(Path::new(path.as_str()))?,
            AttributeKind::Gov => read_governor(Path::new(path.as_str()))?,
            _ => match hint {
                ValueKind::Uint => Value::Uint(read_parsed(Path::new(path.as_str()))?),
                ValueKind::Float => Value::Float(read_parsed(Path::new(path.as_str()))?),
            },
        };
        debug!("read value of {} is {}", path, value);
        Ok(value)
    }

    fn write(&self, path: &AttrPath, kind: AttributeKind, value: Value) -> Result<(), HwError> {
        debug!("write value of {} is {}", path, value);
        match kind {
            AttributeKind::CstateLimit => write_cstate_limit(Path::new(path.as_str()), value),
            AttributeKind::Gov => write_governor(Path::new(path.as_str()), value),
            _ => write_text(Path::new(path.as_str()), value),
        }
    }
}

fn io_err(path: &Path, source: std::io::Error) -> HwError {
    HwError::Io { path: path.to_path_buf(), source }
}

fn write_text(path: &Path, value: impl Display) -> Result<(), HwError> {
    fs::write(path, value.to_string()).map_err(|e| io_err(path, e))
}

fn read_parsed<T: std::str::FromStr>(path: &Path) -> Result<T, HwError> {
    let text = fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let trimmed = text.trim();
    trimmed
        .parse::<T>()
        .map_err(|_| HwError::Parse { path: path.to_path_buf(), text: trimmed.to_string() })
}

fn write_governor(path: &Path, value: Value) -> Result<(), HwError> {
    let code = value.as_u64();
    let gov = Governor::from_code(code).ok_or(HwError::UnknownGovernorCode { code })?;
    write_text(path, gov.name())
}

fn read_governor(path: &Path) -> Result<Value, HwError> {
    let text = fs::read_to_string(path).map_err(|e| io_err(path, e))?;
    let name = text.trim();
    let gov = Governor::from_name(name).ok_or_else(|| HwError::UnknownGovernor {
        path: path.to_path_buf(),
        name: name.to_string(),
    })?;
    Ok(Value::Uint(gov.code()))
}

// Count the state[0-N] subdirectories under a cpuidle directory.
fn cstate_count(path: &Path) -> Result<u64, HwError> {
    let mut states = 0;
    for entry in fs::read_dir(path).map_err(|e| io_err(path, e))? {
        let entry = entry.map_err(|e| io_err(path, e))?;
        let is_dir = entry.file_type().map(|t| t.is_dir()).unwrap_or(false);
        if is_dir && entry.file_name().to_string_lossy().starts_with("state") {
            states += 1;
        }
    }
    Ok(states)
}

fn disable_file(path: &Path, state: u64) -> PathBuf {
    path.join(format!("state{}", state)).join("disable")
}

/// A limit of N enables states 0..=N and disables the rest: `0` is written
/// to `state{1..=N}/disable` and `1` to every deeper state, in ascending
/// order. State 0 has no disable file and is always available.
fn write_cstate_limit(path: &Path, value: Value) -> Result<(), HwError> {
    let limit = value.as_u64();
    let states = cstate_count(path)?;
    if limit >= states {
        return Err(HwError::CstateOutOfRange { value: limit, states });
    }

    for state in 1..states {
        let disable = u64::from(state > limit);
        write_text(&disable_file(path, state), disable)?;
    }
    Ok(())
}

/// The current limit is the index before the first disabled state.
fn read_cstate_limit(path: &Path) -> Result<Value, HwError> {
    let states = cstate_count(path)?;
    let mut state = 1;
    while state < states {
        let disabled: u64 = read_parsed(&disable_file(path, state))?;
        if disabled > 0 {
            break;
        }
        state += 1;
    }
    Ok(Value::Uint(state - 1))
}

#[cfg(test)]
#[path = "hw_tests.rs"]
mod tests;
