// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Connection allow-list: which uids may open a session.
//!
//! One decimal uid per line, `#` comments, `*` allows everyone. The file is
//! restored with a default template at startup and read once; uid 0 is
//! always allowed regardless of contents.

use std::collections::HashSet;
use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;
use tracing::info;

#[derive(Debug, Error)]
pub enum PermissionsError {
    #[error("unable to read permissions file {path}: {source}")]
    Read { path: PathBuf, source: std::io::Error },

    #[error("unable to create permissions file {path}: {source}")]
    Create { path: PathBuf, source: std::io::Error },

    #[error("malformed uid {line:?} in {path}")]
    Malformed { path: PathBuf, line: String },
}

const DEFAULT_CONTENTS: &str = "\
# pwrd connection allow-list.
#
# One numeric uid per line; '*' allows every uid. Root is always allowed.
*
";

#[derive(Debug, Clone)]
pub struct Permissions {
    allow_all: bool,
    uids: HashSet<u32>,
}

impl Permissions {
    /// Restore the backing file if it is missing, then load it. Called once
    /// at startup; failure is fatal to the daemon.
    pub fn restore(path: &Path) -> Result<Self, PermissionsError> {
        if !path.exists() {
            if let Some(parent) = path.parent() {
                fs::create_dir_all(parent)
                    .map_err(|e| PermissionsError::Create { path: path.to_path_buf(), source: e })?;
            }
            fs::write(path, DEFAULT_CONTENTS)
                .map_err(|e| PermissionsError::Create { path: path.to_path_buf(), source: e })?;
            info!("restored default permissions file at {}", path.display());
        }
        Self::load(path)
    }

    pub fn load(path: &Path) -> Result<Self, PermissionsError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| PermissionsError::Read { path: path.to_path_buf(), source: e })?;

        let mut allow_all = false;
        let mut uids = HashSet::new();
        for line in contents.lines() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            if line == "*" {
                allow_all = true;
                continue;
            }
            let uid = line.parse::<u32>().map_err(|_| PermissionsError::Malformed {
                path: path.to_path_buf(),
                line: line.to_string(),
            })?;
            uids.insert(uid);
        }

        Ok(Self { allow_all, uids })
    }

    pub fn check(&self, uid: u32) -> bool {
        uid == 0 || self.allow_all || self.uids.contains(&uid)
    }
}

#[cfg(test)]
#[path = "permissions_tests.rs"]
mod tests;
