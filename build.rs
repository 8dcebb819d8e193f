// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Builds the `pwrd` binary (owned by the `pwrd-daemon` package) ahead of
//! the end-to-end specs and exposes it the same way Cargo would if the
//! binary lived in this package: via `CARGO_BIN_EXE_pwrd`.

use std::env;
use std::path::PathBuf;
use std::process::{exit, Command};

fn main() {
    let manifest_dir = PathBuf::from(env::var("CARGO_MANIFEST_DIR").unwrap_or_default());
    let target_dir = env::var("CARGO_TARGET_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| manifest_dir.join("target"));
    let profile = env::var("PROFILE").unwrap_or_else(|_| "debug".to_string());
    let profile_dir = if profile == "release" { "release" } else { "debug" };
    let cargo = env::var("CARGO").unwrap_or_else(|_| "cargo".to_string());

    let mut args = vec!["build".to_string(), "-p".to_string(), "pwrd-daemon".to_string(), "--bin".to_string(), "pwrd".to_string()];
    if profile_dir == "release" {
        args.push("--release".to_string());
    }

    let status = Command::new(&cargo)
        .args(&args)
        .current_dir(&manifest_dir)
        .status();

    match status {
        Ok(status) if status.success() => {}
        Ok(status) => {
            eprintln!("building pwrd binary exited with {status}");
            exit(1);
        }
        Err(err) => {
            eprintln!("failed to run `{cargo} {}`: {err}", args.join(" "));
            exit(1);
        }
    }

    let bin_path = target_dir.join(profile_dir).join("pwrd");
    println!("cargo:rustc-env=CARGO_BIN_EXE_pwrd={}", bin_path.display());
    println!("cargo:rerun-if-changed=crates/daemon/src");
    println!("cargo:rerun-if-changed=crates/core/src");
}
