// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Shared harness for pwrd end-to-end specs.

#![allow(dead_code)]

use std::io::{Read, Write};
use std::os::unix::net::UnixStream;
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::time::Instant;

use tempfile::TempDir;

pub use serde_json::json;
pub use serde_json::Value as Json;
pub use std::time::Duration;

pub const SPEC_WAIT_MAX_MS: u64 = 10_000;

/// Poll a condition until it holds or the deadline passes.
pub fn wait_for(max_ms: u64, mut cond: impl FnMut() -> bool) -> bool {
    let deadline = Instant::now() + Duration::from_millis(max_ms);
    while Instant::now() < deadline {
        if cond() {
            return true;
        }
        std::thread::sleep(Duration::from_millis(20));
    }
    false
}

pub fn read_trim(path: &Path) -> String {
    std::fs::read_to_string(path).unwrap().trim().to_string()
}

/// Effective uid of the test process (specs usually run unprivileged).
pub fn current_uid() -> u32 {
    let output = Command::new("id").arg("-u").output().unwrap();
    String::from_utf8_lossy(&output.stdout).trim().parse().unwrap()
}

/// A daemon instance running against a temporary state tree.
pub struct DaemonFixture {
    pub temp: TempDir,
    child: Option<Child>,
}

impl DaemonFixture {
    /// Create the state tree without starting the daemon, so specs can
    /// seed markers first.
    pub fn prepare() -> Self {
        let temp = TempDir::new().unwrap();
        std::fs::create_dir_all(temp.path().join("run")).unwrap();
        Self { temp, child: None }
    }

    pub fn start() -> Self {
        let mut fixture = Self::prepare();
        fixture.spawn(&[], &[]);
        fixture.wait_ready();
        fixture
    }

    /// Spawn the daemon in the foreground with extra args/env.
    pub fn spawn(&mut self, args: &[&str], env: &[(&str, &str)]) {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin("pwrd"));
        cmd.arg("-n")
            .args(args)
            .env("PWRD_RUN_DIR", self.run_dir())
            .env("PWRD_ETC_DIR", self.temp.path().join("etc"))
            .env("PWRD_LOG_DIR", self.log_dir())
            .env("PWRD_ALLOW_RESTART", self.allow_restart_path())
            .stdout(Stdio::null())
            .stderr(Stdio::null());
        for (key, value) in env {
            cmd.env(key, value);
        }
        self.child = Some(cmd.spawn().unwrap());
    }

    pub fn wait_ready(&self) {
        assert!(
            wait_for(SPEC_WAIT_MAX_MS, || self.socket_path().exists()),
            "daemon socket never appeared"
        );
    }

    pub fn run_dir(&self) -> PathBuf {
        self.temp.path().join("run")
    }

    pub fn log_dir(&self) -> PathBuf {
        self.temp.path().join("log")
    }

    pub fn log_path(&self) -> PathBuf {
        self.log_dir().join("pwrd.log")
    }

    pub fn socket_path(&self) -> PathBuf {
        self.run_dir().join("pwrd.sock")
    }

    pub fn pidfile_path(&self) -> PathBuf {
        self.run_dir().join("pwrd.pid")
    }

    pub fn dirty_path(&self) -> PathBuf {
        self.run_dir().join("dirty")
    }

    pub fn allow_restart_path(&self) -> PathBuf {
        self.temp.path().join("allow-restart")
    }

    /// Create a fake hardware control file and return its path.
    pub fn control_file(&self, name: &str, contents: &str) -> PathBuf {
        let path = self.temp.path().join(name);
        std::fs::write(&path, contents).unwrap();
        path
    }

    pub fn connect(&self) -> Conn {
        Conn::open(&self.socket_path())
    }

    /// SIGTERM the daemon and wait for it; returns the exit code.
    pub fn terminate(&mut self) -> Option<i32> {
        let mut child = self.child.take()?;
        let _ = Command::new("kill").arg("-TERM").arg(child.id().to_string()).status();
        let exited = wait_for(SPEC_WAIT_MAX_MS, || matches!(child.try_wait(), Ok(Some(_))));
        if !exited {
            let _ = child.kill();
        }
        child.wait().ok().and_then(|status| status.code())
    }
}

impl Drop for DaemonFixture {
    fn drop(&mut self) {
        if let Some(mut child) = self.child.take() {
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

/// One client connection speaking the length-prefixed JSON protocol.
pub struct Conn {
    stream: UnixStream,
}

impl Conn {
    pub fn open(path: &Path) -> Self {
        let stream = UnixStream::connect(path).unwrap();
        stream.set_read_timeout(Some(Duration::from_secs(10))).unwrap();
        Self { stream }
    }

    pub fn send(&mut self, request: &Json) {
        let payload = serde_json::to_vec(request).unwrap();
        self.send_raw(&payload);
    }

    pub fn send_raw(&mut self, payload: &[u8]) {
        self.stream.write_all(&(payload.len() as u32).to_be_bytes()).unwrap();
        self.stream.write_all(payload).unwrap();
    }

    pub fn recv(&mut self) -> Json {
        let mut len = [0u8; 4];
        self.stream.read_exact(&mut len).unwrap();
        let mut buf = vec![0u8; u32::from_be_bytes(len) as usize];
        self.stream.read_exact(&mut buf).unwrap();
        serde_json::from_slice(&buf).unwrap()
    }

    /// True when the daemon has closed this connection.
    pub fn at_eof(&mut self) -> bool {
        let mut byte = [0u8; 1];
        matches!(self.stream.read(&mut byte), Ok(0))
    }

    pub fn request(&mut self, request: &Json) -> Json {
        self.send(request);
        self.recv()
    }

    pub fn auth(&mut self, role: &str, context_name: &str) -> Json {
        self.request(&json!({"type": "Auth", "role": role, "context_name": context_name}))
    }

    pub fn set_uint(&mut self, kind: &str, path: &Path, value: u64) -> Json {
        self.request(&json!({
            "type": "Set",
            "kind": kind,
            "path": path.to_string_lossy(),
            "value": {"uint": value},
        }))
    }
}
