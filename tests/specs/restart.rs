// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Post-crash restart gate specs.
//!
//! A present dirty marker means the previous instance died with hardware
//! overrides possibly still applied; the daemon must refuse to continue
//! silently.

use serial_test::serial;

use crate::prelude::*;

#[test]
#[serial]
fn dirty_start_without_permission_escalates_and_parks() {
    let mut daemon = DaemonFixture::prepare();
    std::fs::write(daemon.run_dir().join("dirty"), "").unwrap();
    let witness = daemon.temp.path().join("admin-down-ran");

    let admin_down = format!("touch {}", witness.display());
    daemon.spawn(&[], &[("PWRD_ADMIN_DOWN_CMD", admin_down.as_str())]);

    // the escalation runs, the socket never appears
    assert!(wait_for(SPEC_WAIT_MAX_MS, || witness.exists()), "admin-down never invoked");
    std::thread::sleep(Duration::from_millis(500));
    assert!(!daemon.socket_path().exists());

    // parked until a termination signal, then exits 1
    let code = daemon.terminate().unwrap();
    assert_eq!(code, 1);
}

#[test]
#[serial]
fn dirty_start_with_the_restart_flag_proceeds_and_clears() {
    let mut daemon = DaemonFixture::prepare();
    std::fs::write(daemon.run_dir().join("dirty"), "").unwrap();

    daemon.spawn(&["-r"], &[]);
    daemon.wait_ready();
    assert!(!daemon.dirty_path().exists());

    let mut conn = daemon.connect();
    assert_eq!(conn.auth("app", "after-restart")["code"], "success");
    drop(conn);
    daemon.terminate();
}

#[test]
#[serial]
fn operator_marker_permits_a_dirty_restart() {
    let mut daemon = DaemonFixture::prepare();
    std::fs::write(daemon.run_dir().join("dirty"), "").unwrap();
    std::fs::write(daemon.allow_restart_path(), "").unwrap();

    daemon.spawn(&[], &[]);
    daemon.wait_ready();
    assert!(!daemon.dirty_path().exists());

    daemon.terminate();
}
