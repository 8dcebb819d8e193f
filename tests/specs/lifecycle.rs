// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Daemon lifecycle specs: pidfile, rendezvous socket, dirty marker, and
//! clean shutdown with rollback.

use crate::prelude::*;

#[test]
fn startup_writes_pidfile_and_socket_and_shutdown_removes_them() {
    let mut daemon = DaemonFixture::start();

    assert!(daemon.socket_path().exists());
    let pid = read_trim(&daemon.pidfile_path());
    assert!(pid.parse::<u32>().is_ok(), "pidfile holds {:?}", pid);

    let code = daemon.terminate().unwrap();
    assert_eq!(code, 0);
    assert!(!daemon.socket_path().exists());
    assert!(!daemon.pidfile_path().exists());
}

#[test]
fn dirty_marker_tracks_live_sessions() {
    let mut daemon = DaemonFixture::start();
    assert!(!daemon.dirty_path().exists());

    let conn = daemon.connect();
    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || daemon.dirty_path().exists()),
        "dirty marker never appeared"
    );

    drop(conn);
    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || !daemon.dirty_path().exists()),
        "dirty marker survived the last disconnect"
    );

    daemon.terminate();
}

#[test]
fn sigterm_rolls_outstanding_overrides_back() {
    let mut daemon = DaemonFixture::start();
    let control = daemon.control_file("power_limit", "200");

    let mut conn = daemon.connect();
    assert_eq!(conn.auth("app", "lifecycle-spec")["code"], "success");
    let response = conn.set_uint("power_limit_max", &control, 150);
    assert_eq!(response["code"], "success");
    assert_eq!(read_trim(&control), "150");

    let code = daemon.terminate().unwrap();
    assert_eq!(code, 0);
    assert_eq!(read_trim(&control), "200");
}

#[test]
fn disconnect_rolls_back_while_the_daemon_keeps_running() {
    let mut daemon = DaemonFixture::start();
    let control = daemon.control_file("scaling_min_freq", "800");

    let mut conn = daemon.connect();
    conn.auth("app", "floor-holder");
    conn.set_uint("freq_limit_min", &control, 1200);
    assert_eq!(read_trim(&control), "1200");

    drop(conn);
    assert!(
        wait_for(SPEC_WAIT_MAX_MS, || read_trim(&control) == "800"),
        "floor was not rolled back to the baseline"
    );

    // the daemon is still serving
    let mut again = daemon.connect();
    assert_eq!(again.auth("app", "second")["code"], "success");
    daemon.terminate();
}
