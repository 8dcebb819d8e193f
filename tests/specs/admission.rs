// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Admission-control specs with a lowered session cap.

use serial_test::serial;

use crate::prelude::*;

#[test]
#[serial]
fn over_cap_connections_get_one_failure_frame() {
    let mut daemon = DaemonFixture::prepare();
    daemon.spawn(&[], &[("PWRD_MAX_SESSIONS", "2")]);
    daemon.wait_ready();

    let mut first = daemon.connect();
    let mut second = daemon.connect();
    assert_eq!(first.auth("app", "one")["code"], "success");
    assert_eq!(second.auth("app", "two")["code"], "success");

    // the third connect is accepted, refused, and closed
    let mut third = daemon.connect();
    let refusal = third.recv();
    assert_eq!(refusal["code"], "failure");
    assert_eq!(refusal["sequence"], 0);
    assert!(third.at_eof());

    // existing sessions are unaffected
    let response = first.request(&json!({"type": "LogLevel", "debug": 0, "trace": 0}));
    assert_eq!(response["code"], "success");

    // a freed slot admits the next connect
    drop(second);
    let admitted = wait_for(SPEC_WAIT_MAX_MS, || {
        let mut conn = daemon.connect();
        conn.auth("app", "late")["code"] == "success"
    });
    assert!(admitted, "slot was never freed");

    daemon.terminate();
}

#[test]
#[serial]
fn over_cap_logging_is_throttled_per_episode() {
    let mut daemon = DaemonFixture::prepare();
    daemon.spawn(&[], &[("PWRD_MAX_SESSIONS", "1")]);
    daemon.wait_ready();

    let mut holder = daemon.connect();
    assert_eq!(holder.auth("app", "holder")["code"], "success");

    // two rejections in the same episode: one ERROR line
    for _ in 0..2 {
        let mut conn = daemon.connect();
        assert_eq!(conn.recv()["code"], "failure");
    }
    assert!(wait_for(SPEC_WAIT_MAX_MS, || limit_errors(&daemon) == 1));
    std::thread::sleep(Duration::from_millis(200));
    assert_eq!(limit_errors(&daemon), 1);

    // an admission resets the throttle; the next rejection logs again
    drop(holder);
    let mut new_holder = None;
    let admitted = wait_for(SPEC_WAIT_MAX_MS, || {
        let mut conn = daemon.connect();
        if conn.auth("app", "second-holder")["code"] == "success" {
            new_holder = Some(conn);
            true
        } else {
            false
        }
    });
    assert!(admitted, "slot was never freed");

    let mut conn = daemon.connect();
    assert_eq!(conn.recv()["code"], "failure");
    assert!(wait_for(SPEC_WAIT_MAX_MS, || limit_errors(&daemon) == 2));

    drop(new_holder);
    daemon.terminate();
}

/// ERROR-level "limit reached" lines in the daemon log.
fn limit_errors(daemon: &DaemonFixture) -> usize {
    std::fs::read_to_string(daemon.log_path())
        .unwrap_or_default()
        .lines()
        .filter(|line| line.contains("ERROR") && line.contains("open session limit reached"))
        .count()
}
