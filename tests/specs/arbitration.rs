// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Arbitration specs over the wire: priority, rollback, sequencing, and
//! request validation.

use crate::prelude::*;

#[test]
fn tighter_power_cap_wins_and_rollback_restores_the_runner_up() {
    let mut daemon = DaemonFixture::start();
    let control = daemon.control_file("power_limit", "200");

    let mut first = daemon.connect();
    first.auth("app", "first");
    assert_eq!(first.set_uint("power_limit_max", &control, 150)["code"], "success");
    assert_eq!(read_trim(&control), "150");

    let mut second = daemon.connect();
    second.auth("app", "second");
    assert_eq!(second.set_uint("power_limit_max", &control, 100)["code"], "success");
    assert_eq!(read_trim(&control), "100");

    drop(second);
    assert!(wait_for(SPEC_WAIT_MAX_MS, || read_trim(&control) == "150"));

    drop(first);
    assert!(wait_for(SPEC_WAIT_MAX_MS, || read_trim(&control) == "200"));

    daemon.terminate();
}

#[test]
fn responses_are_sequenced_in_issue_order() {
    let mut daemon = DaemonFixture::start();
    let control = daemon.control_file("power_limit", "200");

    let mut conn = daemon.connect();
    let auth = conn.auth("app", "sequencer");
    assert_eq!(auth["sequence"], 0);

    // pipeline five sets, then collect the replies
    for value in [190u64, 180, 170, 160, 150] {
        conn.send(&json!({
            "type": "Set",
            "kind": "power_limit_max",
            "path": control.to_string_lossy(),
            "value": {"uint": value},
        }));
    }
    for expected_seq in 1..=5u64 {
        let response = conn.recv();
        assert_eq!(response["code"], "success");
        assert_eq!(response["sequence"], expected_seq);
    }
    assert_eq!(read_trim(&control), "150");

    daemon.terminate();
}

#[test]
fn set_before_auth_is_invalid() {
    let mut daemon = DaemonFixture::start();
    let control = daemon.control_file("power_limit", "200");

    let mut conn = daemon.connect();
    let response = conn.set_uint("power_limit_max", &control, 150);
    assert_eq!(response["code"], "invalid");
    assert_eq!(read_trim(&control), "200");

    daemon.terminate();
}

#[test]
fn redundant_auth_is_invalid() {
    let mut daemon = DaemonFixture::start();
    let mut conn = daemon.connect();

    assert_eq!(conn.auth("app", "once")["code"], "success");
    assert_eq!(conn.auth("os", "twice")["code"], "invalid");

    daemon.terminate();
}

#[test]
fn unknown_request_type_is_invalid_but_keeps_the_session() {
    let mut daemon = DaemonFixture::start();
    let mut conn = daemon.connect();

    let response = conn.request(&json!({"type": "Frobnicate"}));
    assert_eq!(response["code"], "invalid");
    assert_eq!(response["sequence"], 0);

    // the session survives and can still authorize
    let auth = conn.auth("app", "still-here");
    assert_eq!(auth["code"], "success");
    assert_eq!(auth["sequence"], 1);

    daemon.terminate();
}

#[test]
fn malformed_frame_tears_the_session_down_and_rolls_back() {
    let mut daemon = DaemonFixture::start();
    let control = daemon.control_file("power_limit", "200");

    let mut conn = daemon.connect();
    conn.auth("app", "malformed");
    conn.set_uint("power_limit_max", &control, 150);
    assert_eq!(read_trim(&control), "150");

    conn.send_raw(b"this is not json");
    assert!(conn.at_eof(), "daemon should close the session on a malformed frame");
    assert!(wait_for(SPEC_WAIT_MAX_MS, || read_trim(&control) == "200"));

    daemon.terminate();
}

#[test]
fn loglevel_reports_the_newly_effective_levels() {
    let mut daemon = DaemonFixture::start();
    let mut conn = daemon.connect();

    let response = conn.request(&json!({"type": "LogLevel", "debug": 1, "trace": 0}));
    assert_eq!(response["code"], "success");
    assert_eq!(response["levels"], json!({"debug": 1, "trace": 0}));

    let response = conn.request(&json!({"type": "LogLevel", "debug": 9, "trace": 0}));
    assert_eq!(response["code"], "invalid");

    daemon.terminate();
}

#[test]
fn dump_is_restricted_to_root() {
    let mut daemon = DaemonFixture::start();
    let mut conn = daemon.connect();
    conn.auth("app", "dumper");

    let response = conn.request(&json!({"type": "Dump"}));
    if current_uid() == 0 {
        assert_eq!(response["code"], "success");
    } else {
        assert_eq!(response["code"], "no_perm");
    }

    daemon.terminate();
}
