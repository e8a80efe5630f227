// SPDX-License-Identifier: Apache-2.0

#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]

//! Engine binary smoke tests over the real stdio protocol.

use assert_cmd::Command;
use predicates::prelude::*;
use serde_json::json;

fn engine(dir: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("vigil-engine").unwrap();
    cmd.env("MEMORY_STORE_FILE_PATH", dir.join("memory.json"))
        .env("EXECUTION_PERSISTENCE_BACKEND", "memory")
        .env("LOG_MIN_LEVEL", "error");
    cmd
}

#[test]
fn banner_then_clean_exit() {
    let dir = tempfile::tempdir().unwrap();
    engine(dir.path())
        .write_stdin("exit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("--- WORLD ONLINE ---"));
}

#[test]
fn eof_is_a_clean_shutdown_too() {
    let dir = tempfile::tempdir().unwrap();
    engine(dir.path()).write_stdin("").assert().success();
}

#[test]
fn interactive_god_command_round_trip() {
    let dir = tempfile::tempdir().unwrap();
    engine(dir.path())
        .write_stdin("mark add alpha_hall 0 64 0 town:alpha\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("marker alpha_hall raised"));

    // State survives the restart.
    engine(dir.path())
        .write_stdin("mark list\nexit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("alpha_hall"));
}

#[test]
fn handoff_frame_yields_a_result_line() {
    let dir = tempfile::tempdir().unwrap();
    let handoff = json!({
        "schemaVersion": "execution-handoff.v1",
        "handoffId": "h-smoke-1",
        "proposalId": "prop-1",
        "idempotencyKey": "key-smoke-1",
        "snapshotHash": "stale-on-purpose",
        "decisionEpoch": 999,
        "proposal": {"type": "GOD_COMMAND"},
        "command": "mark add keep 1 64 1",
        "executionRequirements": {
            "expectedSnapshotHash": "stale-on-purpose",
            "expectedDecisionEpoch": 999,
            "preconditions": []
        }
    });
    engine(dir.path())
        .write_stdin(format!("{handoff}\nexit\n"))
        .assert()
        .success()
        .stdout(
            predicate::str::contains("execution-result.v1")
                .and(predicate::str::contains("STALE_DECISION_EPOCH")),
        );
}

#[test]
fn memory_request_yields_a_context_line() {
    let dir = tempfile::tempdir().unwrap();
    let request = json!({
        "type": "world-memory-request.v1",
        "scope": {"chronicleLimit": 5}
    });
    engine(dir.path())
        .write_stdin(format!("{request}\nexit\n"))
        .assert()
        .success()
        .stdout(predicate::str::contains("world-memory-context.v1"));
}

#[test]
fn unknown_backend_is_a_fatal_startup_error() {
    let dir = tempfile::tempdir().unwrap();
    engine(dir.path())
        .env("EXECUTION_PERSISTENCE_BACKEND", "etcd")
        .write_stdin("exit\n")
        .assert()
        .failure()
        .stderr(predicate::str::contains("etcd"));
}

#[test]
fn legacy_prompt_prefix_is_tolerated() {
    let dir = tempfile::tempdir().unwrap();
    engine(dir.path())
        .write_stdin("> mark add gate 0 64 0\n> exit\n")
        .assert()
        .success()
        .stdout(predicate::str::contains("marker gate raised"));
}
