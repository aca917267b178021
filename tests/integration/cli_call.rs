use predicates::prelude::*;

use crate::common::TestEnv;

#[test]
fn backend_failure_is_an_error_envelope() {
    let env = TestEnv::new();

    env.authed()
        .args([
            "call",
            "get_pull_request",
            r#"{"projectKey": "PROJ", "repoSlug": "repo", "prId": 1}"#,
        ])
        .assert()
        .success()
        .stdout(predicate::str::contains("Bitbucket API Error"))
        .stdout(predicate::str::contains("\"isError\": true"));
}

#[test]
fn missing_arguments_are_an_error_envelope() {
    let env = TestEnv::new();

    env.authed()
        .args(["call", "get_repository"])
        .assert()
        .success()
        .stdout(predicate::str::contains("invalid arguments"))
        .stdout(predicate::str::contains("\"isError\": true"));
}

#[test]
fn current_user_falls_back_when_unreachable() {
    let env = TestEnv::new();

    env.authed()
        .args(["call", "get_current_user"])
        .assert()
        .success()
        .stdout(predicate::str::contains("unknown"))
        .stdout(predicate::str::contains("\"isError\": true").not());
}

#[test]
fn unknown_tool_exits_non_zero() {
    let env = TestEnv::new();

    env.authed()
        .args(["call", "drop_database"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("Unknown tool: drop_database"));
}

#[test]
fn non_object_arguments_are_rejected() {
    let env = TestEnv::new();

    env.authed()
        .args(["call", "list_projects", "[1]"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("JSON object"));
}
