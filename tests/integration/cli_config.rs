use predicates::prelude::*;

use crate::common::TestEnv;

#[test]
fn config_show_defaults() {
    let env = TestEnv::new();

    env.cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://code.fineres.com (default)"))
        .stdout(predicate::str::contains("(not set)"));
}

#[test]
fn config_set_base_url() {
    let env = TestEnv::new();

    env.cmd()
        .args(["config", "set", "base_url", "https://bitbucket.example.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains(
            "Set base_url = https://bitbucket.example.com",
        ));

    env.cmd()
        .args(["config", "get", "base_url"])
        .assert()
        .success()
        .stdout(predicate::str::contains("https://bitbucket.example.com"));

    assert!(env.config_path().exists());
}

#[test]
fn config_token_is_masked() {
    let env = TestEnv::new();

    env.cmd()
        .args(["config", "set", "token", "abcdefghijkl"])
        .assert()
        .success()
        .stdout(predicate::str::contains("****ijkl"))
        .stdout(predicate::str::contains("abcdefghijkl").not());

    env.cmd()
        .args(["config", "show"])
        .assert()
        .success()
        .stdout(predicate::str::contains("****ijkl"))
        .stdout(predicate::str::contains("abcdefghijkl").not());
}

#[test]
fn config_clear_value() {
    let env = TestEnv::new();

    env.cmd()
        .args(["config", "set", "base_url", "https://bb"])
        .assert()
        .success();
    env.cmd()
        .args(["config", "set", "base_url", "none"])
        .assert()
        .success();

    env.cmd()
        .args(["config", "get", "base_url"])
        .assert()
        .success()
        .stdout(predicate::str::contains("(not set)"));
}

#[test]
fn config_unknown_key() {
    let env = TestEnv::new();

    env.cmd()
        .args(["config", "set", "colour", "blue"])
        .assert()
        .failure()
        .stderr(predicate::str::contains("unknown config key"));

    env.cmd()
        .args(["config", "get", "colour"])
        .assert()
        .failure();
}
