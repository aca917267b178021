use predicates::prelude::*;

use crate::common::TestEnv;

#[test]
fn tools_requires_a_token() {
    let env = TestEnv::new();

    env.cmd()
        .arg("tools")
        .assert()
        .failure()
        .stderr(predicate::str::contains("BITBUCKET_TOKEN"));
}

#[test]
fn tools_lists_every_group() {
    let env = TestEnv::new();

    env.authed()
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"list_projects\""))
        .stdout(predicate::str::contains("\"add_pull_request_line_comment\""))
        .stdout(predicate::str::contains("\"get_default_branch\""))
        .stdout(predicate::str::contains("\"inputSchema\""));
}

#[test]
fn token_from_config_file_is_enough() {
    let env = TestEnv::new();
    std::fs::write(env.config_path(), "token = \"from-file\"\n").unwrap();

    env.cmd()
        .arg("tools")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"get_pull_request\""));
}

#[test]
fn prompts_lists_review_prompt() {
    let env = TestEnv::new();

    env.authed()
        .arg("prompts")
        .assert()
        .success()
        .stdout(predicate::str::contains("\"review_my_prs\""))
        .stdout(predicate::str::contains("\"prId\""));
}
