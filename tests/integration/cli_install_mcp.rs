use std::fs;

use predicates::prelude::*;

use crate::common::TestEnv;

fn manifest(env: &TestEnv) -> serde_json::Value {
    let content = fs::read_to_string(env.project_dir.path().join(".mcp.json")).unwrap();
    serde_json::from_str(&content).unwrap()
}

#[test]
fn install_mcp_writes_manifest_without_token() {
    let env = TestEnv::new();

    env.cmd()
        .args(["install-mcp", "--base-url", "https://bb.example.com"])
        .assert()
        .success()
        .stdout(predicate::str::contains("Added 'bitbucket'"));

    let root = manifest(&env);
    let entry = &root["mcpServers"]["bitbucket"];
    assert_eq!(entry["args"], serde_json::json!(["mcp"]));
    assert_eq!(entry["env"]["BITBUCKET_URL"], "https://bb.example.com");
    assert!(entry["env"].get("BITBUCKET_TOKEN").is_none());
}

#[test]
fn install_mcp_is_idempotent() {
    let env = TestEnv::new();

    env.cmd()
        .args(["install-mcp", "--name", "bb"])
        .assert()
        .success();
    env.cmd()
        .args(["install-mcp", "--name", "bb"])
        .assert()
        .success()
        .stdout(predicate::str::contains("already configured"));

    assert_eq!(manifest(&env)["mcpServers"].as_object().unwrap().len(), 1);
}
