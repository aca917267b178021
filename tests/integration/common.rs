use std::path::PathBuf;

use assert_cmd::Command;
use tempfile::TempDir;

/// Nothing listens here, so every backend call fails fast with a transport error.
pub const UNREACHABLE_URL: &str = "http://127.0.0.1:1";

pub struct TestEnv {
    pub config_dir: TempDir,
    pub project_dir: TempDir,
}

impl TestEnv {
    pub fn new() -> Self {
        Self {
            config_dir: TempDir::new().expect("failed to create config_dir"),
            project_dir: TempDir::new().expect("failed to create project_dir"),
        }
    }

    pub fn config_path(&self) -> PathBuf {
        self.config_dir.path().join("config.toml")
    }

    /// A bitbucket-mcp Command isolated from the caller's environment, with
    /// --config pointing into config_dir and cwd = project_dir.
    pub fn cmd(&self) -> Command {
        let mut cmd = Command::new(assert_cmd::cargo::cargo_bin!("bitbucket-mcp"));
        cmd.env_remove("BITBUCKET_TOKEN")
            .env_remove("BITBUCKET_URL")
            .env_remove("BITBUCKET_MCP_CONFIG")
            .env_remove("RUST_LOG")
            .arg("--config")
            .arg(self.config_path())
            .current_dir(self.project_dir.path());
        cmd
    }

    /// Like [`TestEnv::cmd`] with a token and an unreachable server.
    pub fn authed(&self) -> Command {
        let mut cmd = self.cmd();
        cmd.env("BITBUCKET_TOKEN", "test-token")
            .env("BITBUCKET_URL", UNREACHABLE_URL);
        cmd
    }
}
