//! Clone through the external `git` executable

use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;

use super::CloneStrategy;
use crate::error::{CloneError, CloneResult};

/// Environment that keeps the child away from user/system git config and
/// stops it from prompting for credentials
pub const ISOLATION_ENV: [(&str, &str); 4] = [
    ("GIT_CONFIG_GLOBAL", "/dev/null"),
    ("GIT_CONFIG_SYSTEM", "/dev/null"),
    ("GIT_CONFIG_NOSYSTEM", "1"),
    ("GIT_TERMINAL_PROMPT", "0"),
];

/// Runs `git clone --depth 1 --single-branch` in a child process
#[derive(Debug, Clone)]
pub struct GitCliStrategy {
    program: String,
}

impl GitCliStrategy {
    pub fn new() -> Self {
        Self::with_program("git")
    }

    /// Use a specific git executable
    pub fn with_program(program: impl Into<String>) -> Self {
        Self {
            program: program.into(),
        }
    }

    fn command(&self, repo_url: &str, dir: &Path) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(["clone", "--depth", "1", "--single-branch", "--"])
            .arg(repo_url)
            .arg(dir)
            .envs(ISOLATION_ENV)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true);
        cmd
    }
}

impl Default for GitCliStrategy {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl CloneStrategy for GitCliStrategy {
    fn name(&self) -> &'static str {
        "git-cli"
    }

    async fn clone_shallow(&self, repo_url: &str, dir: &Path) -> CloneResult<()> {
        let output = self.command(repo_url, dir).output().await?;

        if output.status.success() {
            tracing::debug!(
                stderr = %String::from_utf8_lossy(&output.stderr).trim(),
                "git clone finished"
            );
            Ok(())
        } else {
            Err(CloneError::GitExit {
                status: output.status.to_string(),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            })
        }
    }
}
