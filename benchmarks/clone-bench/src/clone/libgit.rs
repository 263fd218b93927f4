//! In-process clone through libgit2

use async_trait::async_trait;
use git2::build::RepoBuilder;
use git2::{Direction, FetchOptions, Remote};
use std::path::Path;

use super::CloneStrategy;
use crate::error::{CloneError, CloneResult};

/// Clones with the `git2` bindings on the blocking thread pool
#[derive(Debug, Default)]
pub struct LibGit2Strategy;

impl LibGit2Strategy {
    pub fn new() -> Self {
        Self
    }
}

/// Fetch refspec that tracks only `branch` on `origin`
pub(crate) fn single_branch_refspec(branch: &str) -> String {
    format!("+refs/heads/{branch}:refs/remotes/origin/{branch}")
}

/// Ask the remote which branch HEAD points at
fn default_branch(repo_url: &str) -> CloneResult<String> {
    let mut remote = Remote::create_detached(repo_url)?;
    remote.connect(Direction::Fetch)?;
    let head = remote.default_branch()?;
    let head = head.as_str().ok_or(CloneError::NoDefaultBranch)?.to_string();
    remote.disconnect()?;

    head.strip_prefix("refs/heads/")
        .map(String::from)
        .ok_or(CloneError::NoDefaultBranch)
}

fn clone_blocking(repo_url: &str, dir: &Path) -> CloneResult<()> {
    let branch = default_branch(repo_url)?;
    tracing::debug!(repo_url = %repo_url, branch = %branch, "Resolved default branch");

    let refspec = single_branch_refspec(&branch);
    let mut fetch_options = FetchOptions::new();
    fetch_options.depth(1);

    let mut builder = RepoBuilder::new();
    builder
        .branch(&branch)
        .fetch_options(fetch_options)
        .remote_create(move |repo, name, url| repo.remote_with_fetch(name, url, &refspec));

    builder.clone(repo_url, dir)?;
    Ok(())
}

#[async_trait]
impl CloneStrategy for LibGit2Strategy {
    fn name(&self) -> &'static str {
        "libgit2"
    }

    async fn clone_shallow(&self, repo_url: &str, dir: &Path) -> CloneResult<()> {
        let repo_url = repo_url.to_string();
        let dir = dir.to_path_buf();
        tokio::task::spawn_blocking(move || clone_blocking(&repo_url, &dir)).await?
    }
}
