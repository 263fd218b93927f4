//! Shallow clone strategies
//!
//! Both strategies fetch a single branch at depth 1. The harness only sees
//! the [`CloneStrategy`] trait and treats them as interchangeable.

mod git_cli;
mod libgit;

pub use git_cli::GitCliStrategy;
pub use libgit::LibGit2Strategy;

use async_trait::async_trait;
use std::path::Path;

use crate::error::CloneResult;

/// A way of performing a single-branch, depth-1 clone
#[async_trait]
pub trait CloneStrategy: Send + Sync {
    /// Short name used in logs and reports
    fn name(&self) -> &'static str;

    /// Clone `repo_url` into `dir`
    async fn clone_shallow(&self, repo_url: &str, dir: &Path) -> CloneResult<()>;
}

/// Selectable clone strategy
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum StrategyKind {
    /// In-process clone through libgit2
    #[value(name = "libgit2")]
    LibGit2,
    /// External `git` executable with isolated configuration
    #[value(name = "git-cli")]
    GitCli,
}

impl StrategyKind {
    pub fn name(&self) -> &'static str {
        match self {
            StrategyKind::LibGit2 => "libgit2",
            StrategyKind::GitCli => "git-cli",
        }
    }

    /// Instantiate the strategy
    pub fn build(&self) -> Box<dyn CloneStrategy> {
        match self {
            StrategyKind::LibGit2 => Box::new(LibGit2Strategy::new()),
            StrategyKind::GitCli => Box::new(GitCliStrategy::new()),
        }
    }
}

impl std::fmt::Display for StrategyKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}
