//! Commit and push the notes repository.

use std::path::{Path, PathBuf};
use std::process::Output;

use crate::config::GitConfig;

/// Errors from git operations.
#[derive(thiserror::Error, Debug)]
pub enum GitError {
    #[error("Git command failed: git {command}: {stderr}")]
    CommandFailed { command: String, stderr: String },

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Git operations on the context root.
#[derive(Debug, Clone)]
pub struct GitSync {
    root: PathBuf,
    config: GitConfig,
}

impl GitSync {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>, config: GitConfig) -> Self {
        Self {
            root: root.into(),
            config,
        }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Stage everything, commit, and push when configured.
    ///
    /// Returns `Ok(false)` when sync is disabled, the root is not a
    /// repository, or there is nothing to commit. A failed push is logged
    /// and the commit still counts.
    ///
    /// # Errors
    ///
    /// Returns an error if staging or committing fails.
    pub async fn commit_and_push(&self, project: &str, topics: &[String]) -> Result<bool, GitError> {
        if !self.config.enabled {
            return Ok(false);
        }
        if !tokio::fs::try_exists(self.root.join(".git")).await.unwrap_or(false) {
            tracing::debug!(root = %self.root.display(), "Context root is not a git repository");
            return Ok(false);
        }

        self.run(&["add", "-A"]).await?;

        // Exit status 1 means the index differs from HEAD.
        let staged = self.git(&["diff", "--cached", "--quiet"]).await?;
        if staged.status.success() {
            tracing::debug!("Nothing to commit");
            return Ok(false);
        }

        let message = commit_message(project, topics);
        self.run(&["commit", "-m", &message]).await?;
        tracing::info!(%message, "Committed context update");

        if self.config.push {
            self.push().await;
        }
        Ok(true)
    }

    async fn push(&self) {
        let remotes = match self.run(&["remote"]).await {
            Ok(out) => String::from_utf8_lossy(&out.stdout).to_string(),
            Err(e) => {
                tracing::warn!(error = %e, "Could not list git remotes");
                return;
            }
        };
        if !remotes.lines().any(|r| r.trim() == self.config.remote) {
            tracing::debug!(remote = %self.config.remote, "Remote not configured, skipping push");
            return;
        }

        match self.run(&["push", &self.config.remote]).await {
            Ok(_) => tracing::info!(remote = %self.config.remote, "Pushed context update"),
            Err(e) => tracing::warn!(error = %e, "Push failed, commit kept locally"),
        }
    }

    async fn git(&self, args: &[&str]) -> Result<Output, GitError> {
        Ok(tokio::process::Command::new("git")
            .args(args)
            .current_dir(&self.root)
            .output()
            .await?)
    }

    async fn run(&self, args: &[&str]) -> Result<Output, GitError> {
        let output = self.git(args).await?;
        if !output.status.success() {
            return Err(GitError::CommandFailed {
                command: args.join(" "),
                stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
            });
        }
        Ok(output)
    }
}

/// `Update context: <project> [t1, t2]`.
#[must_use]
pub fn commit_message(project: &str, topics: &[String]) -> String {
    if topics.is_empty() {
        format!("Update context: {project}")
    } else {
        format!("Update context: {project} [{}]", topics.join(", "))
    }
}
