//! # Git Automation
//!
//! Stages and commits the work done for a task when its status changes.
//!
//! ## Flow
//!
//! 1. `git status --porcelain` lists changed paths (deletions are left alone)
//! 2. Task files (`tasks.json`, `tasks.jsonc`, `tasks.md`) are dropped
//! 3. Unless binaries are included, `git diff --numstat` flags binary files
//!    (`-\t-\t<path>`) which are dropped and reported
//! 4. Remaining paths are staged and committed; `HEAD` gives the hash
//!
//! Nothing left to stage is a normal outcome, not an error.

use thiserror::Error;

mod committer;
mod executor;
#[cfg(any(test, feature = "testing"))]
pub mod testing;

pub use committer::{
    binary_paths, changed_paths, is_task_file, Action, CommitOutcome, Committer, Session,
    AUTOMATION_FOOTER,
};
pub use executor::{CommandGit, GitExecutor};

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum GitError {
    /// A git subcommand failed; `stderr` is git's own error output
    #[error("git {operation} failed: {stderr}")]
    OperationFailed { operation: String, stderr: String },
}

impl GitError {
    pub fn failed(operation: impl Into<String>, stderr: impl Into<String>) -> Self {
        GitError::OperationFailed {
            operation: operation.into(),
            stderr: stderr.into(),
        }
    }
}
