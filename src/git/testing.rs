//! Recording git executor for tests.
//!
//! [`FakeGit`] answers git operations from canned output and records every
//! call. Clones share state, so a test can hand one clone to a committer and
//! inspect the calls through another.
//!
//! ```rust,ignore
//! let git = FakeGit::new().with_status(" M src/lib.rs\n");
//! let committer = Committer::new(session, "/repo", false, git.clone());
//! committer.commit("1", Action::Start)?;
//! assert!(git.calls().contains(&GitCall::Add(vec!["src/lib.rs".into()])));
//! ```

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use super::executor::GitExecutor;
use super::GitError;

/// A recorded executor call
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum GitCall {
    Status,
    Add(Vec<String>),
    Commit(String),
    RevParse(String),
    DiffNumstat(Vec<String>),
}

#[derive(Debug)]
struct FakeState {
    status: String,
    numstat: String,
    head: String,
    failures: HashMap<String, String>,
    calls: Vec<GitCall>,
}

impl Default for FakeState {
    fn default() -> Self {
        Self {
            status: String::new(),
            numstat: String::new(),
            head: "0000000000000000000000000000000000000000".to_string(),
            failures: HashMap::new(),
            calls: Vec::new(),
        }
    }
}

/// In-memory [`GitExecutor`]
#[derive(Debug, Clone, Default)]
pub struct FakeGit {
    state: Arc<Mutex<FakeState>>,
}

impl FakeGit {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the porcelain status output
    #[must_use]
    pub fn with_status(self, status: &str) -> Self {
        self.set_status(status);
        self
    }

    /// Sets the `diff --numstat` output
    #[must_use]
    pub fn with_numstat(self, numstat: &str) -> Self {
        self.state().numstat = numstat.to_string();
        self
    }

    /// Sets the hash returned for any reference
    #[must_use]
    pub fn with_head(self, hash: &str) -> Self {
        self.state().head = hash.to_string();
        self
    }

    /// Makes `operation` (`status`, `add`, `commit`, `rev-parse`, `diff`) fail
    #[must_use]
    pub fn failing(self, operation: &str, stderr: &str) -> Self {
        self.state()
            .failures
            .insert(operation.to_string(), stderr.to_string());
        self
    }

    /// Replaces the status output, e.g. between commits
    pub fn set_status(&self, status: &str) {
        self.state().status = status.to_string();
    }

    /// Calls recorded so far
    pub fn calls(&self) -> Vec<GitCall> {
        self.state().calls.clone()
    }

    /// Number of `commit` calls recorded so far
    pub fn commit_count(&self) -> usize {
        self.state()
            .calls
            .iter()
            .filter(|c| matches!(c, GitCall::Commit(_)))
            .count()
    }

    fn state(&self) -> MutexGuard<'_, FakeState> {
        self.state.lock().unwrap_or_else(|e| e.into_inner())
    }

    fn record(&self, operation: &str, call: GitCall) -> Result<MutexGuard<'_, FakeState>, GitError> {
        let mut state = self.state();
        state.calls.push(call);
        if let Some(stderr) = state.failures.get(operation).cloned() {
            return Err(GitError::failed(operation, stderr));
        }
        Ok(state)
    }
}

impl GitExecutor for FakeGit {
    fn status(&self) -> Result<String, GitError> {
        self.record("status", GitCall::Status)
            .map(|s| s.status.clone())
    }

    fn add(&self, files: &[String]) -> Result<(), GitError> {
        self.record("add", GitCall::Add(files.to_vec())).map(|_| ())
    }

    fn commit(&self, message: &str) -> Result<(), GitError> {
        self.record("commit", GitCall::Commit(message.to_string()))
            .map(|_| ())
    }

    fn rev_parse(&self, reference: &str) -> Result<String, GitError> {
        self.record("rev-parse", GitCall::RevParse(reference.to_string()))
            .map(|s| s.head.clone())
    }

    fn diff_numstat(&self, files: &[String]) -> Result<String, GitError> {
        self.record("diff", GitCall::DiffNumstat(files.to_vec()))
            .map(|s| s.numstat.clone())
    }
}
