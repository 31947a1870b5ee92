//! Automated task commits

use std::collections::HashSet;
use std::fmt;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::{debug, info, warn};

use super::executor::{CommandGit, GitExecutor};
use super::GitError;
use crate::domain::TASK_FILE_NAMES;

/// Last line of every automated commit message
pub const AUTOMATION_FOOTER: &str = "[Automated by specdeck track]";

/// Status transitions that produce a commit
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Action {
    Start,
    Complete,
}

impl Action {
    pub fn as_str(&self) -> &'static str {
        match self {
            Action::Start => "start",
            Action::Complete => "complete",
        }
    }
}

impl fmt::Display for Action {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Label of a tracked session, rendered as `kind(id)` in commit subjects
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Session {
    pub kind: String,
    pub id: String,
}

impl Session {
    pub fn new(kind: impl Into<String>, id: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            id: id.into(),
        }
    }
}

impl fmt::Display for Session {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}({})", self.kind, self.id)
    }
}

/// Result of one automated commit attempt
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct CommitOutcome {
    pub files_staged: bool,
    pub commit_hash: Option<String>,
    pub message: String,
    pub staged_files: Vec<String>,
    pub skipped_binaries: Vec<String>,
}

impl CommitOutcome {
    /// First seven characters of the commit hash
    pub fn short_hash(&self) -> Option<&str> {
        self.commit_hash
            .as_deref()
            .map(|h| h.get(..7).unwrap_or(h))
    }
}

/// Stages and commits work files for task transitions
pub struct Committer<E> {
    session: Session,
    repo_root: PathBuf,
    include_binaries: bool,
    git: E,
}

impl Committer<CommandGit> {
    /// Committer running the `git_binary` executable in `repo_root`
    pub fn for_repo(
        session: Session,
        repo_root: impl Into<PathBuf>,
        include_binaries: bool,
        git_binary: &str,
    ) -> Self {
        let repo_root = repo_root.into();
        let git = CommandGit::new(&repo_root).with_binary(git_binary);
        Self::new(session, repo_root, include_binaries, git)
    }
}

impl<E: GitExecutor> Committer<E> {
    pub fn new(
        session: Session,
        repo_root: impl Into<PathBuf>,
        include_binaries: bool,
        git: E,
    ) -> Self {
        Self {
            session,
            repo_root: repo_root.into(),
            include_binaries,
            git,
        }
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn repo_root(&self) -> &Path {
        &self.repo_root
    }

    /// Commit message for a task transition
    pub fn message(&self, task_id: &str, action: Action) -> String {
        format!(
            "{}: {} task {}\n\n{}",
            self.session, action, task_id, AUTOMATION_FOOTER
        )
    }

    /// Stages every changed work file and commits it for `task_id`.
    ///
    /// Returns an outcome with `files_staged == false` when nothing besides
    /// task files (and skipped binaries) changed; git is not touched then.
    pub fn commit(&self, task_id: &str, action: Action) -> Result<CommitOutcome, GitError> {
        let status = self.git.status()?;
        let mut candidates: Vec<String> = changed_paths(&status)
            .into_iter()
            .filter(|p| !is_task_file(p))
            .collect();

        let mut skipped_binaries = Vec::new();
        if !self.include_binaries && !candidates.is_empty() {
            match self.git.diff_numstat(&candidates) {
                Ok(numstat) => {
                    let binaries: HashSet<String> = binary_paths(&numstat).into_iter().collect();
                    candidates.retain(|path| {
                        if binaries.contains(path) {
                            skipped_binaries.push(path.clone());
                            false
                        } else {
                            true
                        }
                    });
                }
                Err(e) => {
                    warn!(error = %e, "Binary detection failed, staging all changed files");
                }
            }
        }

        if candidates.is_empty() {
            debug!(task = task_id, %action, "No work files changed");
            return Ok(CommitOutcome {
                files_staged: false,
                commit_hash: None,
                message: format!("No files to commit for task {}", task_id),
                staged_files: Vec::new(),
                skipped_binaries,
            });
        }

        let message = self.message(task_id, action);
        self.git.add(&candidates)?;
        self.git.commit(&message)?;
        let hash = self.git.rev_parse("HEAD")?;

        info!(
            task = task_id,
            %action,
            files = candidates.len(),
            hash = %hash,
            repo = %self.repo_root.display(),
            "Committed task work"
        );

        Ok(CommitOutcome {
            files_staged: true,
            commit_hash: Some(hash),
            message,
            staged_files: candidates,
            skipped_binaries,
        })
    }
}

/// Returns true if the path's basename is a task file name
pub fn is_task_file(path: &str) -> bool {
    Path::new(path)
        .file_name()
        .and_then(|n| n.to_str())
        .is_some_and(|n| TASK_FILE_NAMES.contains(&n))
}

/// Paths from `git status --porcelain` that should be staged.
///
/// Unchanged entries and deletions (in either column) are skipped. Renames
/// and copies contribute their destination path.
pub fn changed_paths(status: &str) -> Vec<String> {
    let mut paths = Vec::new();

    for line in status.lines() {
        let (Some(code), Some(rest)) = (line.get(..2), line.get(3..)) else {
            continue;
        };
        if code == "  " || code.contains('D') || rest.is_empty() {
            continue;
        }

        let path = if code.contains('R') || code.contains('C') {
            rest.split_once(" -> ").map_or(rest, |(_, to)| to)
        } else {
            rest
        };

        paths.push(unquote(path));
    }

    paths
}

/// Paths that `git diff --numstat` reports as binary (`-\t-\t<path>`)
pub fn binary_paths(numstat: &str) -> Vec<String> {
    numstat
        .lines()
        .filter_map(|line| {
            let mut fields = line.splitn(3, '\t');
            match (fields.next(), fields.next(), fields.next()) {
                (Some("-"), Some("-"), Some(path)) if !path.is_empty() => Some(unquote(path)),
                _ => None,
            }
        })
        .collect()
}

/// Undoes git's C-style quoting of unusual paths
fn unquote(path: &str) -> String {
    let Some(inner) = path
        .strip_prefix('"')
        .and_then(|p| p.strip_suffix('"'))
    else {
        return path.to_string();
    };

    let mut bytes = Vec::with_capacity(inner.len());
    let mut chars = inner.chars();
    while let Some(c) = chars.next() {
        if c != '\\' {
            let mut buf = [0u8; 4];
            bytes.extend_from_slice(c.encode_utf8(&mut buf).as_bytes());
            continue;
        }
        match chars.next() {
            Some('n') => bytes.push(b'\n'),
            Some('t') => bytes.push(b'\t'),
            Some(d @ '0'..='7') => {
                let mut value = d.to_digit(8).unwrap_or(0);
                for _ in 0..2 {
                    match chars.clone().next().and_then(|c| c.to_digit(8)) {
                        Some(next) => {
                            value = value * 8 + next;
                            chars.next();
                        }
                        None => break,
                    }
                }
                bytes.push(value as u8);
            }
            Some(other) => {
                let mut buf = [0u8; 4];
                bytes.extend_from_slice(other.encode_utf8(&mut buf).as_bytes());
            }
            None => bytes.push(b'\\'),
        }
    }

    String::from_utf8_lossy(&bytes).into_owned()
}
