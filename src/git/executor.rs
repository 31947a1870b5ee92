//! Git command execution
//!
//! [`GitExecutor`] is the small set of git operations the committer needs.
//! [`CommandGit`] runs them as `git` subprocesses against a repository root.

use std::collections::HashSet;
use std::path::PathBuf;
use std::process::Command;

use tracing::trace;

use super::GitError;

/// Git operations used by automated commits
pub trait GitExecutor {
    /// `git status --porcelain` output
    fn status(&self) -> Result<String, GitError>;

    /// Stages the given paths
    fn add(&self, files: &[String]) -> Result<(), GitError>;

    /// Commits the index with `message`
    fn commit(&self, message: &str) -> Result<(), GitError>;

    /// Resolves a reference such as `HEAD` to a commit hash
    fn rev_parse(&self, reference: &str) -> Result<String, GitError>;

    /// `git diff --numstat` output for the given paths
    fn diff_numstat(&self, files: &[String]) -> Result<String, GitError>;
}

/// Runs git as a subprocess
#[derive(Debug, Clone)]
pub struct CommandGit {
    root: PathBuf,
    binary: String,
}

impl CommandGit {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self {
            root: root.into(),
            binary: "git".to_string(),
        }
    }

    /// Uses a different git executable
    pub fn with_binary(mut self, binary: impl Into<String>) -> Self {
        self.binary = binary.into();
        self
    }

    fn run(&self, operation: &'static str, args: &[&str]) -> Result<String, GitError> {
        self.run_accepting(operation, args, &[0])
    }

    /// Runs git, treating any of `codes` as success
    fn run_accepting(
        &self,
        operation: &'static str,
        args: &[&str],
        codes: &[i32],
    ) -> Result<String, GitError> {
        trace!(operation, ?args, "Running git");

        let output = Command::new(&self.binary)
            .arg("-C")
            .arg(&self.root)
            .args(["-c", "core.quotepath=false"])
            .args(args)
            .output()
            .map_err(|e| GitError::failed(operation, e.to_string()))?;

        if output.status.code().is_some_and(|code| codes.contains(&code)) {
            Ok(String::from_utf8_lossy(&output.stdout).into_owned())
        } else {
            Err(GitError::failed(
                operation,
                String::from_utf8_lossy(&output.stderr).trim(),
            ))
        }
    }
}

fn with_paths<'a>(args: &[&'a str], files: &'a [String]) -> Vec<&'a str> {
    let mut all = args.to_vec();
    all.push("--");
    all.extend(files.iter().map(String::as_str));
    all
}

impl GitExecutor for CommandGit {
    fn status(&self) -> Result<String, GitError> {
        self.run("status", &["status", "--porcelain", "--untracked-files=all"])
    }

    fn add(&self, files: &[String]) -> Result<(), GitError> {
        self.run("add", &with_paths(&["add"], files)).map(|_| ())
    }

    fn commit(&self, message: &str) -> Result<(), GitError> {
        self.run("commit", &["commit", "-m", message]).map(|_| ())
    }

    fn rev_parse(&self, reference: &str) -> Result<String, GitError> {
        self.run("rev-parse", &["rev-parse", reference])
            .map(|out| out.trim().to_string())
    }

    fn diff_numstat(&self, files: &[String]) -> Result<String, GitError> {
        let mut numstat = self.run("diff", &with_paths(&["diff", "--numstat", "HEAD"], files))?;

        // Untracked files are not part of the diff against HEAD
        let listed: HashSet<&str> = numstat
            .lines()
            .filter_map(|line| line.splitn(3, '\t').nth(2))
            .collect();
        let untracked: Vec<&String> = files
            .iter()
            .filter(|f| !listed.contains(f.as_str()) && self.root.join(f.as_str()).is_file())
            .collect();

        for file in untracked {
            // Exit code 1 means the files differ
            let out = self.run_accepting(
                "diff",
                &["diff", "--no-index", "--numstat", "--", "/dev/null", file.as_str()],
                &[0, 1],
            )?;
            if out.lines().any(|line| line.starts_with("-\t-\t")) {
                numstat.push_str(&format!("-\t-\t{}\n", file));
            }
        }

        Ok(numstat)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn git_available() -> bool {
        Command::new("git").arg("--version").output().is_ok()
    }

    fn init_repo() -> TempDir {
        let dir = TempDir::new().unwrap();
        for args in [
            vec!["init", "-q"],
            vec!["config", "user.email", "test@example.com"],
            vec!["config", "user.name", "Test"],
            vec!["config", "commit.gpgsign", "false"],
        ] {
            let status = Command::new("git")
                .arg("-C")
                .arg(dir.path())
                .args(&args)
                .status()
                .unwrap();
            assert!(status.success());
        }
        dir
    }

    #[test]
    fn with_paths_appends_separator() {
        let files = vec!["a.rs".to_string(), "b c.rs".to_string()];
        assert_eq!(
            with_paths(&["add"], &files),
            vec!["add", "--", "a.rs", "b c.rs"]
        );
    }

    #[test]
    fn failure_carries_stderr() {
        if !git_available() {
            return;
        }
        let dir = TempDir::new().unwrap();
        let git = CommandGit::new(dir.path());

        let err = git.status().unwrap_err();
        let GitError::OperationFailed { operation, stderr } = err;
        assert_eq!(operation, "status");
        assert!(stderr.to_lowercase().contains("not a git repository"));
    }

    #[test]
    fn stage_and_commit_in_real_repo() {
        if !git_available() {
            return;
        }
        let dir = init_repo();
        std::fs::write(dir.path().join("main.rs"), "fn main() {}\n").unwrap();
        let git = CommandGit::new(dir.path());

        let status = git.status().unwrap();
        assert!(status.contains("?? main.rs"));

        git.add(&["main.rs".to_string()]).unwrap();
        git.commit("initial").unwrap();

        let head = git.rev_parse("HEAD").unwrap();
        assert_eq!(head.len(), 40);
        assert!(git.status().unwrap().trim().is_empty());
    }

    #[test]
    fn numstat_flags_untracked_binaries() {
        if !git_available() {
            return;
        }
        let dir = init_repo();
        std::fs::write(dir.path().join("README"), "hello\n").unwrap();
        let git = CommandGit::new(dir.path());
        git.add(&["README".to_string()]).unwrap();
        git.commit("initial").unwrap();

        std::fs::write(dir.path().join("README"), "hello again\n").unwrap();
        std::fs::write(dir.path().join("notes.txt"), "text\n").unwrap();
        std::fs::write(dir.path().join("logo.png"), [0u8, 159, 146, 150, 0, 1]).unwrap();

        let files: Vec<String> = ["README", "notes.txt", "logo.png"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let numstat = git.diff_numstat(&files).unwrap();

        assert!(numstat.contains("\tREADME"));
        assert!(numstat.contains("-\t-\tlogo.png"));
        assert!(!numstat.contains("-\t-\tnotes.txt"));
    }

    #[test]
    fn missing_binary_is_operation_failure() {
        let dir = TempDir::new().unwrap();
        let git = CommandGit::new(dir.path()).with_binary("definitely-not-git-binary");

        assert!(matches!(
            git.rev_parse("HEAD"),
            Err(GitError::OperationFailed { .. })
        ));
    }
}
