//! # Task Tracker
//!
//! Watches a task file and commits work as tasks start and complete.
//!
//! ## Lifecycle
//!
//! ```text
//! Init ──all complete──▶ AlreadyComplete
//!  │
//!  ▼
//! Watching ◀──────────┐
//!  │ cancel ─▶ Interrupted
//!  │ change           │
//!  ▼                  │
//! Handling ───────────┘
//!  │ all complete ─▶ Completed
//!  │ git failure  ─▶ Err(TrackError::Git)
//! ```
//!
//! Each change re-reads the whole file and diffs it against the last observed
//! statuses, so missed or coalesced notifications never lose a transition.
//! A task moving to `in_progress` commits with [`Action::Start`], one moving
//! to `completed` commits with [`Action::Complete`]; moves back to `pending`
//! and first sightings only update the snapshot.

use std::path::PathBuf;
use std::time::Duration;

use crossbeam::select;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::git::{Action, CommitOutcome, Committer, GitError, GitExecutor};
use crate::storage::{TaskStore, TaskStoreError};
use crate::watch::{FileWatcher, WatchError, DEFAULT_DEBOUNCE};

mod cancel;
mod snapshot;

pub use cancel::CancelToken;
pub use snapshot::{Snapshot, Transition};

/// Receives human-readable progress lines from a tracked session
pub trait Progress {
    fn info(&self, line: &str);
    fn warn(&self, line: &str);
}

/// How a tracked session ended without error
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TrackOutcome {
    /// Every task was already complete; nothing was watched
    AlreadyComplete,
    /// Every task reached `completed` during the session
    Completed,
    /// The session was cancelled
    Interrupted,
}

#[derive(Debug, Error)]
pub enum TrackError {
    #[error(transparent)]
    Store(#[from] TaskStoreError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error(transparent)]
    Git(#[from] GitError),

    #[error("File watcher stopped unexpectedly")]
    WatcherStopped,
}

enum Wake {
    Cancelled,
    Changed,
    WatchFailed(WatchError),
    Stopped,
}

/// Event loop tying the task file, the watcher and the committer together
pub struct Tracker<E> {
    store: TaskStore,
    committer: Committer<E>,
    debounce: Duration,
    snapshot: Snapshot,
    watcher: Option<FileWatcher>,
}

impl<E: GitExecutor> Tracker<E> {
    pub fn new(tasks_path: impl Into<PathBuf>, committer: Committer<E>) -> Self {
        Self {
            store: TaskStore::new(tasks_path),
            committer,
            debounce: DEFAULT_DEBOUNCE,
            snapshot: Snapshot::default(),
            watcher: None,
        }
    }

    /// Sets the quiet period before a change is handled
    pub fn with_debounce(mut self, debounce: Duration) -> Self {
        self.debounce = debounce;
        self
    }

    pub fn snapshot(&self) -> &Snapshot {
        &self.snapshot
    }

    pub fn is_watching(&self) -> bool {
        self.watcher.is_some()
    }

    /// Runs the session until all tasks complete, `cancel` fires, or git fails
    pub fn run(
        &mut self,
        cancel: &CancelToken,
        progress: &dyn Progress,
    ) -> Result<TrackOutcome, TrackError> {
        let file = self.store.read()?;
        self.snapshot = Snapshot::capture(&file);

        if file.is_complete() {
            info!(path = %self.store.path().display(), "All tasks already complete");
            progress.info("All tasks are already complete");
            return Ok(TrackOutcome::AlreadyComplete);
        }

        progress.info(&format!(
            "Tracking {}: {}",
            self.committer.session(),
            file.counts()
        ));

        if self.watcher.is_none() {
            self.watcher = Some(FileWatcher::with_debounce(
                self.store.path(),
                self.debounce,
            )?);
        }

        debug!(repo = %self.committer.repo_root().display(), "Watching for status changes");

        if cancel.is_cancelled() {
            return Ok(self.interrupted(progress));
        }

        // Catch edits made between the first read and the watch starting
        if let Some(outcome) = self.handle_change(progress)? {
            return Ok(outcome);
        }

        loop {
            if cancel.is_cancelled() {
                return Ok(self.interrupted(progress));
            }

            let wake = self.wait(cancel);
            if let Some(outcome) = self.dispatch(wake, progress)? {
                return Ok(outcome);
            }
        }
    }

    /// Handles one wake-up of the watch loop; `None` keeps watching
    fn dispatch(
        &mut self,
        wake: Wake,
        progress: &dyn Progress,
    ) -> Result<Option<TrackOutcome>, TrackError> {
        match wake {
            Wake::Cancelled => Ok(Some(self.interrupted(progress))),
            Wake::Changed => self.handle_change(progress),
            Wake::WatchFailed(e) => {
                warn!(error = %e, "File watcher error");
                progress.warn(&format!("Watcher error: {}", e));
                Ok(None)
            }
            Wake::Stopped => Err(TrackError::WatcherStopped),
        }
    }

    fn wait(&self, cancel: &CancelToken) -> Wake {
        let Some(watcher) = self.watcher.as_ref() else {
            return Wake::Stopped;
        };

        select! {
            recv(cancel.receiver()) -> _ => Wake::Cancelled,
            recv(watcher.events()) -> msg => match msg {
                Ok(_) => Wake::Changed,
                Err(_) => Wake::Stopped,
            },
            recv(watcher.errors()) -> msg => match msg {
                Ok(e) => Wake::WatchFailed(e),
                Err(_) => Wake::Stopped,
            },
        }
    }

    fn interrupted(&self, progress: &dyn Progress) -> TrackOutcome {
        info!("Tracking interrupted");
        progress.info("Tracking interrupted");
        TrackOutcome::Interrupted
    }

    /// Re-reads the task file and commits for every qualifying transition.
    ///
    /// Returns `Some(Completed)` once every task is complete. A file that
    /// cannot be read or parsed (for example mid-save) is reported and
    /// skipped; the next change retries.
    pub fn handle_change(
        &mut self,
        progress: &dyn Progress,
    ) -> Result<Option<TrackOutcome>, TrackError> {
        let file = match self.store.read() {
            Ok(file) => file,
            Err(e) => {
                warn!(error = %e, "Could not re-read task file");
                progress.warn(&format!("Could not read task file: {}", e));
                return Ok(None);
            }
        };

        for task in &file.tasks {
            let transition = self.snapshot.classify(&task.id, task.status);
            match transition {
                Transition::FirstSeen(status) => {
                    debug!(task = %task.id, %status, "Tracking new task");
                }
                Transition::Changed { from, to } => {
                    debug!(task = %task.id, %from, %to, "Status changed");
                }
                Transition::Unchanged => {}
            }

            if let Some(action) = transition.action() {
                let outcome = self.committer.commit(&task.id, action)?;
                report(progress, &task.id, action, &outcome);
            }

            self.snapshot.record(&task.id, task.status);
        }

        if file.is_complete() {
            info!("All tasks complete");
            progress.info(&format!("All tasks complete: {}", file.counts()));
            return Ok(Some(TrackOutcome::Completed));
        }

        Ok(None)
    }

    /// Releases the file watcher. Safe to call repeatedly or before `run`.
    pub fn close(&mut self) -> Result<(), WatchError> {
        match self.watcher.take() {
            Some(mut watcher) => watcher.close(),
            None => Ok(()),
        }
    }
}

impl<E> Drop for Tracker<E> {
    fn drop(&mut self) {
        if let Some(mut watcher) = self.watcher.take() {
            let _ = watcher.close();
        }
    }
}

fn report(progress: &dyn Progress, task_id: &str, action: Action, outcome: &CommitOutcome) {
    let verb = match action {
        Action::Start => "started",
        Action::Complete => "completed",
    };

    match outcome.short_hash() {
        Some(hash) if outcome.files_staged => progress.info(&format!(
            "Task {} {}: committed {} ({} file{})",
            task_id,
            verb,
            hash,
            outcome.staged_files.len(),
            if outcome.staged_files.len() == 1 { "" } else { "s" }
        )),
        _ => progress.info(&format!("Task {} {}: no files to commit", task_id, verb)),
    }

    if !outcome.skipped_binaries.is_empty() {
        progress.warn(&format!(
            "Skipped binary files: {}",
            outcome.skipped_binaries.join(", ")
        ));
    }
}
