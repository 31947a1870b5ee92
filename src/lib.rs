//! specdeck - task tracking with automatic git commits
//!
//! A task file (`tasks.jsonc`) lists work items whose children may live in
//! referenced files. `specdeck track` watches that file and, whenever a task
//! starts or completes, stages the changed work files and commits them with a
//! structured message.

pub mod cli;
pub mod domain;
pub mod git;
pub mod storage;
pub mod tracker;
pub mod watch;

pub use domain::{TaskFile, TaskRecord, TaskStatus};
pub use storage::TaskStore;
pub use tracker::{CancelToken, TrackOutcome, Tracker};
