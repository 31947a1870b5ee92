//! Task domain model
//!
//! A task file holds an ordered list of task records. A record may point at
//! another task file holding its children; the parent's status is then derived
//! from those children and never edited on its own.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Prefix marking a `children` value as a reference to another task file
pub const CHILD_REF_PREFIX: &str = "$ref:";

/// Basenames of task files. These never take part in automated commits.
pub const TASK_FILE_NAMES: &[&str] = &["tasks.json", "tasks.jsonc", "tasks.md"];

#[derive(Debug, Error, PartialEq, Eq)]
#[error("Invalid task status '{0}' (expected pending, in_progress or completed)")]
pub struct InvalidStatus(pub String);

/// Status of a task
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Pending,
    InProgress,
    Completed,
}

impl TaskStatus {
    /// Returns true if this status represents completion
    pub fn is_complete(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }

    /// Returns true if this task is not yet started
    pub fn is_pending(&self) -> bool {
        matches!(self, TaskStatus::Pending)
    }

    /// Returns true if this task is currently being worked on
    pub fn is_active(&self) -> bool {
        matches!(self, TaskStatus::InProgress)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Pending => "pending",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
        }
    }

    /// Derives a parent status from its children.
    ///
    /// All completed gives completed, all pending (or no children) gives
    /// pending, and any other mix gives in progress.
    pub fn aggregate<I>(children: I) -> TaskStatus
    where
        I: IntoIterator<Item = TaskStatus>,
    {
        let mut any = false;
        let mut all_completed = true;
        let mut all_pending = true;

        for status in children {
            any = true;
            all_completed &= status.is_complete();
            all_pending &= status.is_pending();
        }

        if !any || all_pending {
            TaskStatus::Pending
        } else if all_completed {
            TaskStatus::Completed
        } else {
            TaskStatus::InProgress
        }
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = InvalidStatus;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(TaskStatus::Pending),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            other => Err(InvalidStatus(other.to_string())),
        }
    }
}

/// A single task entry in a task file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskRecord {
    /// Identifier, unique within its file
    pub id: String,

    #[serde(default)]
    pub section: String,

    #[serde(default)]
    pub description: String,

    pub status: TaskStatus,

    /// `$ref:<relative path>` to the file holding this task's children
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub children: Option<String>,
}

impl TaskRecord {
    pub fn new(id: impl Into<String>, status: TaskStatus) -> Self {
        Self {
            id: id.into(),
            section: String::new(),
            description: String::new(),
            status,
            children: None,
        }
    }

    /// Returns the relative path of the child task file, if this task has one
    pub fn child_ref(&self) -> Option<&str> {
        self.children
            .as_deref()
            .and_then(|c| c.strip_prefix(CHILD_REF_PREFIX))
            .map(str::trim)
            .filter(|p| !p.is_empty())
    }
}

/// Contents of one task file
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskFile {
    pub version: u32,

    /// ID of the task in the referencing file this file aggregates into
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub parent: Option<String>,

    #[serde(default)]
    pub tasks: Vec<TaskRecord>,
}

impl TaskFile {
    pub fn new(version: u32, tasks: Vec<TaskRecord>) -> Self {
        Self {
            version,
            parent: None,
            tasks,
        }
    }

    pub fn find(&self, id: &str) -> Option<&TaskRecord> {
        self.tasks.iter().find(|t| t.id == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut TaskRecord> {
        self.tasks.iter_mut().find(|t| t.id == id)
    }

    /// Status this file contributes to its parent task
    pub fn aggregate_status(&self) -> TaskStatus {
        TaskStatus::aggregate(self.tasks.iter().map(|t| t.status))
    }

    /// Returns true if every task is completed (vacuously true when empty)
    pub fn is_complete(&self) -> bool {
        self.tasks.iter().all(|t| t.status.is_complete())
    }

    pub fn counts(&self) -> StatusCounts {
        let mut counts = StatusCounts::default();
        for task in &self.tasks {
            match task.status {
                TaskStatus::Pending => counts.pending += 1,
                TaskStatus::InProgress => counts.in_progress += 1,
                TaskStatus::Completed => counts.completed += 1,
            }
        }
        counts
    }
}

/// Status counts for a task file
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct StatusCounts {
    pub pending: usize,
    pub in_progress: usize,
    pub completed: usize,
}

impl StatusCounts {
    pub fn total(&self) -> usize {
        self.pending + self.in_progress + self.completed
    }
}

impl fmt::Display for StatusCounts {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} tasks completed ({} in progress, {} pending)",
            self.completed,
            self.total(),
            self.in_progress,
            self.pending
        )
    }
}
