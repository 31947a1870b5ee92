//! Last observed status per task

use std::collections::BTreeMap;

use crate::domain::{TaskFile, TaskStatus};
use crate::git::Action;

/// How a task's status moved since it was last observed
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// First time this ID is seen; establishes a baseline
    FirstSeen(TaskStatus),
    Unchanged,
    Changed { from: TaskStatus, to: TaskStatus },
}

impl Transition {
    /// The commit this transition calls for, if any
    pub fn action(&self) -> Option<Action> {
        match self {
            Transition::Changed {
                to: TaskStatus::InProgress,
                ..
            } => Some(Action::Start),
            Transition::Changed {
                to: TaskStatus::Completed,
                ..
            } => Some(Action::Complete),
            _ => None,
        }
    }
}

/// Task ID to status, as last observed by the tracker
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Snapshot {
    statuses: BTreeMap<String, TaskStatus>,
}

impl Snapshot {
    /// Captures the statuses of every task in `file`
    pub fn capture(file: &TaskFile) -> Self {
        Self {
            statuses: file
                .tasks
                .iter()
                .map(|t| (t.id.clone(), t.status))
                .collect(),
        }
    }

    pub fn get(&self, id: &str) -> Option<TaskStatus> {
        self.statuses.get(id).copied()
    }

    /// Compares `status` with the stored value without recording it
    pub fn classify(&self, id: &str, status: TaskStatus) -> Transition {
        match self.statuses.get(id) {
            None => Transition::FirstSeen(status),
            Some(&previous) if previous == status => Transition::Unchanged,
            Some(&previous) => Transition::Changed {
                from: previous,
                to: status,
            },
        }
    }

    /// Stores the latest observed status
    pub fn record(&mut self, id: &str, status: TaskStatus) {
        self.statuses.insert(id.to_string(), status);
    }
}
