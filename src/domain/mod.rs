//! Domain models for specdeck
//!
//! Contains the task file model and status rules without any I/O concerns.

mod task;

pub use task::{
    InvalidStatus, StatusCounts, TaskFile, TaskRecord, TaskStatus, CHILD_REF_PREFIX,
    TASK_FILE_NAMES,
};
