//! # Storage Layer
//!
//! Persistence for task files and configuration.
//!
//! ## Storage Formats
//!
//! | Data | Format | Location |
//! |------|--------|----------|
//! | Tasks | JSON with `//` comments | any path, usually `tasks.jsonc` |
//! | Child tasks | same, referenced via `"children": "$ref:<path>"` | relative to the referencing file |
//! | Config | TOML | `.specdeck/config.toml`, `~/.config/specdeck/config.toml` |
//!
//! ## Concurrency Safety
//!
//! - Reads take a shared `fs2` lock on the task file
//! - Writes go to a locked sibling temp file that is renamed over the original
//! - A file watcher re-reading the task file never sees a partial document
//!
//! ## Key Types
//!
//! - [`TaskStore`] - Read the task tree and update task status
//! - [`Config`] - Project and global configuration

use std::path::PathBuf;

use thiserror::Error;

mod config;
mod jsonc;
mod task_store;

pub use config::{
    Config, ConfigError, GlobalConfig, OutputFormat, ProjectConfig, TrackConfig, PROJECT_DIR,
};
pub use jsonc::{parse_task_file, read_task_file, strip_comments, write_task_file};
pub use task_store::{TaskNode, TaskStore};

#[derive(Debug, Error)]
pub enum TaskStoreError {
    #[error("Task file not found: {}", .0.display())]
    FileNotFound(PathBuf),

    #[error("Failed to access task file {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse task file {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Task '{0}' not found")]
    TaskNotFound(String),

    #[error("Task file reference cycle detected at {}", .0.display())]
    ReferenceCycle(PathBuf),
}
