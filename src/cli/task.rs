//! Task CLI commands

use std::path::{Path, PathBuf};

use anyhow::{Context, Result};
use clap::Subcommand;

use super::output::Output;
use crate::domain::TaskStatus;
use crate::storage::{TaskNode, TaskStore};

#[derive(Subcommand)]
pub enum TaskCommands {
    /// Set a task's status
    ///
    /// Examples:
    ///   specdeck task set tasks.jsonc 1.2 in_progress
    ///   specdeck task set tasks.jsonc 3 completed
    Set {
        /// Root task file
        file: PathBuf,

        /// Task ID (searched in referenced files too)
        id: String,

        /// New status: pending, in_progress or completed
        status: TaskStatus,
    },

    /// Mark task as in progress
    Start {
        /// Root task file
        file: PathBuf,

        /// Task ID
        id: String,
    },

    /// Mark task as completed
    Done {
        /// Root task file
        file: PathBuf,

        /// Task ID
        id: String,
    },

    /// List tasks, including referenced child files
    List {
        /// Root task file
        file: PathBuf,
    },

    /// Show progress of a task file
    Status {
        /// Root task file
        file: PathBuf,
    },
}

pub fn run(cmd: TaskCommands, output: &Output) -> Result<()> {
    match cmd {
        TaskCommands::Set { file, id, status } => set_status(output, &file, &id, status),
        TaskCommands::Start { file, id } => set_status(output, &file, &id, TaskStatus::InProgress),
        TaskCommands::Done { file, id } => set_status(output, &file, &id, TaskStatus::Completed),
        TaskCommands::List { file } => list_tasks(output, &file),
        TaskCommands::Status { file } => show_status(output, &file),
    }
}

fn set_status(output: &Output, file: &Path, id: &str, status: TaskStatus) -> Result<()> {
    let store = TaskStore::new(file);
    output.verbose_ctx("task", &format!("Setting {} to {} in {}", id, status, file.display()));

    store
        .update(id, status)
        .with_context(|| format!("Failed to update task {}", id))?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "id": id,
            "status": status,
            "file": file.display().to_string(),
        }));
    } else {
        output.success(&format!("Task {} is now {}", id, status));
    }

    Ok(())
}

fn list_tasks(output: &Output, file: &Path) -> Result<()> {
    let nodes = TaskStore::new(file).tree()?;

    if output.is_json() {
        output.data(&nodes);
        return Ok(());
    }

    if nodes.is_empty() {
        println!("No tasks in {}", file.display());
        return Ok(());
    }

    for node in &nodes {
        println!("{}", render_node(node));
    }

    Ok(())
}

fn render_node(node: &TaskNode) -> String {
    let marker = match node.task.status {
        TaskStatus::Pending => "[ ]",
        TaskStatus::InProgress => "[~]",
        TaskStatus::Completed => "[x]",
    };
    let indent = "  ".repeat(node.depth);

    if node.task.description.is_empty() {
        format!("{}{} {}", indent, marker, node.task.id)
    } else {
        format!("{}{} {}  {}", indent, marker, node.task.id, node.task.description)
    }
}

fn show_status(output: &Output, file: &Path) -> Result<()> {
    let task_file = TaskStore::new(file).read()?;
    let counts = task_file.counts();
    let status = task_file.aggregate_status();

    if output.is_json() {
        output.data(&serde_json::json!({
            "file": file.display().to_string(),
            "status": status,
            "complete": task_file.is_complete(),
            "counts": counts,
        }));
    } else {
        println!("{}: {}", file.display(), status);
        println!("{}", counts);
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::TaskRecord;

    #[test]
    fn renders_nested_nodes() {
        let mut task = TaskRecord::new("2.1", TaskStatus::InProgress);
        task.description = "Wire the API".to_string();
        let node = TaskNode {
            depth: 1,
            file: PathBuf::from("child/tasks.jsonc"),
            task,
        };

        assert_eq!(render_node(&node), "  [~] 2.1  Wire the API");
    }

    #[test]
    fn renders_without_description() {
        let node = TaskNode {
            depth: 0,
            file: PathBuf::from("tasks.jsonc"),
            task: TaskRecord::new("1", TaskStatus::Completed),
        };

        assert_eq!(render_node(&node), "[x] 1");
    }
}
