//! Hierarchical task store
//!
//! A root task file may reference child task files through `$ref:` paths.
//! Updating a task deep in the tree rewrites the file that holds it and then
//! every referencing file on the way back up, recomputing each parent status
//! from its children.

use std::collections::HashSet;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

use serde::Serialize;
use tracing::debug;

use super::jsonc::{read_task_file, write_task_file};
use super::TaskStoreError;
use crate::domain::{TaskFile, TaskRecord, TaskStatus};

/// A task together with its position in the reference tree
#[derive(Debug, Clone, Serialize)]
pub struct TaskNode {
    /// 0 for tasks in the root file
    pub depth: usize,
    /// File that holds the task
    pub file: PathBuf,
    #[serde(flatten)]
    pub task: TaskRecord,
}

/// Store for a root task file and the files it references
pub struct TaskStore {
    path: PathBuf,
}

impl TaskStore {
    /// Creates a store rooted at the given task file
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Returns the path to the root task file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Reads the root task file
    pub fn read(&self) -> Result<TaskFile, TaskStoreError> {
        read_task_file(&self.path)
    }

    /// Sets the status of a task, searching referenced files when the root
    /// does not hold it, and refreshes every ancestor's aggregate status.
    pub fn update(&self, task_id: &str, status: TaskStatus) -> Result<(), TaskStoreError> {
        let mut ancestors = HashSet::new();
        match update_in(&self.path, task_id, status, &mut ancestors)? {
            Some(_) => Ok(()),
            None => Err(TaskStoreError::TaskNotFound(task_id.to_string())),
        }
    }

    /// Flattens the root file and all referenced files depth-first
    pub fn tree(&self) -> Result<Vec<TaskNode>, TaskStoreError> {
        let mut nodes = Vec::new();
        let mut ancestors = HashSet::new();
        collect(&self.path, 0, &mut nodes, &mut ancestors)?;
        Ok(nodes)
    }
}

/// Canonical form of a task file path, used to detect reference cycles
fn identity(path: &Path) -> Result<PathBuf, TaskStoreError> {
    fs::canonicalize(path).map_err(|source| {
        if source.kind() == io::ErrorKind::NotFound {
            TaskStoreError::FileNotFound(path.to_path_buf())
        } else {
            TaskStoreError::Io {
                path: path.to_path_buf(),
                source,
            }
        }
    })
}

fn child_path(file_path: &Path, reference: &str) -> PathBuf {
    file_path
        .parent()
        .unwrap_or_else(|| Path::new("."))
        .join(reference)
}

/// Enters `path` on the current resolution chain, failing on a cycle
fn enter(path: &Path, ancestors: &mut HashSet<PathBuf>) -> Result<PathBuf, TaskStoreError> {
    let key = identity(path)?;
    if !ancestors.insert(key.clone()) {
        return Err(TaskStoreError::ReferenceCycle(path.to_path_buf()));
    }
    Ok(key)
}

/// Returns the file as written when the task was found under `path`
fn update_in(
    path: &Path,
    task_id: &str,
    status: TaskStatus,
    ancestors: &mut HashSet<PathBuf>,
) -> Result<Option<TaskFile>, TaskStoreError> {
    let key = enter(path, ancestors)?;
    let result = update_file(path, task_id, status, ancestors);
    ancestors.remove(&key);
    result
}

fn update_file(
    path: &Path,
    task_id: &str,
    status: TaskStatus,
    ancestors: &mut HashSet<PathBuf>,
) -> Result<Option<TaskFile>, TaskStoreError> {
    let mut file = read_task_file(path)?;

    if let Some(task) = file.find_mut(task_id) {
        task.status = status;
        write_task_file(path, &file)?;
        debug!(task = task_id, %status, file = %path.display(), "Updated task");
        return Ok(Some(file));
    }

    for index in 0..file.tasks.len() {
        let Some(child) = file.tasks[index].child_ref().map(|r| child_path(path, r)) else {
            continue;
        };

        if let Some(child_file) = update_in(&child, task_id, status, ancestors)? {
            let aggregate = child_file.aggregate_status();
            let parent = &mut file.tasks[index];
            parent.status = aggregate;
            debug!(
                task = %parent.id,
                status = %aggregate,
                file = %path.display(),
                "Recomputed aggregate status"
            );
            write_task_file(path, &file)?;
            return Ok(Some(file));
        }
    }

    Ok(None)
}

fn collect(
    path: &Path,
    depth: usize,
    nodes: &mut Vec<TaskNode>,
    ancestors: &mut HashSet<PathBuf>,
) -> Result<(), TaskStoreError> {
    let key = enter(path, ancestors)?;
    let file = read_task_file(path)?;

    for task in file.tasks {
        let child = task.child_ref().map(|r| child_path(path, r));
        nodes.push(TaskNode {
            depth,
            file: path.to_path_buf(),
            task,
        });
        if let Some(child) = child {
            collect(&child, depth + 1, nodes, ancestors)?;
        }
    }

    ancestors.remove(&key);
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;
    use std::thread;
    use tempfile::TempDir;

    fn task(id: &str, status: TaskStatus) -> TaskRecord {
        TaskRecord::new(id, status)
    }

    fn parent_task(id: &str, status: TaskStatus, reference: &str) -> TaskRecord {
        let mut record = TaskRecord::new(id, status);
        record.children = Some(format!("$ref:{}", reference));
        record
    }

    /// Root file with task "1" referencing `1/tasks.jsonc` holding "1.1" and "1.2"
    fn nested_project(sibling: TaskStatus) -> (TempDir, PathBuf, PathBuf) {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("tasks.jsonc");
        let child = dir.path().join("1").join("tasks.jsonc");
        fs::create_dir_all(child.parent().unwrap()).unwrap();

        let root_file = TaskFile::new(
            2,
            vec![
                parent_task("1", TaskStatus::InProgress, "1/tasks.jsonc"),
                task("2", TaskStatus::Pending),
            ],
        );
        write_task_file(&root, &root_file).unwrap();

        let mut child_file = TaskFile::new(
            2,
            vec![task("1.1", sibling), task("1.2", TaskStatus::Pending)],
        );
        child_file.parent = Some("1".to_string());
        write_task_file(&child, &child_file).unwrap();

        (dir, root, child)
    }

    #[test]
    fn update_root_task() {
        let (_dir, root, _child) = nested_project(TaskStatus::Completed);
        let store = TaskStore::new(&root);

        store.update("2", TaskStatus::InProgress).unwrap();

        let file = store.read().unwrap();
        assert_eq!(file.find("2").unwrap().status, TaskStatus::InProgress);
    }

    #[test]
    fn nested_update_completes_parent() {
        let (_dir, root, child) = nested_project(TaskStatus::Completed);
        let store = TaskStore::new(&root);

        store.update("1.2", TaskStatus::Completed).unwrap();

        let child_file = read_task_file(&child).unwrap();
        assert_eq!(child_file.find("1.2").unwrap().status, TaskStatus::Completed);
        assert_eq!(child_file.parent.as_deref(), Some("1"));

        let root_file = store.read().unwrap();
        assert_eq!(root_file.find("1").unwrap().status, TaskStatus::Completed);
    }

    #[test]
    fn nested_update_with_mixed_children() {
        let (_dir, root, _child) = nested_project(TaskStatus::Pending);
        let store = TaskStore::new(&root);

        store.update("1.2", TaskStatus::Completed).unwrap();

        let root_file = store.read().unwrap();
        assert_eq!(root_file.find("1").unwrap().status, TaskStatus::InProgress);
    }

    #[test]
    fn nested_update_back_to_pending() {
        let (_dir, root, _child) = nested_project(TaskStatus::Pending);
        let store = TaskStore::new(&root);

        store.update("1.2", TaskStatus::Pending).unwrap();

        let root_file = store.read().unwrap();
        assert_eq!(root_file.find("1").unwrap().status, TaskStatus::Pending);
    }

    #[test]
    fn unknown_task_is_not_found() {
        let (_dir, root, _child) = nested_project(TaskStatus::Pending);
        let store = TaskStore::new(&root);

        let err = store.update("9.9", TaskStatus::Completed).unwrap_err();
        assert!(matches!(err, TaskStoreError::TaskNotFound(id) if id == "9.9"));
    }

    #[test]
    fn missing_root_is_file_not_found() {
        let dir = TempDir::new().unwrap();
        let store = TaskStore::new(dir.path().join("tasks.jsonc"));

        let err = store.update("1", TaskStatus::Completed).unwrap_err();
        assert!(matches!(err, TaskStoreError::FileNotFound(_)));
    }

    #[test]
    fn missing_child_file_is_file_not_found() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("tasks.jsonc");
        write_task_file(
            &root,
            &TaskFile::new(2, vec![parent_task("1", TaskStatus::Pending, "gone.jsonc")]),
        )
        .unwrap();

        let err = TaskStore::new(&root)
            .update("1.1", TaskStatus::Completed)
            .unwrap_err();
        assert!(matches!(err, TaskStoreError::FileNotFound(_)));
    }

    #[test]
    fn reference_cycle_is_detected() {
        let dir = TempDir::new().unwrap();
        let a = dir.path().join("a.jsonc");
        let b = dir.path().join("b.jsonc");
        write_task_file(
            &a,
            &TaskFile::new(2, vec![parent_task("a", TaskStatus::Pending, "b.jsonc")]),
        )
        .unwrap();
        write_task_file(
            &b,
            &TaskFile::new(2, vec![parent_task("b", TaskStatus::Pending, "a.jsonc")]),
        )
        .unwrap();

        let store = TaskStore::new(&a);
        let err = store.update("missing", TaskStatus::Completed).unwrap_err();
        assert!(matches!(err, TaskStoreError::ReferenceCycle(_)));

        let err = store.tree().unwrap_err();
        assert!(matches!(err, TaskStoreError::ReferenceCycle(_)));
    }

    #[test]
    fn shared_child_file_is_not_a_cycle() {
        let dir = TempDir::new().unwrap();
        let root = dir.path().join("tasks.jsonc");
        let shared = dir.path().join("shared.jsonc");
        write_task_file(
            &root,
            &TaskFile::new(
                2,
                vec![
                    parent_task("1", TaskStatus::Pending, "shared.jsonc"),
                    parent_task("2", TaskStatus::Pending, "shared.jsonc"),
                ],
            ),
        )
        .unwrap();
        write_task_file(&shared, &TaskFile::new(2, vec![task("s", TaskStatus::Pending)]))
            .unwrap();

        let nodes = TaskStore::new(&root).tree().unwrap();
        assert_eq!(nodes.len(), 4);
    }

    #[test]
    fn tree_flattens_depth_first() {
        let (_dir, root, child) = nested_project(TaskStatus::Completed);

        let nodes = TaskStore::new(&root).tree().unwrap();
        let ids: Vec<_> = nodes.iter().map(|n| (n.task.id.as_str(), n.depth)).collect();
        assert_eq!(ids, vec![("1", 0), ("1.1", 1), ("1.2", 1), ("2", 0)]);
        assert_eq!(nodes[1].file, child);
    }

    #[test]
    fn concurrent_reader_never_sees_torn_write() {
        let (_dir, root, _child) = nested_project(TaskStatus::Pending);
        let done = Arc::new(AtomicBool::new(false));

        let reader = {
            let root = root.clone();
            let done = Arc::clone(&done);
            thread::spawn(move || {
                let mut reads = 0;
                loop {
                    read_task_file(&root).expect("reader observed an unparseable file");
                    reads += 1;
                    if done.load(Ordering::SeqCst) {
                        break reads;
                    }
                }
            })
        };

        let store = TaskStore::new(&root);
        for i in 0..50 {
            let status = if i % 2 == 0 {
                TaskStatus::Completed
            } else {
                TaskStatus::Pending
            };
            store.update("1.2", status).unwrap();
            store.update("2", status).unwrap();
        }

        done.store(true, Ordering::SeqCst);
        assert!(reader.join().unwrap() > 0);
    }
}
