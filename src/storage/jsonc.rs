//! JSON-with-comments storage for task files
//!
//! Task files are JSON documents that tolerate `//` comments. Comments are
//! stripped before parsing and are not written back. Writes are atomic
//! (locked temp file + rename) so a concurrent reader sees either the old or
//! the new document, never a torn one.

use std::fs::{self, File, OpenOptions};
use std::io::{self, BufWriter, Read, Write};
use std::path::{Path, PathBuf};

use fs2::FileExt;

use super::TaskStoreError;
use crate::domain::TaskFile;

/// Removes `//` comments that start outside of string literals.
///
/// The newline ending a comment is kept so line numbers in parse errors
/// still point at the original text.
pub fn strip_comments(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    let mut chars = input.chars().peekable();
    let mut in_string = false;
    let mut escaped = false;

    while let Some(c) = chars.next() {
        if in_string {
            out.push(c);
            if escaped {
                escaped = false;
            } else if c == '\\' {
                escaped = true;
            } else if c == '"' {
                in_string = false;
            }
            continue;
        }

        match c {
            '"' => {
                in_string = true;
                out.push(c);
            }
            '/' if chars.peek() == Some(&'/') => {
                while let Some(&next) = chars.peek() {
                    if next == '\n' {
                        break;
                    }
                    chars.next();
                }
            }
            _ => out.push(c),
        }
    }

    out
}

/// Parses task file contents (comments allowed)
pub fn parse_task_file(content: &str) -> Result<TaskFile, serde_json::Error> {
    serde_json::from_str(&strip_comments(content))
}

fn io_error(path: &Path, source: io::Error) -> TaskStoreError {
    if source.kind() == io::ErrorKind::NotFound {
        TaskStoreError::FileNotFound(path.to_path_buf())
    } else {
        TaskStoreError::Io {
            path: path.to_path_buf(),
            source,
        }
    }
}

/// Reads and parses a task file
pub fn read_task_file(path: &Path) -> Result<TaskFile, TaskStoreError> {
    let mut file = File::open(path).map_err(|e| io_error(path, e))?;

    // Lock is released when file is dropped
    file.lock_shared().map_err(|e| io_error(path, e))?;

    let mut content = String::new();
    file.read_to_string(&mut content)
        .map_err(|e| io_error(path, e))?;

    parse_task_file(&content).map_err(|source| TaskStoreError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Sibling path used while writing `path`
pub fn temp_path(path: &Path) -> PathBuf {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "tasks".to_string());
    path.with_file_name(format!("{}.tmp", name))
}

/// Writes a task file atomically
pub fn write_task_file(path: &Path, task_file: &TaskFile) -> Result<(), TaskStoreError> {
    let temp_path = temp_path(path);

    let mut content = serde_json::to_string_pretty(task_file).map_err(|source| {
        TaskStoreError::Parse {
            path: path.to_path_buf(),
            source,
        }
    })?;
    content.push('\n');

    {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(&temp_path)
            .map_err(|e| io_error(&temp_path, e))?;

        file.lock_exclusive().map_err(|e| io_error(&temp_path, e))?;

        let mut writer = BufWriter::new(&file);
        writer
            .write_all(content.as_bytes())
            .and_then(|_| writer.flush())
            .map_err(|e| io_error(&temp_path, e))?;
        file.sync_all().map_err(|e| io_error(&temp_path, e))?;
    }

    // Atomic rename
    fs::rename(&temp_path, path).map_err(|source| TaskStoreError::Io {
        path: path.to_path_buf(),
        source,
    })
}
