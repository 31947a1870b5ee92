//! Filesystem watching for task files

use std::io;
use std::path::PathBuf;

use thiserror::Error;

mod file_watcher;

pub use file_watcher::{FileChanged, FileWatcher, DEFAULT_DEBOUNCE};

#[derive(Debug, Error)]
pub enum WatchError {
    #[error("Cannot watch {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },

    #[error("Not a regular file: {}", .0.display())]
    NotAFile(PathBuf),

    #[error("File watch error: {0}")]
    Notify(#[from] notify::Error),

    #[error("Watcher thread panicked")]
    WorkerPanicked,
}

impl WatchError {
    /// Returns true when the watch target does not exist
    pub fn is_not_found(&self) -> bool {
        match self {
            WatchError::Io { source, .. } => source.kind() == io::ErrorKind::NotFound,
            WatchError::Notify(e) => match &e.kind {
                notify::ErrorKind::PathNotFound => true,
                notify::ErrorKind::Io(err) => err.kind() == io::ErrorKind::NotFound,
                _ => false,
            },
            _ => false,
        }
    }
}
