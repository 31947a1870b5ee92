//! Debounced watcher for a single file
//!
//! Editors often replace a file (write temp, rename, or remove and recreate)
//! instead of writing in place, so the containing directory is watched and
//! events are filtered down to the target path. Bursts of events collapse into
//! one notification once the debounce window passes without new activity.

use std::fs;
use std::path::{Path, PathBuf};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

use crossbeam::channel::{self, Receiver, Sender, TrySendError};
use crossbeam::select;
use notify::event::{EventKind, ModifyKind, RenameMode};
use notify::{Event, RecommendedWatcher, RecursiveMode, Watcher};
use tracing::{debug, trace};

use super::WatchError;

/// Quiet period used by [`FileWatcher::new`]
pub const DEFAULT_DEBOUNCE: Duration = Duration::from_millis(150);

/// Notification that the watched file changed
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileChanged {
    pub path: PathBuf,
}

/// Watches one file and reports coalesced changes.
///
/// Both channels hold at most one value. When a value is still waiting to be
/// received, newer ones are dropped, so receivers learn that something
/// changed, not how many times.
pub struct FileWatcher {
    path: PathBuf,
    dir: PathBuf,
    events: Receiver<FileChanged>,
    errors: Receiver<WatchError>,
    done: Option<Sender<()>>,
    watcher: Option<RecommendedWatcher>,
    worker: Option<JoinHandle<()>>,
}

impl FileWatcher {
    /// Watches `path` with the default debounce window
    pub fn new(path: impl AsRef<Path>) -> Result<Self, WatchError> {
        Self::with_debounce(path, DEFAULT_DEBOUNCE)
    }

    /// Watches `path`, emitting one notification per quiet `window`
    pub fn with_debounce(path: impl AsRef<Path>, window: Duration) -> Result<Self, WatchError> {
        let path = path.as_ref();
        let target = fs::canonicalize(path).map_err(|source| WatchError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if !target.is_file() {
            return Err(WatchError::NotAFile(target));
        }
        let dir = target
            .parent()
            .map(Path::to_path_buf)
            .ok_or_else(|| WatchError::NotAFile(target.clone()))?;

        let (raw_tx, raw_rx) = channel::unbounded();
        let (event_tx, event_rx) = channel::bounded(1);
        let (error_tx, error_rx) = channel::bounded(1);
        // Never sent on; dropping the sender stops the worker
        let (done_tx, done_rx) = channel::bounded::<()>(0);

        let mut watcher = notify::recommended_watcher(move |res: notify::Result<Event>| {
            let _ = raw_tx.send(res);
        })?;
        watcher.watch(&dir, RecursiveMode::NonRecursive)?;

        let worker_target = target.clone();
        let worker = thread::Builder::new()
            .name("specdeck-watch".to_string())
            .spawn(move || {
                debounce_loop(&worker_target, window, &raw_rx, &done_rx, &event_tx, &error_tx)
            })
            .map_err(|source| WatchError::Io {
                path: target.clone(),
                source,
            })?;

        debug!(path = %target.display(), window_ms = window.as_millis() as u64, "Watching file");

        Ok(Self {
            path: target,
            dir,
            events: event_rx,
            errors: error_rx,
            done: Some(done_tx),
            watcher: Some(watcher),
            worker: Some(worker),
        })
    }

    /// Absolute path of the watched file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Coalesced change notifications
    pub fn events(&self) -> &Receiver<FileChanged> {
        &self.events
    }

    /// Errors reported by the OS watcher
    pub fn errors(&self) -> &Receiver<WatchError> {
        &self.errors
    }

    /// Stops the background loop and releases the OS watch.
    ///
    /// Calling this more than once is a no-op.
    pub fn close(&mut self) -> Result<(), WatchError> {
        if let Some(mut watcher) = self.watcher.take() {
            if let Err(e) = watcher.unwatch(&self.dir) {
                debug!(error = %e, "Unwatch failed, dropping watcher anyway");
            }
        }
        self.done.take();

        match self.worker.take() {
            Some(worker) => worker.join().map_err(|_| WatchError::WorkerPanicked),
            None => Ok(()),
        }
    }
}

impl Drop for FileWatcher {
    fn drop(&mut self) {
        let _ = self.close();
    }
}

fn debounce_loop(
    target: &Path,
    window: Duration,
    raw: &Receiver<notify::Result<Event>>,
    done: &Receiver<()>,
    events: &Sender<FileChanged>,
    errors: &Sender<WatchError>,
) {
    let mut deadline: Option<Instant> = None;

    loop {
        let timer = match deadline {
            Some(at) => channel::at(at),
            None => channel::never(),
        };

        select! {
            recv(done) -> _ => break,
            recv(raw) -> msg => match msg {
                Ok(Ok(event)) => {
                    if is_write_to(&event, target) {
                        trace!(kind = ?event.kind, "Change event, re-arming debounce");
                        deadline = Some(Instant::now() + window);
                    }
                }
                Ok(Err(e)) => offer(errors, WatchError::from(e)),
                Err(_) => break,
            },
            recv(timer) -> _ => {
                deadline = None;
                offer(events, FileChanged { path: target.to_path_buf() });
            }
        }
    }

    trace!(path = %target.display(), "Watch loop stopped");
}

/// Non-blocking send that drops the value when the slot is taken
fn offer<T>(tx: &Sender<T>, value: T) {
    match tx.try_send(value) {
        Ok(()) => {}
        Err(TrySendError::Full(_)) => trace!("Receiver has not drained the last value, dropping"),
        Err(TrySendError::Disconnected(_)) => {}
    }
}

/// Returns true for events that write or (re)create the target file
fn is_write_to(event: &Event, target: &Path) -> bool {
    let touches = || event.paths.iter().any(|p| is_target(p, target));

    match &event.kind {
        EventKind::Create(_) => touches(),
        EventKind::Modify(ModifyKind::Metadata(_)) => false,
        EventKind::Modify(ModifyKind::Name(RenameMode::From)) => false,
        EventKind::Modify(ModifyKind::Name(RenameMode::Both)) => event
            .paths
            .last()
            .is_some_and(|p| is_target(p, target)),
        EventKind::Modify(_) => touches(),
        _ => false,
    }
}

fn is_target(candidate: &Path, target: &Path) -> bool {
    if candidate == target {
        return true;
    }
    if candidate.file_name() != target.file_name() {
        return false;
    }
    candidate
        .parent()
        .and_then(|p| fs::canonicalize(p).ok())
        .is_some_and(|p| Some(p.as_path()) == target.parent())
}
