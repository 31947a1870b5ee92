//! `specdeck track`: commit task work as task statuses change

use std::path::{Path, PathBuf};
use std::thread;
use std::time::Duration;

use anyhow::{anyhow, bail, Result};
use clap::Args;
use tracing::{info, warn};

use super::output::Output;
use crate::git::{Committer, Session};
use crate::storage::Config;
use crate::tracker::{CancelToken, TrackOutcome, Tracker};

#[derive(Args)]
pub struct TrackArgs {
    /// Task file to watch
    pub tasks_file: PathBuf,

    /// Session ID used in commit subjects, e.g. `add-auth`
    #[arg(long)]
    pub id: String,

    /// Session kind used in commit subjects (defaults to track.session_kind)
    #[arg(long)]
    pub kind: Option<String>,

    /// Repository root (defaults to the repository holding the task file)
    #[arg(long)]
    pub repo: Option<PathBuf>,

    /// Stage binary files too
    #[arg(long)]
    pub include_binaries: bool,

    /// Quiet period before a change is handled (defaults to track.debounce_ms)
    #[arg(long)]
    pub debounce_ms: Option<u64>,
}

pub fn run(args: TrackArgs, output: &Output) -> Result<()> {
    let start = match &args.repo {
        Some(repo) => repo.clone(),
        None => args
            .tasks_file
            .parent()
            .map(Path::to_path_buf)
            .unwrap_or_default(),
    };
    let config = Config::load(&start)?;

    let repo_root = match args.repo {
        Some(repo) => repo,
        None => config.repo_root.clone().ok_or_else(|| {
            anyhow!(
                "{} is not inside a git repository (use --repo)",
                args.tasks_file.display()
            )
        })?,
    };

    let track = &config.project.track;
    let debounce_ms = args.debounce_ms.unwrap_or(track.debounce_ms);
    if debounce_ms == 0 {
        bail!("--debounce-ms must be greater than zero");
    }
    let session = Session::new(
        args.kind.unwrap_or_else(|| track.session_kind.clone()),
        args.id,
    );
    let include_binaries = args.include_binaries || track.include_binaries;

    output.verbose_ctx(
        "track",
        &format!(
            "Session {}, repo {}, debounce {}ms, binaries {}",
            session,
            repo_root.display(),
            debounce_ms,
            if include_binaries { "included" } else { "skipped" }
        ),
    );

    let committer = Committer::for_repo(
        session.clone(),
        &repo_root,
        include_binaries,
        &config.global.git_binary,
    );
    let mut tracker = Tracker::new(&args.tasks_file, committer)
        .with_debounce(Duration::from_millis(debounce_ms));

    let cancel = CancelToken::new();
    spawn_interrupt_handler(cancel.clone());

    let result = tracker.run(&cancel, output);
    if let Err(e) = tracker.close() {
        warn!(error = %e, "Failed to stop file watcher");
    }
    let outcome = result?;

    if output.is_json() {
        output.data(&serde_json::json!({
            "session": session.to_string(),
            "outcome": outcome,
            "tasks_file": args.tasks_file.display().to_string(),
        }));
    } else if outcome == TrackOutcome::Completed {
        output.success(&format!("Session {} complete", session));
    }

    Ok(())
}

/// Cancels `cancel` on Ctrl-C. Runs a single-threaded runtime on its own thread.
fn spawn_interrupt_handler(cancel: CancelToken) {
    let spawned = thread::Builder::new()
        .name("specdeck-signal".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread()
                .enable_all()
                .build()
            {
                Ok(runtime) => runtime,
                Err(e) => {
                    warn!(error = %e, "Could not install Ctrl-C handler");
                    return;
                }
            };

            match runtime.block_on(tokio::signal::ctrl_c()) {
                Ok(()) => {
                    info!("Received Ctrl-C, stopping");
                    cancel.cancel();
                }
                Err(e) => warn!(error = %e, "Could not listen for Ctrl-C"),
            }
        });

    if let Err(e) = spawned {
        warn!(error = %e, "Could not spawn signal thread");
    }
}
