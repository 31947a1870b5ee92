//! # Command-Line Interface
//!
//! User-facing CLI commands and output formatting.
//!
//! ## Command Groups
//!
//! | Group | Purpose | Examples |
//! |-------|---------|----------|
//! | Track | Automated commits | `track tasks.jsonc --id add-auth` |
//! | Task | Task file edits and views | `task start`, `task done`, `task list` |
//!
//! ## Output Formats
//!
//! All commands support `--format` flag:
//! - `text` (default) - Human-readable output
//! - `json` - Machine-parseable JSON, one object per line
//!
//! ## Verbose Mode
//!
//! Use `--verbose` (or `-v`) for debug output; `RUST_LOG` overrides the
//! log filter entirely:
//! ```bash
//! specdeck --verbose track specs/changes/add-auth/tasks.jsonc --id add-auth
//! ```
//!
//! ## Entry Point
//!
//! Call [`run()`] to parse arguments and execute the appropriate command.

mod app;
mod output;
mod task;
mod track;

pub use app::{run, Cli, Commands};
pub use output::Output;
