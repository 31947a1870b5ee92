//! Main CLI application structure

use anyhow::Result;
use clap::{Parser, Subcommand};

use super::output::Output;
use super::task;
use super::track::{self, TrackArgs};
use crate::storage::{Config, OutputFormat};

#[derive(Parser)]
#[command(name = "specdeck")]
#[command(author, version, about = "Task tracking with automatic git commits")]
#[command(propagate_version = true)]
pub struct Cli {
    /// Output format (defaults to the global config, else text)
    #[arg(long, short = 'f', global = true)]
    pub format: Option<OutputFormat>,

    /// Enable verbose output for debugging
    #[arg(long, short = 'v', global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand)]
pub enum Commands {
    /// Watch a task file and commit work as tasks start and complete
    Track(TrackArgs),

    /// Read and update task files
    #[command(subcommand)]
    Task(task::TaskCommands),
}

/// Main entry point for the CLI
pub fn run() -> Result<()> {
    let cli = Cli::parse();
    setup_logging(cli.verbose);

    let format = match cli.format {
        Some(format) => format,
        None => Config::load(&std::env::current_dir()?)?.global.default_format,
    };
    let output = Output::new(format, cli.verbose);

    match cli.command {
        Commands::Track(args) => track::run(args, &output)?,
        Commands::Task(cmd) => task::run(cmd, &output)?,
    }

    output.verbose_ctx("cli", "Command completed successfully");
    Ok(())
}

fn setup_logging(verbose: bool) {
    let filter = tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        if verbose {
            tracing_subscriber::EnvFilter::new("specdeck=debug")
        } else {
            tracing_subscriber::EnvFilter::new("specdeck=warn")
        }
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}
