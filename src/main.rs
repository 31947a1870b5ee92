//! specdeck - task tracking with automatic git commits

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = specdeck::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
