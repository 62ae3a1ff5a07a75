// Author: Dustin Pilgrim
// License: MIT

//! One-shot subcommands. Each parses the save once, answers once and
//! returns the process exit code.

use std::io;

use tracing::error;

use crate::cli::Command;
use crate::error::{exit_code, SaveError, SCHEMA_VERSION};
use crate::protocol::ErrorFrame;

mod extract;
mod iter;

pub use extract::{run_gamestate, run_save};
pub use iter::run_iter;

/// Run a parsed subcommand and map its outcome to an exit code. Failures
/// are reported as one JSON object on stderr.
pub fn run(command: Command) -> i32 {
    let result = match command {
        Command::ExtractSave(args) => run_save(&args),
        Command::ExtractGamestate(args) => run_gamestate(&args),
        Command::IterSave(args) => run_iter(&args),
        Command::Serve { path } => {
            let stdin = io::stdin();
            return crate::protocol::serve(&path, stdin.lock(), io::stdout().lock());
        }
    };

    match result {
        Ok(()) => exit_code::SUCCESS,
        Err(err) => report(&err),
    }
}

/// Print `err` as a JSON error object on stderr and return its exit code.
pub fn report(err: &anyhow::Error) -> i32 {
    let save_err = classify(err);
    error!(error = %format!("{:#}", err), "command failed");

    let mut frame = ErrorFrame::new(&save_err);
    if err.chain().count() > 1 {
        frame.message = format!("{:#}", err);
    }
    match serde_json::to_string(&frame) {
        Ok(json) => eprintln!("{}", json),
        Err(_) => eprintln!("{:#}", err),
    }
    frame.exit_code
}

fn classify(err: &anyhow::Error) -> SaveError {
    if let Some(save_err) = err.downcast_ref::<SaveError>() {
        return save_err.clone();
    }
    if let Some(io_err) = err.downcast_ref::<io::Error>() {
        return SaveError::io("<output>", io_err);
    }
    SaveError::internal(format!("{:#}", err))
}

pub(crate) fn check_schema_version(requested: u32) -> Result<(), SaveError> {
    if requested == SCHEMA_VERSION {
        return Ok(());
    }
    Err(SaveError::InvalidRequest {
        message: format!(
            "Requested schema version {} is not supported. Supported: {}",
            requested, SCHEMA_VERSION
        ),
        hint: Some(format!("Pass --schema-version {}", SCHEMA_VERSION)),
    })
}
