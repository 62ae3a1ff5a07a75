// Author: Dustin Pilgrim
// License: MIT

use std::process::ExitCode;

use clap::Parser;

use cwsave::cli::{self, CwsaveArgs};
use cwsave::commands;
use cwsave::error::exit_code;

fn main() -> ExitCode {
    let args = match CwsaveArgs::try_parse() {
        Ok(args) => args,
        Err(err) => {
            // --help and --version land here too and are not failures.
            let code = if err.use_stderr() {
                exit_code::INVALID_ARGUMENT
            } else {
                exit_code::SUCCESS
            };
            let _ = err.print();
            return ExitCode::from(code as u8);
        }
    };

    cli::init_logging(&args.log_level);
    let code = commands::run(args.command);
    ExitCode::from(u8::try_from(code).unwrap_or(1))
}
