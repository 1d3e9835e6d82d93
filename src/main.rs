use baseliner::cli::{Cli, CliError};
use colored::*;
use std::process::ExitCode;

fn main() -> ExitCode {
    let cli = Cli::parse();

    match cli.run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {:#}", "Error:".red(), e);
            match e.downcast_ref::<CliError>() {
                Some(cli_error) => ExitCode::from(cli_error.exit_code()),
                None => ExitCode::FAILURE,
            }
        }
    }
}
