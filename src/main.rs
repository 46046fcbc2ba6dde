use std::process::ExitCode;

use clap::Parser;
use colored::Colorize;

use mini_ci::cli::Cli;
use mini_ci::service::VendorCli;
use mini_ci::{commands, discover};

/// The one place exit codes are decided: command logic only returns
/// `Result`s.
fn main() -> ExitCode {
    let cli = match Cli::try_parse() {
        Ok(cli) => cli,
        Err(err) => {
            let code = if err.use_stderr() { 1 } else { 0 };
            let _ = err.print();
            return ExitCode::from(code);
        }
    };

    let backend = VendorCli::from_env();
    let result =
        discover::registry_path().and_then(|registry| commands::run(cli, &backend, &registry));

    match result {
        Ok(outcome) => {
            println!("{outcome}");
            ExitCode::SUCCESS
        }
        Err(err) => {
            eprintln!("{} {err}", "[ERROR]".red().bold());
            ExitCode::from(1)
        }
    }
}
