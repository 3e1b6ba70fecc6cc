//! CLI entry point and dispatch
//!
//! `run()` parses arguments, discovers the configuration, dispatches to a
//! command handler and owns all error output.

use clap::Parser;

use super::args::{Cli, Commands};
use super::commands;

use crate::{CheckError, CliArgs, Config, ExitCode};
use answercheck_leakscan::LeakScanner;
use answercheck_utils::logging::init_tracing;

/// Main CLI execution function.
///
/// Returns `Err(code)` for any non-zero exit; main.rs only maps it to the
/// process exit status and never prints.
pub fn run() -> Result<(), ExitCode> {
    let cli = Cli::parse();

    if let Err(e) = init_tracing(cli.verbose) {
        eprintln!("Warning: failed to initialize logging: {e}");
    }

    let (skip_readiness, skip_unit_tests) = match &cli.command {
        Some(Commands::Run {
            skip_readiness,
            skip_unit_tests,
            ..
        }) => (*skip_readiness, *skip_unit_tests),
        _ => (false, false),
    };

    let cli_args = CliArgs {
        config_path: cli.config.clone(),
        root: cli.root.clone(),
        timeout_secs: cli.timeout,
        token: cli.token.clone(),
        pattern: cli.pattern.clone(),
        validator_mode: cli.validator,
        skip_readiness,
        skip_unit_tests,
    };

    let config = match Config::discover(&cli_args) {
        Ok(config) => config,
        Err(err) => {
            let err = CheckError::from(err);
            eprint!("{}", err.display_for_user());
            return Err(err.to_exit_code());
        }
    };

    // Mask the token in anything printed from here on
    let scanner = match LeakScanner::from_policy(&config) {
        Ok(scanner) => scanner,
        Err(err) => {
            let err = CheckError::from(err);
            eprint!("{}", err.display_for_user());
            return Err(ExitCode::CLI_ARGS);
        }
    };

    let result = match cli.command {
        None => commands::execute_run(config, false),
        Some(Commands::Run { json, .. }) => commands::execute_run(config, json),
        Some(Commands::List { json }) => commands::execute_list(&config, json),
        Some(Commands::Plan { json }) => commands::execute_plan(config, json),
        Some(Commands::ScanLog { path }) => commands::execute_scan_log(&scanner, &path),
        Some(Commands::Validate { path, json }) => commands::execute_validate(&path, json),
        Some(Commands::Doctor { json, strict_exit }) => {
            commands::execute_doctor(config, json, strict_exit)
        }
        Some(Commands::Config { json }) => commands::execute_config(&config, json),
    };

    match result {
        Ok(code) if code == ExitCode::SUCCESS => Ok(()),
        Ok(code) => Err(code),
        Err(e) => {
            eprintln!("Error: {}", scanner.mask(&format!("{e:#}")));
            Err(ExitCode::FAILURE)
        }
    }
}
