//! Command implementations
//!
//! Each handler prints its own output and returns the exit code to use.
//! `Err` is reserved for failures of the command itself, such as a broken pipe
//! or a report that fails to serialize.

use anyhow::{Context, Result};
use std::path::Path;

use answercheck_doctor::{CheckStatus, DoctorCommand};
use answercheck_engine::{FixtureSet, Orchestrator};
use answercheck_leakscan::{LeakMatch, LeakScanner};
use answercheck_runner::{NativeRunner, StdioMode};

use crate::{CheckError, Config, ExitCode};

// ============================================================================
// Run
// ============================================================================

/// Run every stage and report the first failure.
///
/// In JSON mode stdout carries only the report. Child stdout goes to stderr,
/// and the diagnostics that a plain run prints on stdout are found in the
/// report's `error` field.
pub fn execute_run(config: Config, json: bool) -> Result<ExitCode> {
    let runner = NativeRunner::new().with_kill_grace(config.kill_grace());
    let child_stdio = if json {
        StdioMode::StdoutToStderr
    } else {
        StdioMode::Inherit
    };
    let mut orchestrator = match Orchestrator::new(config, runner) {
        Ok(orchestrator) => orchestrator.with_child_stdio(child_stdio),
        Err(err) => {
            eprint!("{}", err.display_for_user());
            return Ok(err.to_exit_code());
        }
    };

    let outcome = orchestrator.run();

    if json {
        let report = outcome
            .report
            .to_json()
            .context("Failed to serialize run report")?;
        println!("{report}");
    } else if outcome.is_success() {
        println!("{} fixture(s) passed", outcome.report.fixtures.len());
    }

    if let Some(err) = &outcome.error {
        if !json {
            print_diagnostic(err);
        }
        eprint!("{}", err.display_for_user_with_scanner(orchestrator.scanner()));
    }

    Ok(outcome.exit_code())
}

/// Diagnostic lines on stdout for the log postconditions.
fn print_diagnostic(err: &CheckError) {
    match err {
        CheckError::LogNotCreated { .. } => println!("{err}"),
        CheckError::PasswordLeaked { leaks, .. } => {
            print_leaks(leaks);
            println!("{err}");
        }
        _ => {}
    }
}

fn print_leaks(leaks: &[LeakMatch]) {
    for leak in leaks {
        println!("{}", leak.masked_line);
    }
}

// ============================================================================
// List / Plan
// ============================================================================

pub fn execute_list(config: &Config, json: bool) -> Result<ExitCode> {
    let fixtures = match FixtureSet::discover(&config.root, &config.fixtures.pattern) {
        Ok(fixtures) => fixtures,
        Err(err) => {
            eprint!("{}", err.display_for_user());
            return Ok(err.to_exit_code());
        }
    };

    if json {
        let names: Vec<&str> = fixtures.iter().map(|f| f.relative.as_str()).collect();
        println!(
            "{}",
            serde_json::to_string_pretty(&names).context("Failed to serialize fixture list")?
        );
    } else {
        for fixture in &fixtures {
            println!("{}", fixture.relative);
        }
        if fixtures.is_empty() {
            eprintln!("No fixtures match {}", fixtures.pattern());
        }
    }
    Ok(ExitCode::SUCCESS)
}

pub fn execute_plan(config: Config, json: bool) -> Result<ExitCode> {
    let runner = NativeRunner::new().with_kill_grace(config.kill_grace());
    let steps = match Orchestrator::new(config, runner).and_then(|o| o.plan()) {
        Ok(steps) => steps,
        Err(err) => {
            eprint!("{}", err.display_for_user());
            return Ok(err.to_exit_code());
        }
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&steps).context("Failed to serialize plan")?
        );
        return Ok(ExitCode::SUCCESS);
    }

    for step in &steps {
        let fixture = step
            .fixture
            .as_deref()
            .map(|f| format!(" {f}"))
            .unwrap_or_default();
        let timeout = step
            .timeout_secs
            .map(|secs| format!(" (timeout {secs}s)"))
            .unwrap_or_default();
        println!("[{}]{fixture}: {}{timeout}", step.stage, step.description);
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// Scan-log / Validate
// ============================================================================

pub fn execute_scan_log(scanner: &LeakScanner, path: &Path) -> Result<ExitCode> {
    let leaks = match scanner.scan_file(path) {
        Ok(leaks) => leaks,
        Err(err) => {
            let err = CheckError::from(err);
            eprint!("{}", err.display_for_user_with_scanner(scanner));
            return Ok(err.to_exit_code());
        }
    };

    if leaks.is_empty() {
        println!("No leaks in {}", path.display());
        return Ok(ExitCode::SUCCESS);
    }

    let err = CheckError::PasswordLeaked {
        path: path.display().to_string(),
        leaks,
    };
    print_diagnostic(&err);
    Ok(err.to_exit_code())
}

pub fn execute_validate(path: &Path, json: bool) -> Result<ExitCode> {
    let summary = match answercheck_validation::validate_install_config(path) {
        Ok(summary) => summary,
        Err(err) => {
            let err = CheckError::from(err);
            eprint!("{}", err.display_for_user());
            return Ok(err.to_exit_code());
        }
    };

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&summary).context("Failed to serialize summary")?
        );
    } else {
        println!(
            "{}: {} storage action(s) valid, {} swap mount(s)",
            path.display(),
            summary.actions,
            summary.swap_mounts
        );
        for (kind, count) in &summary.by_type {
            println!("  {kind}: {count}");
        }
    }
    Ok(ExitCode::SUCCESS)
}

// ============================================================================
// Doctor / Config
// ============================================================================

pub fn execute_doctor(config: Config, json: bool, strict_exit: bool) -> Result<ExitCode> {
    let output = DoctorCommand::new(config).run_strict(strict_exit);

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&output).context("Failed to emit doctor JSON")?
        );
    } else {
        println!("answercheck environment health check");
        println!();
        for check in &output.checks {
            let marker = match check.status {
                CheckStatus::Pass => "ok  ",
                CheckStatus::Warn => "warn",
                CheckStatus::Fail => "FAIL",
            };
            println!("  [{marker}] {}: {}", check.name, check.details);
        }
        if !output.ok {
            println!();
            if strict_exit {
                println!("Some checks failed or warned (strict mode). Please address the issues above.");
            } else {
                println!("Some checks failed. Please address the issues above before running answercheck.");
            }
        }
    }

    Ok(if output.ok {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}

pub fn execute_config(config: &Config, json: bool) -> Result<ExitCode> {
    let entries = config.effective_config();

    if json {
        println!(
            "{}",
            serde_json::to_string_pretty(&entries).context("Failed to serialize configuration")?
        );
        return Ok(ExitCode::SUCCESS);
    }

    match &config.config_path {
        Some(path) => println!("# config file: {}", path.display()),
        None => println!("# config file: none"),
    }
    let width = entries.iter().map(|e| e.key.len()).max().unwrap_or(0);
    for entry in &entries {
        println!(
            "{:width$} = {}  ({})",
            entry.key, entry.value, entry.source
        );
    }
    Ok(ExitCode::SUCCESS)
}
