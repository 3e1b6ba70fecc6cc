//! CLI argument definitions

use clap::{Parser, Subcommand};
use std::path::PathBuf;

use answercheck_config::ValidatorMode;

/// answercheck - run an installer against every answers fixture and check what it leaves behind
#[derive(Parser, Debug)]
#[command(name = "answercheck")]
#[command(about = "Dry-run an installer against every answers fixture and check the results")]
#[command(long_about = r#"
answercheck waits for cloud-init, runs unit test discovery, then drives the
installer through each examples/answers*.yaml fixture in dry-run mode. After
each fixture it validates the produced install config, checks that the debug
log exists and scans it for the placeholder password.

EXAMPLES:
  # Full run with stock settings
  answercheck

  # Skip readiness and unit tests, e.g. on a developer machine
  answercheck run --skip-readiness --skip-unit-tests

  # Only fixtures matching a narrower pattern, with a longer timeout
  answercheck --pattern 'examples/answers-tpm*.yaml' --timeout 120

  # Show what would run without running it
  answercheck plan

  # Scan an existing log for the placeholder password
  answercheck scan-log .subiquity/subiquity-debug.log

CONFIGURATION:
  Configuration is loaded with precedence: CLI flags > config file > defaults
  The config file is discovered by searching upward from CWD for .answercheck/config.toml
  Use --config to specify an explicit config file path

EXIT STATUS:
  0 all checks passed; 1 a check failed; 2 bad arguments or configuration;
  124 installer timed out; other values are passed through from failing commands
"#)]
#[command(version)]
pub struct Cli {
    /// Path to configuration file (overrides discovery)
    #[arg(long, global = true)]
    pub config: Option<PathBuf>,

    /// Project root that fixtures and artifacts are relative to
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Installer timeout in seconds (default: 60)
    #[arg(long, global = true, value_name = "SECONDS")]
    pub timeout: Option<u64>,

    /// Placeholder password to scan the debug log for
    #[arg(long, global = true)]
    pub token: Option<String>,

    /// Fixture glob relative to the root (default: examples/answers*.yaml)
    #[arg(long, global = true)]
    pub pattern: Option<String>,

    /// Install config validator: external or builtin
    #[arg(long, global = true, value_name = "MODE")]
    pub validator: Option<ValidatorMode>,

    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Option<Commands>,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run readiness, unit tests and every fixture (the default)
    Run {
        /// Do not wait for cloud-init
        #[arg(long)]
        skip_readiness: bool,

        /// Do not run unit test discovery
        #[arg(long)]
        skip_unit_tests: bool,

        /// Print the run report as JSON on stdout
        #[arg(long)]
        json: bool,
    },

    /// List the fixtures a run would use, in order
    List {
        #[arg(long)]
        json: bool,
    },

    /// Show every step a run would perform without executing anything
    Plan {
        #[arg(long)]
        json: bool,
    },

    /// Scan an existing log file for the placeholder password
    ScanLog {
        /// Log file to scan
        path: PathBuf,
    },

    /// Check an install config's storage section with the built-in validator
    Validate {
        /// Install config to check
        path: PathBuf,

        #[arg(long)]
        json: bool,
    },

    /// Check that the configured programs, fixtures and artifact directories are usable
    Doctor {
        /// Output doctor results as JSON
        #[arg(long)]
        json: bool,

        /// Treat warnings as failures
        #[arg(long)]
        strict_exit: bool,
    },

    /// Show the effective configuration and where each value came from
    Config {
        #[arg(long)]
        json: bool,
    },
}

/// Build the clap command, for completions and help tests.
#[must_use]
pub fn build_cli() -> clap::Command {
    <Cli as clap::CommandFactory>::command()
}
