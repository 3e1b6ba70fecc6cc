//! answercheck - drive an installer through its answers fixtures in dry-run mode
//!
//! A run waits for cloud-init, runs unit test discovery and then, for every
//! fixture matching `examples/answers*.yaml` in lexicographic order:
//!
//! 1. removes the stale install config, debug log and updating marker,
//! 2. runs the installer with the fixture under a time limit,
//! 3. validates the install config it produced,
//! 4. checks that the debug log exists,
//! 5. scans the debug log for the placeholder password.
//!
//! The first failure stops the run and decides the exit status.
//!
//! # Quick Start (CLI)
//!
//! ```bash
//! # Full run from the project root
//! answercheck
//!
//! # Developer machine: no cloud-init, no unit tests
//! answercheck run --skip-readiness --skip-unit-tests
//!
//! # Environment health checks
//! answercheck doctor --json
//! ```
//!
//! # Quick Start (Library)
//!
//! ```rust,no_run
//! use answercheck::{Config, NativeRunner, Orchestrator};
//! use std::time::Duration;
//!
//! let config = Config::builder()
//!     .root("/srv/subiquity")
//!     .skip_readiness()
//!     .installer_timeout(Duration::from_secs(120))
//!     .build()?;
//! let runner = NativeRunner::new().with_kill_grace(config.kill_grace());
//!
//! let outcome = Orchestrator::new(config, runner)?.run();
//! println!("{}", outcome.report.to_json()?);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod cli;

pub use answercheck_config::{CliArgs, Config, ConfigBuilder, ValidatorMode};
pub use answercheck_doctor::{DoctorCommand, DoctorOutput};
pub use answercheck_engine::{Fixture, FixtureSet, Orchestrator, PlannedStep, RunOutcome, RunReport};
pub use answercheck_leakscan::{LeakMatch, LeakScanner};
pub use answercheck_runner::{CommandSpec, NativeRunner, ProcessRunner};
pub use answercheck_utils::error::CheckError;
pub use answercheck_utils::exit_codes::ExitCode;
pub use answercheck_validation::{StorageSummary, validate_install_config};
