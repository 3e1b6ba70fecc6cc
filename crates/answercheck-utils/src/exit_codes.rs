//! Exit code constants and error kind mapping for answercheck.
//!
//! Exit statuses follow the conventions of a POSIX shell driving the same steps, so
//! CI systems that already understand `timeout(1)` and `sh` statuses need no changes.
//!
//! # Exit Code Table
//!
//! | Code | Constant | Description |
//! |------|----------|-------------|
//! | 0 | `SUCCESS` | Every step passed for every fixture |
//! | 1 | `FAILURE` | Explicit check failed, or an internal error |
//! | 2 | `CLI_ARGS` | Invalid CLI arguments or configuration |
//! | 124 | `TIMEOUT` | A bounded child outlived its time limit |
//! | 126 | `CANNOT_EXECUTE` | A child program exists but could not be started |
//! | 127 | `NOT_FOUND` | A child program was not found |
//! | 128+n | | A child was killed by signal `n` |
//! | other | | Propagated from a failing child |

use answercheck_runner::RunnerError;

use crate::error::{CheckError, StageError};
use crate::types::ErrorKind;

/// Process exit status for answercheck.
///
/// Use the named constants for statuses answercheck produces itself. Statuses
/// propagated from a failing child are built with [`from_i32()`](Self::from_i32).
///
/// # Example
///
/// ```rust
/// use answercheck_utils::exit_codes::ExitCode;
///
/// assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
/// assert_eq!(ExitCode::TIMEOUT.as_i32(), 124);
/// assert_eq!(ExitCode::from_i32(3), ExitCode::from(3));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExitCode(i32);

impl ExitCode {
    /// Success - every step passed
    pub const SUCCESS: ExitCode = ExitCode(0);

    /// Failure - an explicit check failed or answercheck itself failed
    pub const FAILURE: ExitCode = ExitCode(1);

    /// CLI arguments error - invalid command-line arguments or configuration
    pub const CLI_ARGS: ExitCode = ExitCode(2);

    /// Timeout - a bounded child was terminated at its deadline
    pub const TIMEOUT: ExitCode = ExitCode(124);

    /// Cannot execute - the program exists but spawning it failed
    pub const CANNOT_EXECUTE: ExitCode = ExitCode(126);

    /// Not found - the program is not on PATH
    pub const NOT_FOUND: ExitCode = ExitCode(127);

    /// Get the numeric exit code value.
    ///
    /// Use this with `std::process::exit()`.
    #[must_use]
    pub const fn as_i32(self) -> i32 {
        self.0
    }

    /// Create an ExitCode from a raw i32 value.
    #[must_use]
    pub const fn from_i32(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<i32> for ExitCode {
    fn from(code: i32) -> Self {
        ExitCode(code)
    }
}

impl From<ExitCode> for i32 {
    fn from(code: ExitCode) -> Self {
        code.0
    }
}

/// Convert `CheckError` to (`exit_code`, `error_kind`) tuple
#[must_use]
pub fn error_to_exit_code_and_kind(error: &CheckError) -> (ExitCode, ErrorKind) {
    match error {
        CheckError::Config(_) => (ExitCode::CLI_ARGS, ErrorKind::CliArgs),

        CheckError::Stage(stage_err) => match stage_err {
            // Never report success for a failed stage
            StageError::Failed { code, .. } if *code == 0 => {
                (ExitCode::FAILURE, ErrorKind::StageFailed)
            }
            StageError::Failed { code, .. } => (ExitCode::from_i32(*code), ErrorKind::StageFailed),
            StageError::Timeout { .. } => (ExitCode::TIMEOUT, ErrorKind::Timeout),
            StageError::Spawn { source, .. } => match source {
                RunnerError::SpawnFailed {
                    not_found: true, ..
                } => (ExitCode::NOT_FOUND, ErrorKind::NotFound),
                RunnerError::SpawnFailed { .. } => {
                    (ExitCode::CANNOT_EXECUTE, ErrorKind::CannotExecute)
                }
                RunnerError::Timeout { .. } => (ExitCode::TIMEOUT, ErrorKind::Timeout),
                _ => (ExitCode::FAILURE, ErrorKind::Unknown),
            },
        },

        CheckError::Validation(_) => (ExitCode::FAILURE, ErrorKind::ValidationFailed),
        CheckError::NoFixtures { .. } => (ExitCode::FAILURE, ErrorKind::NoFixtures),
        CheckError::LogNotCreated { .. } => (ExitCode::FAILURE, ErrorKind::LogMissing),
        CheckError::PasswordLeaked { .. } => (ExitCode::FAILURE, ErrorKind::PasswordLeaked),

        CheckError::LeakScan(_) | CheckError::Io(_) => (ExitCode::FAILURE, ErrorKind::Unknown),
    }
}

impl CheckError {
    /// Map this error to its process exit code.
    ///
    /// | Error | Exit code |
    /// |-------|-----------|
    /// | `Config` | 2 |
    /// | `Stage(Failed)` | the child's status |
    /// | `Stage(Timeout)` | 124 |
    /// | `Stage(Spawn)` | 127 not found, 126 otherwise |
    /// | everything else | 1 |
    #[must_use]
    pub fn to_exit_code(&self) -> ExitCode {
        error_to_exit_code_and_kind(self).0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::{ConfigError, ValidationError};
    use crate::types::Stage;

    #[test]
    fn test_exit_code_constants() {
        assert_eq!(ExitCode::SUCCESS.as_i32(), 0);
        assert_eq!(ExitCode::FAILURE.as_i32(), 1);
        assert_eq!(ExitCode::CLI_ARGS.as_i32(), 2);
        assert_eq!(ExitCode::TIMEOUT.as_i32(), 124);
        assert_eq!(ExitCode::CANNOT_EXECUTE.as_i32(), 126);
        assert_eq!(ExitCode::NOT_FOUND.as_i32(), 127);
    }

    #[test]
    fn test_config_error_maps_to_cli_args() {
        let err = CheckError::Config(ConfigError::InvalidFile("bad toml".to_string()));
        assert_eq!(err.to_exit_code(), ExitCode::CLI_ARGS);
        assert_eq!(error_to_exit_code_and_kind(&err).1, ErrorKind::CliArgs);
    }

    #[test]
    fn test_failed_stage_propagates_child_status() {
        let err = CheckError::Stage(StageError::Failed {
            stage: Stage::UnitTests,
            code: 3,
        });
        assert_eq!(err.to_exit_code().as_i32(), 3);

        let signalled = CheckError::Stage(StageError::Failed {
            stage: Stage::Installer,
            code: 137,
        });
        assert_eq!(signalled.to_exit_code().as_i32(), 137);
    }

    #[test]
    fn test_zero_status_never_reported_as_success() {
        let err = CheckError::Stage(StageError::Failed {
            stage: Stage::Installer,
            code: 0,
        });
        assert_eq!(err.to_exit_code(), ExitCode::FAILURE);
    }

    #[test]
    fn test_timeout_maps_to_124() {
        let err = CheckError::Stage(StageError::Timeout {
            stage: Stage::Installer,
            timeout_seconds: 60,
        });
        assert_eq!(err.to_exit_code(), ExitCode::TIMEOUT);
    }

    #[test]
    fn test_spawn_failures() {
        let missing = CheckError::Stage(StageError::Spawn {
            stage: Stage::Readiness,
            source: RunnerError::SpawnFailed {
                program: "cloud-init".to_string(),
                reason: "not found".to_string(),
                not_found: true,
            },
        });
        assert_eq!(missing.to_exit_code(), ExitCode::NOT_FOUND);

        let denied = CheckError::Stage(StageError::Spawn {
            stage: Stage::Readiness,
            source: RunnerError::SpawnFailed {
                program: "./installer".to_string(),
                reason: "permission denied".to_string(),
                not_found: false,
            },
        });
        assert_eq!(denied.to_exit_code(), ExitCode::CANNOT_EXECUTE);
    }

    #[test]
    fn test_explicit_checks_exit_one() {
        let cases = [
            CheckError::LogNotCreated {
                path: "log".to_string(),
            },
            CheckError::PasswordLeaked {
                path: "log".to_string(),
                leaks: Vec::new(),
            },
            CheckError::NoFixtures {
                pattern: "answers*.yaml".to_string(),
            },
            CheckError::Validation(ValidationError::MissingStorage),
        ];
        for err in cases {
            assert_eq!(err.to_exit_code(), ExitCode::FAILURE, "{err}");
        }
    }

    #[test]
    fn test_exit_code_conversions() {
        let code: ExitCode = 42.into();
        let raw: i32 = code.into();
        assert_eq!(raw, 42);
    }
}
