use std::io;
use thiserror::Error;

use answercheck_leakscan::{LeakMatch, LeakScanError, LeakScanner};
use answercheck_runner::RunnerError;

use crate::types::Stage;

/// Library-level error type for an answercheck run.
///
/// Every failure is fatal: the run stops at the first error and the CLI maps it to
/// an exit code with [`to_exit_code()`](Self::to_exit_code).
///
/// | Category | Description |
/// |----------|-------------|
/// | `Config` | Configuration file or CLI argument errors |
/// | `Stage` | A child process failed, timed out or could not start |
/// | `Validation` | The built-in validator rejected the install config |
/// | `LogNotCreated` | Postcondition: the debug log is missing |
/// | `PasswordLeaked` | Security: the placeholder password reached the debug log |
///
/// Library code returns `CheckError` and does NOT call `std::process::exit()`.
#[derive(Error, Debug)]
pub enum CheckError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("{0}")]
    Stage(#[from] StageError),

    #[error("Install config validation failed: {0}")]
    Validation(#[from] ValidationError),

    #[error("Leak scan error: {0}")]
    LeakScan(#[from] LeakScanError),

    #[error("IO error: {0}")]
    Io(#[from] io::Error),

    #[error("No fixtures match '{pattern}'")]
    NoFixtures { pattern: String },

    #[error("log file not created")]
    LogNotCreated { path: String },

    #[error("password leaked into log file")]
    PasswordLeaked { path: String, leaks: Vec<LeakMatch> },
}

/// Errors from configuration loading and validation
#[derive(Error, Debug)]
pub enum ConfigError {
    #[error("Invalid configuration file: {0}")]
    InvalidFile(String),

    #[error("Invalid configuration value for {key}: {value}")]
    InvalidValue { key: String, value: String },

    #[error("Configuration file not found at {path}")]
    NotFound { path: String },

    #[error("Configuration discovery failed: {reason}")]
    DiscoveryFailed { reason: String },
}

/// A child process stage did not succeed
#[derive(Error, Debug)]
pub enum StageError {
    #[error("Stage {stage} exited with status {code}")]
    Failed { stage: Stage, code: i32 },

    #[error("Stage {stage} timed out after {timeout_seconds} seconds")]
    Timeout { stage: Stage, timeout_seconds: u64 },

    #[error("Stage {stage} could not start: {source}")]
    Spawn {
        stage: Stage,
        #[source]
        source: RunnerError,
    },
}

impl StageError {
    /// Attribute a runner failure to `stage`.
    #[must_use]
    pub fn from_runner(stage: Stage, err: RunnerError) -> Self {
        match err {
            RunnerError::Timeout { timeout_seconds } => Self::Timeout {
                stage,
                timeout_seconds,
            },
            other => Self::Spawn {
                stage,
                source: other,
            },
        }
    }
}

/// Violations found while checking the `storage.config` actions of an install config
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("Failed to read {path}: {reason}")]
    Read { path: String, reason: String },

    #[error("Failed to parse {path} as YAML: {reason}")]
    Parse { path: String, reason: String },

    #[error("Install config has no storage.config list")]
    MissingStorage,

    #[error("Storage action #{index} is not a mapping")]
    NotAMapping { index: usize },

    #[error("Storage action {action} is missing '{key}'")]
    MissingKey { action: String, key: String },

    #[error("Storage action {action} has '{key}' = '{target}' which is not a known action id")]
    UnknownReference {
        action: String,
        key: String,
        target: String,
    },

    #[error("Storage action {action} partitions '{device}' which has no partition table")]
    NoPartitionTable { action: String, device: String },

    #[error("Storage action {action} has a non-string size")]
    SizeNotString { action: String },

    #[error("Storage action {action} mounts '{device}' without a path but it is not swap")]
    PathlessMountNotSwap { action: String, device: String },

    #[error("Storage action {action} mounts swap '{device}' which is not awaiting a mount")]
    SwapAlreadyMounted { action: String, device: String },

    #[error("Some swap formats had no mounts: {}", ids.join(", "))]
    UnmountedSwap { ids: Vec<String> },
}

/// Trait for errors that can provide user-friendly messages and suggestions
pub trait UserFriendlyError {
    /// Get a user-friendly error message
    fn user_message(&self) -> String;

    /// Get contextual information about the error
    fn context(&self) -> Option<String>;

    /// Get suggested actions to resolve the error
    fn suggestions(&self) -> Vec<String>;
}

impl UserFriendlyError for ConfigError {
    fn user_message(&self) -> String {
        match self {
            Self::InvalidFile(reason) => {
                format!("Configuration file has invalid format: {reason}")
            }
            Self::InvalidValue { key, value } => {
                format!("Configuration '{key}' has invalid value: {value}")
            }
            Self::NotFound { path } => format!("Configuration file not found: {path}"),
            Self::DiscoveryFailed { reason } => {
                format!("Failed to discover configuration: {reason}")
            }
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::InvalidFile(_) => Some(
                "Configuration files are TOML with [installer], [artifacts], [leak_scan] and related sections."
                    .to_string(),
            ),
            Self::InvalidValue { key, .. } => Some(format!(
                "The '{key}' configuration option has specific format requirements."
            )),
            Self::NotFound { .. } | Self::DiscoveryFailed { .. } => Some(
                "answercheck searches for .answercheck/config.toml from the current directory upward."
                    .to_string(),
            ),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::InvalidFile(_) => vec![
                "Check the TOML syntax of .answercheck/config.toml".to_string(),
                "Run 'answercheck config' to see the effective configuration".to_string(),
            ],
            Self::InvalidValue { key, .. } => match key.as_str() {
                "installer.timeout_secs" => {
                    vec!["Use a timeout between 1 and 7200 seconds".to_string()]
                }
                "fixtures.pattern" => vec![
                    "Use a shell-style glob relative to the project root, e.g. 'examples/answers*.yaml'"
                        .to_string(),
                ],
                "validator.mode" => vec!["Use 'external' or 'builtin'".to_string()],
                _ => vec![format!("Fix the value of '{key}' in .answercheck/config.toml")],
            },
            Self::NotFound { .. } => vec![
                "Check the path passed to --config".to_string(),
                "Omit --config to use discovery and built-in defaults".to_string(),
            ],
            Self::DiscoveryFailed { .. } => {
                vec!["Pass an explicit --config path".to_string()]
            }
        }
    }
}

impl UserFriendlyError for CheckError {
    fn user_message(&self) -> String {
        match self {
            Self::Config(err) => err.user_message(),
            other => other.to_string(),
        }
    }

    fn context(&self) -> Option<String> {
        match self {
            Self::Config(err) => err.context(),
            Self::Stage(StageError::Timeout { stage, .. }) => Some(format!(
                "The {stage} step was terminated when it reached its time limit."
            )),
            Self::Stage(StageError::Spawn { source, .. }) => Some(source.to_string()),
            Self::Stage(StageError::Failed { .. }) => None,
            Self::Validation(_) => {
                Some("The built-in validator checks the storage actions of the install config.".to_string())
            }
            Self::LeakScan(_) | Self::Io(_) => None,
            Self::NoFixtures { .. } => {
                Some("Fixtures are matched relative to the project root (--root).".to_string())
            }
            Self::LogNotCreated { path } => Some(format!("Expected the installer to write {path}.")),
            Self::PasswordLeaked { path, leaks } => Some(format!(
                "{} line(s) of {path} contain the placeholder password outside the allowed markers.",
                leaks.len()
            )),
        }
    }

    fn suggestions(&self) -> Vec<String> {
        match self {
            Self::Config(err) => err.suggestions(),
            Self::Stage(StageError::Timeout { .. }) => vec![
                "Raise [installer] timeout_secs or pass --timeout".to_string(),
                "Check whether the installer is waiting for input the fixture does not answer"
                    .to_string(),
            ],
            Self::Stage(StageError::Spawn { .. }) => {
                vec!["Run 'answercheck doctor' to check that every configured program is on PATH".to_string()]
            }
            Self::NoFixtures { .. } => vec![
                "Run 'answercheck list' to see what the pattern matches".to_string(),
                "Pass --pattern or set [fixtures] pattern".to_string(),
            ],
            Self::PasswordLeaked { .. } => vec![
                "Find the logging call that prints the answer value and redact it".to_string(),
            ],
            _ => Vec::new(),
        }
    }
}

impl CheckError {
    /// Get a user-friendly error message with context and actionable suggestions.
    ///
    /// ```text
    /// Error: <user message>
    ///
    /// Context: <context if available>
    ///
    /// Suggestions:
    ///   • <suggestion 1>
    /// ```
    #[must_use]
    pub fn display_for_user(&self) -> String {
        let mut output = String::new();

        output.push_str(&format!("Error: {}\n", self.user_message()));

        if let Some(ctx) = self.context() {
            output.push_str(&format!("\nContext: {ctx}\n"));
        }

        let suggestions = self.suggestions();
        if !suggestions.is_empty() {
            output.push_str("\nSuggestions:\n");
            for suggestion in suggestions {
                output.push_str(&format!("  • {suggestion}\n"));
            }
        }

        output
    }

    /// Same as [`display_for_user`](Self::display_for_user), with the scanner's token
    /// masked as a final safety net.
    #[must_use]
    pub fn display_for_user_with_scanner(&self, scanner: &LeakScanner) -> String {
        scanner.mask(&self.display_for_user())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_diagnostic_message_wording() {
        let missing = CheckError::LogNotCreated {
            path: ".subiquity/subiquity-debug.log".to_string(),
        };
        assert_eq!(missing.to_string(), "log file not created");

        let leaked = CheckError::PasswordLeaked {
            path: ".subiquity/subiquity-debug.log".to_string(),
            leaks: Vec::new(),
        };
        assert_eq!(leaked.to_string(), "password leaked into log file");
    }

    #[test]
    fn test_stage_error_from_runner_timeout() {
        let err = StageError::from_runner(
            Stage::Installer,
            RunnerError::Timeout {
                timeout_seconds: 60,
            },
        );
        match err {
            StageError::Timeout {
                stage,
                timeout_seconds,
            } => {
                assert_eq!(stage, Stage::Installer);
                assert_eq!(timeout_seconds, 60);
            }
            other => panic!("expected timeout, got {other:?}"),
        }
    }

    #[test]
    fn test_stage_error_from_runner_spawn() {
        let err = StageError::from_runner(
            Stage::Readiness,
            RunnerError::SpawnFailed {
                program: "cloud-init".to_string(),
                reason: "No such file or directory".to_string(),
                not_found: true,
            },
        );
        assert!(matches!(
            err,
            StageError::Spawn {
                stage: Stage::Readiness,
                ..
            }
        ));
        assert!(err.to_string().contains("could not start"));
        assert!(err.to_string().contains("cloud-init"));
    }

    #[test]
    fn test_display_for_user_includes_suggestions() {
        let err = CheckError::NoFixtures {
            pattern: "examples/answers*.yaml".to_string(),
        };
        let message = err.display_for_user();
        assert!(message.starts_with("Error: No fixtures match 'examples/answers*.yaml'"));
        assert!(message.contains("Suggestions:"));
        assert!(message.contains("answercheck list"));
    }

    #[test]
    fn test_display_for_user_with_scanner_masks_token() {
        let err = CheckError::Config(ConfigError::InvalidValue {
            key: "leak_scan.allowed_markers".to_string(),
            value: "marker 'passw0rd' equals the token".to_string(),
        });
        let message = err.display_for_user_with_scanner(&LeakScanner::default());
        assert!(!message.contains("passw0rd"));
        assert!(message.contains("[REDACTED]"));
    }

    #[test]
    fn test_unmounted_swap_lists_ids() {
        let err = ValidationError::UnmountedSwap {
            ids: vec!["format-1".to_string(), "format-4".to_string()],
        };
        assert_eq!(
            err.to_string(),
            "Some swap formats had no mounts: format-1, format-4"
        );
    }
}
