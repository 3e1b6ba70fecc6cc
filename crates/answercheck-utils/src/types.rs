//! Shared value types

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;

/// One step of an answercheck run, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Stage {
    /// Block until the provisioning service reports done
    Readiness,
    /// Project-wide unit test discovery
    UnitTests,
    /// Removal of stale artifacts before a fixture
    Cleanup,
    /// Installer invocation for one fixture
    Installer,
    /// Validation of the produced install config
    Validation,
    /// Postcondition: the debug log exists
    LogCheck,
    /// Placeholder password scan of the debug log
    LeakScan,
}

impl Stage {
    /// Stable identifier used in logs and reports.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Readiness => "readiness",
            Self::UnitTests => "unit_tests",
            Self::Cleanup => "cleanup",
            Self::Installer => "installer",
            Self::Validation => "validation",
            Self::LogCheck => "log_check",
            Self::LeakScan => "leak_scan",
        }
    }
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where an effective configuration value came from.
///
/// Precedence, highest first: CLI argument, programmatic builder, config file,
/// built-in default.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConfigSource {
    /// Value provided via CLI argument (highest precedence).
    Cli,
    /// Value loaded from configuration file.
    Config,
    /// Value provided programmatically (e.g., `Config::builder()`).
    Programmatic,
    /// Built-in default value (lowest precedence).
    Default,
}

impl ConfigSource {
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Cli => "cli",
            Self::Config => "config",
            Self::Programmatic => "programmatic",
            Self::Default => "default",
        }
    }
}

impl fmt::Display for ConfigSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Machine-readable failure kind reported alongside the exit code
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    CliArgs,
    StageFailed,
    Timeout,
    NotFound,
    CannotExecute,
    ValidationFailed,
    LogMissing,
    PasswordLeaked,
    NoFixtures,
    Unknown,
}

/// Output of `answercheck doctor`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorOutput {
    pub schema_version: String,
    /// RFC3339 UTC timestamp when the doctor output was emitted
    pub emitted_at: DateTime<Utc>,
    /// False if any check failed
    pub ok: bool,
    /// Sorted by name before emission
    pub checks: Vec<DoctorCheck>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DoctorCheck {
    pub name: String,
    pub status: CheckStatus,
    pub details: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum CheckStatus {
    Pass,
    Warn,
    Fail,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_stage_serialization() {
        let json = serde_json::to_string(&Stage::UnitTests).unwrap();
        assert_eq!(json, r#""unit_tests""#);

        let json = serde_json::to_string(&Stage::LeakScan).unwrap();
        assert_eq!(json, r#""leak_scan""#);
    }

    #[test]
    fn test_stage_display_matches_serde() {
        for stage in [
            Stage::Readiness,
            Stage::UnitTests,
            Stage::Cleanup,
            Stage::Installer,
            Stage::Validation,
            Stage::LogCheck,
            Stage::LeakScan,
        ] {
            let json = serde_json::to_string(&stage).unwrap();
            assert_eq!(json, format!("\"{stage}\""));
        }
    }

    #[test]
    fn test_config_source_labels() {
        assert_eq!(ConfigSource::Cli.to_string(), "cli");
        assert_eq!(ConfigSource::Config.to_string(), "config");
        assert_eq!(ConfigSource::Programmatic.to_string(), "programmatic");
        assert_eq!(ConfigSource::Default.to_string(), "default");
    }

    #[test]
    fn test_error_kind_serialization() {
        let json = serde_json::to_string(&ErrorKind::PasswordLeaked).unwrap();
        assert_eq!(json, r#""password_leaked""#);
    }

    #[test]
    fn test_check_status_serialization() {
        let check = DoctorCheck {
            name: "installer_program".to_string(),
            status: CheckStatus::Warn,
            details: "not found".to_string(),
        };
        let json = serde_json::to_value(&check).unwrap();
        assert_eq!(json["status"], "warn");
    }
}
