//! Doctor command for environment health checks
//!
//! Preflight checks for the configured programs, fixture discovery, artifact
//! directory permissions and the leak policy.

pub use answercheck_utils::types::{CheckStatus, DoctorCheck, DoctorOutput};

use chrono::Utc;
use std::collections::BTreeSet;
use std::path::{Path, PathBuf};
use tracing::debug;

use answercheck_config::{Config, ValidatorMode};
use answercheck_engine::FixtureSet;
use answercheck_leakscan::LeakScanner;

const SCHEMA_VERSION: &str = "1";

/// Doctor command implementation
pub struct DoctorCommand {
    config: Config,
}

impl DoctorCommand {
    #[must_use]
    pub fn new(config: Config) -> Self {
        Self { config }
    }

    /// Run all health checks.
    #[must_use]
    pub fn run(&self) -> DoctorOutput {
        self.run_strict(false)
    }

    /// Run all health checks; in strict mode warnings also clear `ok`.
    #[must_use]
    pub fn run_strict(&self, strict: bool) -> DoctorOutput {
        let mut checks = vec![
            self.check_stage_program(
                "readiness_program",
                self.config.readiness.enabled,
                &self.config.readiness.command,
            ),
            self.check_stage_program(
                "unit_tests_program",
                self.config.unit_tests.enabled,
                &self.config.unit_tests.command,
            ),
            self.check_stage_program("installer_program", true, &self.config.installer.command),
            self.check_validator(),
            self.check_fixtures(),
            self.check_artifact_dirs(),
            self.check_config_file(),
            self.check_leak_policy(),
        ];

        // Stable output order
        checks.sort_by(|a, b| a.name.cmp(&b.name));

        let has_fail = checks.iter().any(|c| c.status == CheckStatus::Fail);
        let has_warn = checks.iter().any(|c| c.status == CheckStatus::Warn);
        let ok = !has_fail && (!strict || !has_warn);
        debug!(ok, has_warn, checks = checks.len(), "doctor finished");

        DoctorOutput {
            schema_version: SCHEMA_VERSION.to_string(),
            emitted_at: Utc::now(),
            ok,
            checks,
        }
    }

    fn check_stage_program(&self, name: &str, enabled: bool, command: &[String]) -> DoctorCheck {
        if !enabled {
            return DoctorCheck {
                name: name.to_string(),
                status: CheckStatus::Warn,
                details: "Stage disabled; it will be skipped".to_string(),
            };
        }
        self.check_program(name, command)
    }

    fn check_validator(&self) -> DoctorCheck {
        match self.config.validator.mode {
            ValidatorMode::Builtin => DoctorCheck {
                name: "validator_program".to_string(),
                status: CheckStatus::Pass,
                details: "Using the built-in storage validator".to_string(),
            },
            ValidatorMode::External => {
                self.check_program("validator_program", &self.config.validator.command)
            }
        }
    }

    /// Resolve `command[0]` the way the runner will: on PATH, or relative to
    /// the project root when it contains a separator.
    fn check_program(&self, name: &str, command: &[String]) -> DoctorCheck {
        let Some(program) = command.first() else {
            return DoctorCheck {
                name: name.to_string(),
                status: CheckStatus::Fail,
                details: "No command configured".to_string(),
            };
        };

        match which::which_in(program, std::env::var_os("PATH"), &self.config.root) {
            Ok(path) => DoctorCheck {
                name: name.to_string(),
                status: CheckStatus::Pass,
                details: format!("Found {program} at {}", path.display()),
            },
            Err(e) => DoctorCheck {
                name: name.to_string(),
                status: CheckStatus::Fail,
                details: format!("{program} not found: {e}"),
            },
        }
    }

    fn check_fixtures(&self) -> DoctorCheck {
        let pattern = &self.config.fixtures.pattern;
        match FixtureSet::discover(&self.config.root, pattern) {
            Ok(set) if set.is_empty() => DoctorCheck {
                name: "fixtures".to_string(),
                status: CheckStatus::Fail,
                details: format!("No fixtures match {pattern}"),
            },
            Ok(set) => DoctorCheck {
                name: "fixtures".to_string(),
                status: CheckStatus::Pass,
                details: format!("{} fixture(s) match {pattern}", set.len()),
            },
            Err(e) => DoctorCheck {
                name: "fixtures".to_string(),
                status: CheckStatus::Fail,
                details: format!("Cannot enumerate fixtures: {e}"),
            },
        }
    }

    fn check_artifact_dirs(&self) -> DoctorCheck {
        let mut dirs = BTreeSet::new();
        let artifacts = self
            .config
            .stale_artifact_paths()
            .into_iter()
            .chain([self.config.debug_log_path(), self.config.install_config_path()]);
        for path in artifacts {
            if let Some(parent) = path.parent() {
                dirs.insert(parent.to_path_buf());
            }
        }

        let mut problems = Vec::new();
        for dir in &dirs {
            let writable_dir = nearest_existing(dir);
            if let Err(e) = tempfile::NamedTempFile::new_in(&writable_dir) {
                problems.push(format!("{}: {e}", writable_dir.display()));
            }
        }

        if problems.is_empty() {
            DoctorCheck {
                name: "artifact_dirs".to_string(),
                status: CheckStatus::Pass,
                details: format!("{} artifact director(ies) writable", dirs.len()),
            }
        } else {
            DoctorCheck {
                name: "artifact_dirs".to_string(),
                status: CheckStatus::Fail,
                details: format!("Not writable: {}", problems.join("; ")),
            }
        }
    }

    fn check_config_file(&self) -> DoctorCheck {
        let details = match &self.config.config_path {
            Some(path) => format!("Loaded {}", path.display()),
            None => "No config file found; using built-in defaults".to_string(),
        };
        DoctorCheck {
            name: "config_file".to_string(),
            status: CheckStatus::Pass,
            details,
        }
    }

    fn check_leak_policy(&self) -> DoctorCheck {
        match LeakScanner::from_policy(&self.config) {
            Ok(scanner) => DoctorCheck {
                name: "leak_policy".to_string(),
                status: CheckStatus::Pass,
                details: format!(
                    "Token configured with {} allowed marker(s)",
                    scanner.allowed_markers().len()
                ),
            },
            Err(e) => DoctorCheck {
                name: "leak_policy".to_string(),
                status: CheckStatus::Fail,
                details: e.to_string(),
            },
        }
    }
}

/// The directory itself, or its closest ancestor that exists.
fn nearest_existing(dir: &Path) -> PathBuf {
    dir.ancestors()
        .find(|candidate| candidate.is_dir())
        .map_or_else(|| PathBuf::from("."), Path::to_path_buf)
}
