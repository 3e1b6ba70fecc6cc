use serde::Serialize;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

use answercheck_config::{Config, ValidatorMode};
use answercheck_leakscan::LeakScanner;
use answercheck_runner::{CommandSpec, ProcessRunner, StdioMode};
use answercheck_utils::error::{CheckError, ConfigError, StageError};
use answercheck_utils::exit_codes::ExitCode;
use answercheck_utils::logging::{log_stage_complete, log_stage_error, log_stage_start, stage_span};
use answercheck_utils::types::Stage;

use crate::fixtures::{Fixture, FixtureSet, clean_stale_artifacts};
use crate::report::{FixtureRecord, RunReport, StageRecord, StageStatus};

/// One command or check a run would perform, in order.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct PlannedStep {
    pub stage: Stage,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub fixture: Option<String>,
    pub description: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub timeout_secs: Option<u64>,
}

/// Result of [`Orchestrator::run`].
#[derive(Debug)]
pub struct RunOutcome {
    pub report: RunReport,
    /// First error; the run stopped here
    pub error: Option<CheckError>,
}

impl RunOutcome {
    #[must_use]
    pub fn is_success(&self) -> bool {
        self.error.is_none()
    }

    #[must_use]
    pub fn exit_code(&self) -> ExitCode {
        self.error
            .as_ref()
            .map_or(ExitCode::SUCCESS, CheckError::to_exit_code)
    }
}

/// Drives readiness, unit tests and every fixture through the installer.
///
/// Stages run strictly one after another and the first failure ends the run.
/// Each stage is recorded in a [`RunReport`]; failures are logged with the leak
/// token masked.
///
/// # Example
///
/// ```rust,no_run
/// use answercheck_config::{CliArgs, Config};
/// use answercheck_engine::Orchestrator;
/// use answercheck_runner::NativeRunner;
///
/// let config = Config::discover(&CliArgs::default())?;
/// let runner = NativeRunner::new().with_kill_grace(config.kill_grace());
/// let mut orchestrator = Orchestrator::new(config, runner)?;
///
/// let outcome = orchestrator.run();
/// std::process::exit(outcome.exit_code().as_i32());
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
pub struct Orchestrator<R: ProcessRunner> {
    config: Config,
    runner: R,
    scanner: LeakScanner,
    report: RunReport,
    child_stdio: StdioMode,
}

impl<R: ProcessRunner> Orchestrator<R> {
    /// Bind an effective configuration to a process runner.
    ///
    /// # Errors
    ///
    /// Fails if the leak scan policy in `config` is unusable.
    pub fn new(config: Config, runner: R) -> Result<Self, CheckError> {
        let scanner = LeakScanner::from_policy(&config)?;
        let report = RunReport::start(config.root.display().to_string());
        Ok(Self {
            config,
            runner,
            scanner,
            report,
            child_stdio: StdioMode::Inherit,
        })
    }

    /// Route child output some other way than inheriting our terminal.
    #[must_use]
    pub fn with_child_stdio(mut self, stdio: StdioMode) -> Self {
        self.child_stdio = stdio;
        self
    }

    #[must_use]
    pub fn scanner(&self) -> &LeakScanner {
        &self.scanner
    }

    /// Fixtures matching the configured pattern, in run order.
    ///
    /// # Errors
    ///
    /// Fails on a malformed pattern or an unreadable directory.
    pub fn fixtures(&self) -> Result<FixtureSet, CheckError> {
        FixtureSet::discover(&self.config.root, &self.config.fixtures.pattern)
    }

    /// Run every stage, stopping at the first failure.
    pub fn run(&mut self) -> RunOutcome {
        self.report = RunReport::start(self.config.root.display().to_string());

        let result = self.run_stages();
        let message = result
            .as_ref()
            .err()
            .map(|err| self.scanner.mask(&err.to_string()));
        self.report.finish(result.as_ref().err(), message);

        match &result {
            Ok(()) => info!(
                fixtures = self.report.fixtures.len(),
                "all fixtures passed"
            ),
            Err(err) => warn!(
                exit_code = err.to_exit_code().as_i32(),
                "run stopped at first failure"
            ),
        }

        RunOutcome {
            report: self.report.clone(),
            error: result.err(),
        }
    }

    fn run_stages(&mut self) -> Result<(), CheckError> {
        if self.config.readiness.enabled {
            self.wait_for_readiness()?;
        } else {
            self.skip(Stage::Readiness);
        }

        if self.config.unit_tests.enabled {
            self.run_unit_tests()?;
        } else {
            self.skip(Stage::UnitTests);
        }

        let fixtures = self.fixtures()?.require_any()?;
        info!(
            count = fixtures.len(),
            pattern = fixtures.pattern(),
            "checking fixtures"
        );
        for fixture in &fixtures {
            self.check_fixture(fixture)?;
        }
        Ok(())
    }

    /// Block until the readiness command returns. There is no time limit.
    ///
    /// # Errors
    ///
    /// Fails if the command cannot start or exits non-zero.
    pub fn wait_for_readiness(&mut self) -> Result<(), CheckError> {
        self.timed(Stage::Readiness, None, |this| {
            let cmd = this.readiness_command()?;
            this.execute(Stage::Readiness, &cmd, None)?;
            Ok(None)
        })
    }

    /// Run the project's unit tests.
    ///
    /// # Errors
    ///
    /// Fails if the command cannot start or exits non-zero.
    pub fn run_unit_tests(&mut self) -> Result<(), CheckError> {
        self.timed(Stage::UnitTests, None, |this| {
            let cmd = this.unit_tests_command()?;
            this.execute(Stage::UnitTests, &cmd, None)?;
            Ok(None)
        })
    }

    /// Clean, install, validate, then check the debug log for one fixture.
    ///
    /// # Errors
    ///
    /// Returns the first failing step.
    pub fn check_fixture(&mut self, fixture: &Fixture) -> Result<(), CheckError> {
        let label = fixture.relative.as_str();
        let started = Instant::now();
        info!(fixture = label, "checking fixture");

        let result = self.check_fixture_stages(fixture, label);

        self.report.record_fixture(FixtureRecord {
            fixture: label.to_string(),
            passed: result.is_ok(),
            duration_ms: elapsed_ms(started),
        });
        result
    }

    fn check_fixture_stages(&mut self, fixture: &Fixture, label: &str) -> Result<(), CheckError> {
        self.timed(Stage::Cleanup, Some(label), |this| {
            let removed = clean_stale_artifacts(&this.config.stale_artifact_paths())?;
            Ok(Some(format!("removed {} stale artifact(s)", removed.len())))
        })?;

        self.timed(Stage::Installer, Some(label), |this| {
            let cmd = this.installer_command(fixture)?;
            this.execute(
                Stage::Installer,
                &cmd,
                Some(this.config.installer_timeout()),
            )?;
            Ok(None)
        })?;

        self.timed(Stage::Validation, Some(label), Self::validate_install_config)?;
        self.timed(Stage::LogCheck, Some(label), Self::check_log_exists)?;
        self.timed(Stage::LeakScan, Some(label), Self::scan_debug_log)
    }

    fn validate_install_config(&self) -> Result<Option<String>, CheckError> {
        match self.config.validator.mode {
            ValidatorMode::External => {
                let cmd = self.validator_command()?;
                self.execute(Stage::Validation, &cmd, None)?;
                Ok(None)
            }
            ValidatorMode::Builtin => {
                let path = self.config.install_config_path();
                let summary = answercheck_validation::validate_install_config(&path)?;
                debug!(
                    actions = summary.actions,
                    swap_mounts = summary.swap_mounts,
                    "storage config valid"
                );
                Ok(Some(format!("{} storage action(s) checked", summary.actions)))
            }
        }
    }

    fn check_log_exists(&self) -> Result<Option<String>, CheckError> {
        if self.config.debug_log_path().exists() {
            Ok(None)
        } else {
            Err(CheckError::LogNotCreated {
                path: self.config.artifacts.debug_log.clone(),
            })
        }
    }

    fn scan_debug_log(&self) -> Result<Option<String>, CheckError> {
        let leaks = self.scanner.scan_file(&self.config.debug_log_path())?;
        if leaks.is_empty() {
            return Ok(None);
        }
        warn!(
            lines = leaks.len(),
            path = %self.config.artifacts.debug_log,
            "leak token found outside allowed lines"
        );
        Err(CheckError::PasswordLeaked {
            path: self.config.artifacts.debug_log.clone(),
            leaks,
        })
    }

    fn command(&self, key: &str, argv: &[String]) -> Result<CommandSpec, CheckError> {
        CommandSpec::from_argv(argv)
            .map(|cmd| cmd.cwd(&self.config.root))
            .ok_or_else(|| {
                CheckError::Config(ConfigError::InvalidValue {
                    key: key.to_string(),
                    value: "command must not be empty".to_string(),
                })
            })
    }

    /// # Errors
    ///
    /// Fails if the configured command is empty.
    pub fn readiness_command(&self) -> Result<CommandSpec, CheckError> {
        self.command("readiness.command", &self.config.readiness.command)
    }

    /// # Errors
    ///
    /// Fails if the configured command is empty.
    pub fn unit_tests_command(&self) -> Result<CommandSpec, CheckError> {
        self.command("unit_tests.command", &self.config.unit_tests.command)
    }

    /// Installer invocation for `fixture`: the configured argv, the answers
    /// argument, `LANG` and the replay timescale variable.
    ///
    /// # Errors
    ///
    /// Fails if the configured command is empty.
    pub fn installer_command(&self, fixture: &Fixture) -> Result<CommandSpec, CheckError> {
        let installer = &self.config.installer;
        let mut cmd = self.command("installer.command", &installer.command)?;
        if !installer.answers_flag.is_empty() {
            cmd = cmd.arg(&installer.answers_flag);
        }
        Ok(cmd
            .arg(&fixture.relative)
            .env("LANG", &installer.lang)
            .env(&installer.timescale_var, &installer.timescale)
            .foreground(installer.foreground))
    }

    /// External validator invocation with the install config path appended.
    ///
    /// # Errors
    ///
    /// Fails if the configured command is empty.
    pub fn validator_command(&self) -> Result<CommandSpec, CheckError> {
        Ok(self
            .command("validator.command", &self.config.validator.command)?
            .arg(&self.config.artifacts.install_config))
    }

    fn execute(
        &self,
        stage: Stage,
        cmd: &CommandSpec,
        timeout: Option<Duration>,
    ) -> Result<(), CheckError> {
        debug!(stage = %stage, command = %cmd.display_line(), "spawning");
        let output = self
            .runner
            .run(&cmd.clone().stdio(self.child_stdio), timeout)
            .map_err(|err| StageError::from_runner(stage, err))?;

        if output.success() {
            Ok(())
        } else {
            Err(StageError::Failed {
                stage,
                code: output.shell_status(),
            }
            .into())
        }
    }

    /// Run `body` as `stage`, logging and recording its outcome.
    fn timed<F>(&mut self, stage: Stage, fixture: Option<&str>, body: F) -> Result<(), CheckError>
    where
        F: FnOnce(&Self) -> Result<Option<String>, CheckError>,
    {
        let span = stage_span(stage, fixture);
        let _entered = span.enter();
        log_stage_start(stage, fixture);
        let started = Instant::now();

        let result = body(&*self);
        let duration_ms = elapsed_ms(started);

        let (status, detail) = match &result {
            Ok(detail) => {
                log_stage_complete(stage, fixture, u128::from(duration_ms));
                (StageStatus::Passed, detail.clone())
            }
            Err(err) => {
                let message = err.to_string();
                log_stage_error(stage, fixture, &message, u128::from(duration_ms), &self.scanner);
                (StageStatus::Failed, Some(self.scanner.mask(&message)))
            }
        };

        self.report.record_stage(StageRecord {
            stage,
            fixture: fixture.map(str::to_string),
            status,
            duration_ms,
            detail,
        });
        result.map(|_| ())
    }

    fn skip(&mut self, stage: Stage) {
        debug!(stage = %stage, "stage disabled");
        self.report.record_stage(StageRecord {
            stage,
            fixture: None,
            status: StageStatus::Skipped,
            duration_ms: 0,
            detail: Some("disabled".to_string()),
        });
    }

    /// Describe every step a run would perform, without executing anything.
    ///
    /// # Errors
    ///
    /// Fails if fixture discovery fails or a command is empty.
    pub fn plan(&self) -> Result<Vec<PlannedStep>, CheckError> {
        let mut steps = Vec::new();
        let step = |stage, fixture: Option<&str>, description: String, timeout_secs| PlannedStep {
            stage,
            fixture: fixture.map(str::to_string),
            description,
            timeout_secs,
        };

        if self.config.readiness.enabled {
            steps.push(step(
                Stage::Readiness,
                None,
                self.readiness_command()?.display_line(),
                None,
            ));
        }
        if self.config.unit_tests.enabled {
            steps.push(step(
                Stage::UnitTests,
                None,
                self.unit_tests_command()?.display_line(),
                None,
            ));
        }

        let debug_log = &self.config.artifacts.debug_log;
        for fixture in &self.fixtures()? {
            let label = Some(fixture.relative.as_str());
            steps.push(step(
                Stage::Cleanup,
                label,
                format!("remove if present: {}", self.config.artifacts.stale.join(" ")),
                None,
            ));
            steps.push(step(
                Stage::Installer,
                label,
                self.installer_command(fixture)?.display_line(),
                Some(self.config.installer.timeout_secs),
            ));
            let validation = match self.config.validator.mode {
                ValidatorMode::External => self.validator_command()?.display_line(),
                ValidatorMode::Builtin => format!(
                    "built-in storage check of {}",
                    self.config.artifacts.install_config
                ),
            };
            steps.push(step(Stage::Validation, label, validation, None));
            steps.push(step(
                Stage::LogCheck,
                label,
                format!("require {debug_log}"),
                None,
            ));
            steps.push(step(
                Stage::LeakScan,
                label,
                format!("scan {debug_log} for the leak token"),
                None,
            ));
        }
        Ok(steps)
    }
}

fn elapsed_ms(started: Instant) -> u64 {
    u64::try_from(started.elapsed().as_millis()).unwrap_or(u64::MAX)
}
