use std::path::PathBuf;
use std::time::Duration;

use answercheck_utils::error::ConfigError;
use answercheck_utils::types::ConfigSource;

use crate::model::{Config, ValidatorMode};

impl Config {
    /// Create a builder for programmatic configuration.
    ///
    /// Use this when embedding answercheck or in tests, where discovery from the
    /// working directory is unwanted.
    ///
    /// # Example
    ///
    /// ```rust
    /// use answercheck_config::Config;
    /// use std::time::Duration;
    ///
    /// let config = Config::builder()
    ///     .root("/srv/subiquity")
    ///     .installer_timeout(Duration::from_secs(120))
    ///     .skip_readiness()
    ///     .build()
    ///     .expect("valid config");
    /// assert_eq!(config.installer.timeout_secs, 120);
    /// ```
    #[must_use]
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::new()
    }
}

/// Builder for programmatic configuration of answercheck.
///
/// All values set via the builder are attributed to `ConfigSource::Programmatic`.
#[derive(Debug, Clone, Default)]
pub struct ConfigBuilder {
    root: Option<PathBuf>,
    readiness_command: Option<Vec<String>>,
    readiness_enabled: Option<bool>,
    unit_tests_command: Option<Vec<String>>,
    unit_tests_enabled: Option<bool>,
    fixture_pattern: Option<String>,
    installer_command: Option<Vec<String>>,
    answers_flag: Option<String>,
    installer_timeout: Option<Duration>,
    kill_grace: Option<Duration>,
    foreground: Option<bool>,
    stale_artifacts: Option<Vec<String>>,
    install_config: Option<String>,
    debug_log: Option<String>,
    validator_mode: Option<ValidatorMode>,
    validator_command: Option<Vec<String>>,
    token: Option<String>,
    allowed_markers: Option<Vec<String>>,
}

fn argv<I, S>(items: I) -> Vec<String>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    items.into_iter().map(Into::into).collect()
}

impl ConfigBuilder {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Project root that fixture and artifact paths are relative to.
    #[must_use]
    pub fn root(mut self, path: impl Into<PathBuf>) -> Self {
        self.root = Some(path.into());
        self
    }

    #[must_use]
    pub fn readiness_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.readiness_command = Some(argv(command));
        self
    }

    #[must_use]
    pub fn skip_readiness(mut self) -> Self {
        self.readiness_enabled = Some(false);
        self
    }

    #[must_use]
    pub fn unit_tests_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.unit_tests_command = Some(argv(command));
        self
    }

    #[must_use]
    pub fn skip_unit_tests(mut self) -> Self {
        self.unit_tests_enabled = Some(false);
        self
    }

    #[must_use]
    pub fn fixture_pattern(mut self, pattern: impl Into<String>) -> Self {
        self.fixture_pattern = Some(pattern.into());
        self
    }

    #[must_use]
    pub fn installer_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.installer_command = Some(argv(command));
        self
    }

    #[must_use]
    pub fn answers_flag(mut self, flag: impl Into<String>) -> Self {
        self.answers_flag = Some(flag.into());
        self
    }

    /// Installer time limit; sub-second parts are dropped.
    #[must_use]
    pub fn installer_timeout(mut self, timeout: Duration) -> Self {
        self.installer_timeout = Some(timeout);
        self
    }

    #[must_use]
    pub fn kill_grace(mut self, grace: Duration) -> Self {
        self.kill_grace = Some(grace);
        self
    }

    #[must_use]
    pub fn foreground(mut self, foreground: bool) -> Self {
        self.foreground = Some(foreground);
        self
    }

    #[must_use]
    pub fn stale_artifacts<I, S>(mut self, paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.stale_artifacts = Some(argv(paths));
        self
    }

    #[must_use]
    pub fn install_config(mut self, path: impl Into<String>) -> Self {
        self.install_config = Some(path.into());
        self
    }

    #[must_use]
    pub fn debug_log(mut self, path: impl Into<String>) -> Self {
        self.debug_log = Some(path.into());
        self
    }

    #[must_use]
    pub fn validator_mode(mut self, mode: ValidatorMode) -> Self {
        self.validator_mode = Some(mode);
        self
    }

    #[must_use]
    pub fn validator_command<I, S>(mut self, command: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.validator_command = Some(argv(command));
        self
    }

    #[must_use]
    pub fn token(mut self, token: impl Into<String>) -> Self {
        self.token = Some(token.into());
        self
    }

    #[must_use]
    pub fn allowed_markers<I, S>(mut self, markers: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.allowed_markers = Some(argv(markers));
        self
    }

    /// Build and validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] if the result fails validation.
    pub fn build(self) -> Result<Config, ConfigError> {
        let mut config = Config::default();
        let attribution = &mut config.source_attribution;
        let mut mark = |key: &str| {
            attribution.insert(key.to_string(), ConfigSource::Programmatic);
        };

        if let Some(root) = self.root {
            config.root = root;
            mark("root");
        }
        if let Some(command) = self.readiness_command {
            config.readiness.command = command;
            mark("readiness.command");
        }
        if let Some(enabled) = self.readiness_enabled {
            config.readiness.enabled = enabled;
            mark("readiness.enabled");
        }
        if let Some(command) = self.unit_tests_command {
            config.unit_tests.command = command;
            mark("unit_tests.command");
        }
        if let Some(enabled) = self.unit_tests_enabled {
            config.unit_tests.enabled = enabled;
            mark("unit_tests.enabled");
        }
        if let Some(pattern) = self.fixture_pattern {
            config.fixtures.pattern = pattern;
            mark("fixtures.pattern");
        }
        if let Some(command) = self.installer_command {
            config.installer.command = command;
            mark("installer.command");
        }
        if let Some(flag) = self.answers_flag {
            config.installer.answers_flag = flag;
            mark("installer.answers_flag");
        }
        if let Some(timeout) = self.installer_timeout {
            config.installer.timeout_secs = timeout.as_secs();
            mark("installer.timeout_secs");
        }
        if let Some(grace) = self.kill_grace {
            config.installer.kill_grace_secs = grace.as_secs();
            mark("installer.kill_grace_secs");
        }
        if let Some(foreground) = self.foreground {
            config.installer.foreground = foreground;
            mark("installer.foreground");
        }
        if let Some(stale) = self.stale_artifacts {
            config.artifacts.stale = stale;
            mark("artifacts.stale");
        }
        if let Some(path) = self.install_config {
            config.artifacts.install_config = path;
            mark("artifacts.install_config");
        }
        if let Some(path) = self.debug_log {
            config.artifacts.debug_log = path;
            mark("artifacts.debug_log");
        }
        if let Some(mode) = self.validator_mode {
            config.validator.mode = mode;
            mark("validator.mode");
        }
        if let Some(command) = self.validator_command {
            config.validator.command = command;
            mark("validator.command");
        }
        if let Some(token) = self.token {
            config.leak_scan.token = token;
            mark("leak_scan.token");
        }
        if let Some(markers) = self.allowed_markers {
            config.leak_scan.allowed_markers = markers;
            mark("leak_scan.allowed_markers");
        }

        config.validate()?;
        Ok(config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_builder_defaults_match_default_config() {
        let config = Config::builder().build().unwrap();
        assert_eq!(config.installer, Config::default().installer);
        assert_eq!(config.source_of("root"), ConfigSource::Default);
    }

    #[test]
    fn test_builder_values_are_programmatic() {
        let config = Config::builder()
            .root("/tmp/project")
            .installer_command(["sh", "installer.sh"])
            .installer_timeout(Duration::from_secs(1))
            .token("hunter2")
            .validator_mode(ValidatorMode::Builtin)
            .build()
            .unwrap();

        assert_eq!(config.root, PathBuf::from("/tmp/project"));
        assert_eq!(config.installer.command, vec!["sh", "installer.sh"]);
        assert_eq!(config.installer.timeout_secs, 1);
        assert_eq!(config.leak_scan.token, "hunter2");
        assert_eq!(config.source_of("installer.command"), ConfigSource::Programmatic);
        assert_eq!(config.source_of("leak_scan.allowed_markers"), ConfigSource::Default);
    }

    #[test]
    fn test_builder_validates() {
        let result = Config::builder()
            .installer_timeout(Duration::from_millis(500))
            .build();
        assert!(matches!(
            result,
            Err(ConfigError::InvalidValue { key, .. }) if key == "installer.timeout_secs"
        ));
    }

    #[test]
    fn test_builder_skip_flags() {
        let config = Config::builder()
            .skip_readiness()
            .skip_unit_tests()
            .build()
            .unwrap();
        assert!(!config.readiness.enabled);
        assert!(!config.unit_tests.enabled);
    }
}
