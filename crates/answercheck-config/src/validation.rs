use globset::GlobBuilder;

use answercheck_utils::error::ConfigError;

use crate::model::{Config, ValidatorMode};

const MAX_TIMEOUT_SECS: u64 = 7200;
const MAX_KILL_GRACE_SECS: u64 = 300;

fn invalid(key: &str, value: impl Into<String>) -> ConfigError {
    ConfigError::InvalidValue {
        key: key.to_string(),
        value: value.into(),
    }
}

fn require_command(key: &str, command: &[String]) -> Result<(), ConfigError> {
    match command.first() {
        None => Err(invalid(key, "command must not be empty")),
        Some(program) if program.is_empty() => Err(invalid(key, "program name must not be empty")),
        Some(_) => Ok(()),
    }
}

impl Config {
    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::InvalidValue`] naming the first offending key.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.readiness.enabled {
            require_command("readiness.command", &self.readiness.command)?;
        }
        if self.unit_tests.enabled {
            require_command("unit_tests.command", &self.unit_tests.command)?;
        }
        require_command("installer.command", &self.installer.command)?;
        if self.validator.mode == ValidatorMode::External {
            require_command("validator.command", &self.validator.command)?;
        }

        let timeout = self.installer.timeout_secs;
        if timeout == 0 {
            return Err(invalid("installer.timeout_secs", "must be greater than 0"));
        }
        if timeout > MAX_TIMEOUT_SECS {
            return Err(invalid(
                "installer.timeout_secs",
                format!("exceeds maximum limit of {MAX_TIMEOUT_SECS} seconds (2 hours)"),
            ));
        }
        if self.installer.kill_grace_secs > MAX_KILL_GRACE_SECS {
            return Err(invalid(
                "installer.kill_grace_secs",
                format!("exceeds maximum limit of {MAX_KILL_GRACE_SECS} seconds"),
            ));
        }

        if self.installer.timescale_var.is_empty() || self.installer.timescale_var.contains('=') {
            return Err(invalid(
                "installer.timescale_var",
                "must be a non-empty variable name without '='",
            ));
        }

        if self.fixtures.pattern.is_empty() {
            return Err(invalid("fixtures.pattern", "must not be empty"));
        }
        GlobBuilder::new(&self.fixtures.pattern)
            .literal_separator(true)
            .build()
            .map_err(|e| invalid("fixtures.pattern", e.to_string()))?;

        if self.artifacts.debug_log.is_empty() {
            return Err(invalid("artifacts.debug_log", "must not be empty"));
        }
        if self.artifacts.install_config.is_empty() {
            return Err(invalid("artifacts.install_config", "must not be empty"));
        }
        if let Some(index) = self.artifacts.stale.iter().position(String::is_empty) {
            return Err(invalid("artifacts.stale", format!("entry #{index} is empty")));
        }

        if self.leak_scan.token.is_empty() {
            return Err(invalid("leak_scan.token", "must not be empty"));
        }
        if let Some(index) = self
            .leak_scan
            .allowed_markers
            .iter()
            .position(String::is_empty)
        {
            return Err(invalid(
                "leak_scan.allowed_markers",
                format!("entry #{index} is empty and would exempt every line"),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn key_of(result: Result<(), ConfigError>) -> String {
        match result {
            Err(ConfigError::InvalidValue { key, .. }) => key,
            other => panic!("expected InvalidValue, got {other:?}"),
        }
    }

    #[test]
    fn test_defaults_are_valid() {
        Config::default().validate().unwrap();
    }

    #[test]
    fn test_timeout_bounds() {
        let mut config = Config::default();
        config.installer.timeout_secs = 0;
        assert_eq!(key_of(config.validate()), "installer.timeout_secs");

        config.installer.timeout_secs = 7201;
        assert_eq!(key_of(config.validate()), "installer.timeout_secs");

        config.installer.timeout_secs = 7200;
        config.validate().unwrap();
    }

    #[test]
    fn test_kill_grace_bound() {
        let mut config = Config::default();
        config.installer.kill_grace_secs = 301;
        assert_eq!(key_of(config.validate()), "installer.kill_grace_secs");

        config.installer.kill_grace_secs = 0;
        config.validate().unwrap();
    }

    #[test]
    fn test_empty_commands() {
        let mut config = Config::default();
        config.installer.command.clear();
        assert_eq!(key_of(config.validate()), "installer.command");

        let mut config = Config::default();
        config.readiness.command.clear();
        assert_eq!(key_of(config.validate()), "readiness.command");

        // A disabled stage may have no command
        config.readiness.enabled = false;
        config.validate().unwrap();
    }

    #[test]
    fn test_builtin_validator_needs_no_command() {
        let mut config = Config::default();
        config.validator.command.clear();
        assert_eq!(key_of(config.validate()), "validator.command");

        config.validator.mode = ValidatorMode::Builtin;
        config.validate().unwrap();
    }

    #[test]
    fn test_invalid_glob() {
        let mut config = Config::default();
        config.fixtures.pattern = "examples/answers[.yaml".to_string();
        assert_eq!(key_of(config.validate()), "fixtures.pattern");
    }

    #[test]
    fn test_empty_token_and_markers() {
        let mut config = Config::default();
        config.leak_scan.token.clear();
        assert_eq!(key_of(config.validate()), "leak_scan.token");

        let mut config = Config::default();
        config.leak_scan.allowed_markers.push(String::new());
        assert_eq!(key_of(config.validate()), "leak_scan.allowed_markers");
    }

    #[test]
    fn test_timescale_var_name() {
        let mut config = Config::default();
        config.installer.timescale_var = "A=B".to_string();
        assert_eq!(key_of(config.validate()), "installer.timescale_var");
    }
}
